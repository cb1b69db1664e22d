// src/artifacts/propagate.rs

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use tracing::info;

use crate::artifacts::fetcher::ArtifactFetcher;
use crate::errors::{Result, WinchmanError};
use crate::fetch::extract::untar_no_chown;

/// Directory inside a built image where a block leaves files for its
/// dependents.
pub const ARTIFACTS_OUT_PATH: &str = ".winchman/out/";

/// Directory within the build context where a producer's artifacts are
/// installed for downstream blocks.
pub fn artifacts_in_path(block_name: &str) -> String {
    format!(".winchman/in/{block_name}/")
}

/// Copy a successful block's artifacts out of its image and install them
/// into the shared build context.
///
/// The tar archive of `.winchman/out/` is extracted into a private scratch
/// directory (released on every exit path), then the extracted `out/`
/// subdirectory is moved to `.winchman/in/<block_name>/` in one rename.
/// Destinations for distinct blocks never overlap, since the path is keyed
/// by the producer's name.
///
/// Must only be called between waves: it mutates the context directory that
/// running blocks share read-only.
pub async fn propagate(
    fetcher: &dyn ArtifactFetcher,
    block_name: &str,
    image_id: &str,
    context_dir: &Path,
) -> Result<()> {
    info!(
        block = %block_name,
        image_id = %image_id,
        "copying artifacts into build context"
    );

    propagate_inner(fetcher, block_name, image_id, context_dir)
        .await
        .map_err(|source| WinchmanError::Propagation {
            block: block_name.to_string(),
            source,
        })
}

async fn propagate_inner(
    fetcher: &dyn ArtifactFetcher,
    block_name: &str,
    image_id: &str,
    context_dir: &Path,
) -> AnyResult<()> {
    let scratch = tempfile::tempdir().context("creating artifact scratch directory")?;

    let archive = fetcher
        .fetch_archive(image_id, ARTIFACTS_OUT_PATH)
        .await
        .with_context(|| format!("reading artifacts from image '{image_id}'"))?;

    untar_no_chown(Cursor::new(archive), scratch.path())
        .context("extracting artifact archive")?;

    let destination = context_dir.join(artifacts_in_path(block_name));
    let parent = destination
        .parent()
        .context("artifact destination has no parent")?;
    make_dir_all_world_writable(parent)
        .with_context(|| format!("creating artifact directory {:?}", parent))?;

    // The archive is rooted at the final component of the out path; move
    // that directory up so `out` itself does not appear in the context.
    std::fs::rename(scratch.path().join("out"), &destination)
        .with_context(|| format!("installing artifacts at {:?}", destination))?;

    Ok(())
}

#[cfg(unix)]
fn make_dir_all_world_writable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o777)
        .create(path)
}

#[cfg(not(unix))]
fn make_dir_all_world_writable(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
