// src/fetch/package.rs

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::TempDir;
use tracing::info;

use crate::errors::{Result, WinchmanError};
use crate::fetch::extract::{extract_tgz, extract_zip};

/// Where the build package comes from.
#[derive(Debug, Clone, Default)]
pub struct BuildPackageOptions {
    /// URL of the source archive.
    pub url: String,
    /// Optional path within the archive to use as the context root.
    pub sub_directory: String,
}

/// Archive format, derived from the response `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Map a `Content-Type` value to an extractor.
    ///
    /// A missing header is treated as `text/plain`, which (like any other
    /// unlisted type) is an unsupported kind of build package.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self> {
        let content_type = content_type.unwrap_or("text/plain");
        let essence = content_type.split(';').next().unwrap_or("").trim();

        match essence {
            "application/zip" | "application/x-zip-compressed" => Ok(ArchiveKind::Zip),
            "application/x-tar" | "application/gzip" | "application/x-gzip" => {
                Ok(ArchiveKind::TarGz)
            }
            other => Err(WinchmanError::UnsupportedPackage(other.to_string())),
        }
    }
}

/// The extracted build context shared by every block in the pipeline.
///
/// Owns the temporary directory the archive was extracted into; dropping
/// the context removes it, so an error anywhere later in the pipeline
/// leaves nothing behind.
#[derive(Debug)]
pub struct BuildContext {
    root: PathBuf,
    _dir: TempDir,
}

impl BuildContext {
    /// Root directory handed to the build drivers.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Download the build package and extract it into a fresh temporary
/// directory, returning the context rooted at `sub_directory` (when set).
pub async fn create_build_context(options: &BuildPackageOptions) -> Result<BuildContext> {
    info!(url = %options.url, "preparing build package");

    let response = reqwest::get(&options.url).await?.error_for_status()?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string());
    let kind = ArchiveKind::from_content_type(content_type.as_deref())?;

    info!(
        content_type = %content_type.as_deref().unwrap_or("<missing>"),
        sub_directory = %options.sub_directory,
        "found build package of type {:?}",
        kind
    );

    let body = response.bytes().await?;

    // Spool the archive to disk first; the zip extractor needs a seekable
    // file and it keeps peak memory independent of extraction.
    let mut archive_file =
        tempfile::NamedTempFile::new().context("creating build archive file")?;
    archive_file
        .write_all(&body)
        .context("writing build archive")?;

    let dir = tempfile::tempdir().context("creating build package directory")?;
    info!(directory = ?dir.path(), "extracting build package archive");

    match kind {
        ArchiveKind::Zip => extract_zip(archive_file.path(), dir.path())?,
        ArchiveKind::TarGz => extract_tgz(archive_file.path(), dir.path())?,
    }

    let root = if options.sub_directory.is_empty() {
        dir.path().to_path_buf()
    } else {
        dir.path().join(&options.sub_directory)
    };

    Ok(BuildContext { root, _dir: dir })
}
