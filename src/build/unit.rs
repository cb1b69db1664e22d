// src/build/unit.rs

use crate::config::model::{BlockConfig, PushCredentials};
use crate::errors::{Result, WinchmanError};
use crate::InvokeBuildOptions;

/// Effective build parameters for one block, as handed to a
/// [`super::BuildRunner`]. Opaque to the wave engine.
#[derive(Debug, Clone)]
pub struct UnitConfig {
    pub name: String,
    pub dockerfile: String,
    pub registry: String,
    pub project: String,
    pub tags: Vec<String>,
    pub push: bool,
    pub disable_cache: bool,
    /// Username/password pair for the push. Either or both halves may be
    /// empty; the runner decides what to do in that case.
    pub credentials: PushCredentials,
}

/// Derive the [`UnitConfig`] for a block.
///
/// The project name is resolved from one of three settings, in order:
/// - the block's `push_info.image`
/// - the block's `image_name`
/// - the pipeline-wide project name, but only for a block that does not
///   push; a pushing block must name its image explicitly.
///
/// Credentials come from the block's `push_info` when both fields are
/// non-empty, otherwise from the pipeline defaults.
pub fn build_unit_config(
    block: &BlockConfig,
    options: &InvokeBuildOptions,
) -> Result<UnitConfig> {
    let mut project = block.push_info.image.clone();
    if project.is_empty() {
        project = block.image_name.clone();
    }

    if project.is_empty() {
        if block.push_image {
            return Err(WinchmanError::Config(format!(
                "missing image_name for push_image block '{}'",
                block.name
            )));
        }
        project = options.project_name.clone();
    }

    let credentials = if block.push_info.credentials.is_complete() {
        block.push_info.credentials.clone()
    } else {
        options.default_push_credentials.clone()
    };

    Ok(UnitConfig {
        name: block.name.clone(),
        dockerfile: block.dockerfile.clone(),
        registry: options.registry.clone(),
        project,
        tags: block.tags.clone(),
        push: block.push_image,
        disable_cache: block.disable_cache,
        credentials,
    })
}
