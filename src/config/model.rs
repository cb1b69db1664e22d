// src/config/model.rs

use serde::Deserialize;

/// Top-level build configuration as read from a YAML document.
///
/// This is a direct mapping of the config format:
///
/// ```yaml
/// blocks:
///   - name: block-A
///     dockerfile: Dockerfile.first
///     disable_cache: true
///   - name: block-B
///     dockerfile: Dockerfile.second
///     image_name: second
///     push_image: true
///     requires:
///       - block-A
///     tags:
///       - latest
///     push_info:
///       image: repo
///       credentials:
///         username: someuser
///         password: somepass
/// ```
///
/// Declaration order of `blocks` is significant: the graph returns runnable
/// blocks in the order they appear here.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// All build blocks, in declaration order.
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

/// One build block: a single container-image build in the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockConfig {
    /// Unique block name. Used as the graph node identity and as the
    /// directory name artifacts are installed under for dependents.
    pub name: String,

    /// Dockerfile path, relative to the build context root.
    pub dockerfile: String,

    /// Image name to build under. Empty means unset; see
    /// [`crate::build::build_unit_config`] for how the effective project
    /// name is resolved.
    #[serde(default)]
    pub image_name: String,

    /// Names of blocks that must complete successfully before this one runs.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Whether the built image is pushed to the registry.
    #[serde(default)]
    pub push_image: bool,

    /// Disable the builder's layer cache for this block.
    #[serde(default)]
    pub disable_cache: bool,

    /// Tags applied to the built image, in order.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Push target overrides.
    #[serde(default)]
    pub push_info: PushInfo,
}

/// Per-block push overrides. All fields are optional; empty strings mean
/// "use the pipeline-wide value".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushInfo {
    /// Overrides `image_name` as the publish target when non-empty.
    #[serde(default)]
    pub image: String,

    /// Per-block registry credentials. Applied only when *both* fields are
    /// non-empty; otherwise the pipeline defaults are used.
    #[serde(default)]
    pub credentials: PushCredentials,
}

/// An opaque username/password pair handed to the build driver. This crate
/// never inspects the values beyond emptiness checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl PushCredentials {
    /// True when both halves of the pair are present.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}
