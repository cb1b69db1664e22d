// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::model::PipelineConfig;
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Deserialize a YAML build configuration and return the raw
/// [`PipelineConfig`].
///
/// This only performs YAML deserialization; it does **not** perform semantic
/// validation (unique names, DAG correctness, etc.). Use [`parse_and_validate`]
/// for that.
pub fn parse(text: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig = serde_yaml::from_str(text)?;
    Ok(config)
}

/// Parse a YAML build configuration and run semantic validation.
///
/// This is the recommended entry point for the rest of the crate:
///
/// - Deserializes the YAML (defaults applied by `serde` + `Default` impls).
/// - Checks for:
///   - empty / duplicate block names,
///   - unknown or self-referential `requires` entries,
///   - cycles in the dependency graph.
pub fn parse_and_validate(text: &str) -> Result<PipelineConfig> {
    let config = parse(text)?;
    validate_config(&config)?;
    Ok(config)
}

/// Read a build configuration from a file path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;
    parse_and_validate(&contents)
}
