// src/config/mod.rs

//! Declarative build configuration: YAML model, loading, and validation.
//!
//! - [`model`] mirrors the YAML format (`blocks:` list).
//! - [`loader`] deserializes and applies semantic validation.
//! - [`validate`] holds the well-formedness rules (unique names, known
//!   `requires`, acyclicity).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, parse, parse_and_validate};
pub use model::{BlockConfig, PipelineConfig, PushCredentials, PushInfo};
