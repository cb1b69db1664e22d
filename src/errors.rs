// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Runner-level build failures are deliberately *not* represented here: a
//! block whose build fails goes into the broken set and the wave keeps
//! draining. Every variant in this enum is fatal to the pipeline as a whole.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WinchmanError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported kind of build package (content type '{0}')")]
    UnsupportedPackage(String),

    #[error("fetching build package: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("artifact propagation for block '{block}' failed: {source}")]
    Propagation {
        block: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("early termination due to one or more build units failing")]
    BlocksFailed { broken: Vec<String> },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WinchmanError>;
