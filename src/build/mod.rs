// src/build/mod.rs

//! Per-block build layer.
//!
//! - [`unit`] derives the effective build parameters for one block from its
//!   declaration plus the pipeline-wide options.
//! - [`runner`] defines the contract between the wave engine and whatever
//!   actually performs a single image build (three finite streams), plus the
//!   consumer that folds those streams into an outcome and image id.
//! - [`docker`] is the production runner, shelling out to the `docker` CLI.

pub mod docker;
pub mod runner;
pub mod unit;

pub use docker::DockerRunner;
pub use runner::{
    runner_channels, BuildOutcome, BuildRunner, LogLevel, LogRecord, RunnerChannels,
    RunnerStreams, StatusEvent,
};
pub use unit::{build_unit_config, UnitConfig};
