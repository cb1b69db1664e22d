// src/engine/mod.rs

//! Pipeline orchestration.
//!
//! [`pipeline`] owns the wave loop: fan a wave of blocks out concurrently,
//! join all of their results, propagate artifacts into the build context,
//! and ask the graph for the next runnable set until nothing remains.

pub mod pipeline;

pub use pipeline::{BlockResult, WaveEngine};
