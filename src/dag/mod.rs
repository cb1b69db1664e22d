// src/dag/mod.rs

//! DAG representation of the build pipeline.
//!
//! [`graph`] holds the directed acyclic graph of build blocks and answers
//! the runnable-set query the wave engine drives the pipeline with.

pub mod graph;

pub use graph::BuildGraph;
