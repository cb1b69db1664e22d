// src/engine/pipeline.rs

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::artifacts::{propagate, ArtifactFetcher};
use crate::build::runner::{consume, BuildOutcome, BuildRunner};
use crate::build::unit::build_unit_config;
use crate::config::model::BlockConfig;
use crate::dag::BuildGraph;
use crate::errors::{Result, WinchmanError};
use crate::InvokeBuildOptions;

/// Terminal report for one launched block.
#[derive(Debug, Clone)]
pub struct BlockResult {
    pub name: String,
    pub outcome: BuildOutcome,
    /// Image identifier, when the build succeeded and the driver revealed
    /// one.
    pub image_id: Option<String>,
}

/// Drives the pipeline wave by wave.
///
/// Each iteration:
/// - **fan out**: derive every block's build parameters up front (a
///   configuration error aborts before anything launches), then start all
///   blocks of the wave concurrently;
/// - **join**: collect exactly one result per block, sorting them into the
///   completed and broken sets;
/// - **propagate**: once the whole wave has drained, install each
///   successful block's artifacts into the context, sequentially;
/// - **advance**: ask the graph for the next runnable set.
///
/// The join/propagate order is a hard requirement, not a convenience: the
/// blocks of a wave share the context directory read-only, and artifacts
/// must not land in it while any sibling may still be reading.
pub struct WaveEngine {
    runner: Arc<dyn BuildRunner>,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl WaveEngine {
    pub fn new(runner: Arc<dyn BuildRunner>, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self { runner, fetcher }
    }

    /// Run the pipeline to completion from the given initial wave.
    ///
    /// Returns [`WinchmanError::BlocksFailed`] when any block's build
    /// failed, after the remaining reachable blocks have run.
    pub async fn run(
        &self,
        graph: &BuildGraph,
        initial_wave: Vec<&BlockConfig>,
        context_dir: &Path,
        options: &InvokeBuildOptions,
    ) -> Result<()> {
        let mut completed: HashSet<String> = HashSet::new();
        let mut broken: HashSet<String> = HashSet::new();
        let mut current_wave = initial_wave;

        loop {
            info!(blocks = current_wave.len(), "blocks to run");

            let successful = self
                .run_wave(&current_wave, context_dir, options, &mut completed, &mut broken)
                .await?;

            // Propagation happens strictly after the whole wave has
            // drained: builds may read the context directory until then.
            info!(
                blocks = successful.len(),
                "copying artifacts for successful blocks"
            );
            for result in &successful {
                match result.image_id.as_deref() {
                    Some(image_id) if !image_id.is_empty() => {
                        propagate(self.fetcher.as_ref(), &result.name, image_id, context_dir)
                            .await?;
                    }
                    _ => {}
                }
            }

            let next_wave = graph.frontier(&completed, &broken);
            if next_wave.is_empty() {
                break;
            }
            current_wave = next_wave;
        }

        if !broken.is_empty() {
            let mut names: Vec<String> = broken.into_iter().collect();
            names.sort();
            return Err(WinchmanError::BlocksFailed { broken: names });
        }

        Ok(())
    }

    /// Launch one wave concurrently and drain its results.
    ///
    /// Returns the successful results in join order. Build failures are
    /// absorbed into `broken`; only configuration errors and a broken
    /// result channel are surfaced.
    async fn run_wave(
        &self,
        wave: &[&BlockConfig],
        context_dir: &Path,
        options: &InvokeBuildOptions,
        completed: &mut HashSet<String>,
        broken: &mut HashSet<String>,
    ) -> Result<Vec<BlockResult>> {
        // Derive every unit config before launching anything, so an
        // ill-formed block aborts the pipeline with no build started.
        let mut launches = Vec::with_capacity(wave.len());
        for block in wave {
            launches.push(build_unit_config(block, options)?);
        }

        // Capacity equals the wave size: a fast-finishing block never
        // blocks on publication behind a slow peer.
        let (result_tx, mut result_rx) = mpsc::channel::<BlockResult>(wave.len());

        for unit in launches {
            let runner = Arc::clone(&self.runner);
            let tx = result_tx.clone();
            let context_dir = context_dir.to_path_buf();

            tokio::spawn(async move {
                let name = unit.name.clone();
                info!(block = %name, "starting block");

                let streams = runner.run_build(unit, &context_dir);
                let (image_id, outcome) = consume(&name, streams).await;

                let _ = tx
                    .send(BlockResult {
                        name,
                        outcome,
                        image_id,
                    })
                    .await;
            });
        }
        drop(result_tx);

        let mut successful = Vec::new();
        for _ in 0..wave.len() {
            let result = result_rx
                .recv()
                .await
                .ok_or_else(|| anyhow!("result channel closed before the wave drained"))?;

            match &result.outcome {
                BuildOutcome::Success => {
                    info!(
                        block = %result.name,
                        image_id = %result.image_id.as_deref().unwrap_or(""),
                        "block completed"
                    );
                    completed.insert(result.name.clone());
                    successful.push(result);
                }
                BuildOutcome::Failed(reason) => {
                    warn!(block = %result.name, reason = %reason, "block failed");
                    broken.insert(result.name.clone());
                }
            }
        }

        Ok(successful)
    }
}
