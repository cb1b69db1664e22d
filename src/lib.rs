// src/lib.rs

pub mod artifacts;
pub mod build;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod logging;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::artifacts::{ArtifactFetcher, DockerArtifactFetcher};
use crate::build::{BuildRunner, DockerRunner};
use crate::cli::CliArgs;
use crate::config::model::{PipelineConfig, PushCredentials};
use crate::dag::BuildGraph;
use crate::engine::WaveEngine;
use crate::errors::{Result, WinchmanError};
use crate::fetch::BuildPackageOptions;

/// Options for invoking a full pipeline build.
#[derive(Debug, Clone, Default)]
pub struct InvokeBuildOptions {
    /// Image registry passed to every block's build.
    pub registry: String,
    /// Fallback project name for blocks that do not publish an image.
    pub project_name: String,
    /// Where the source archive comes from.
    pub build_package: BuildPackageOptions,
    /// Default push credentials for blocks without a complete per-block
    /// override.
    pub default_push_credentials: PushCredentials,
}

/// Start a full pipeline build with the blocks described in `config_text`
/// and the build context described by the given options.
///
/// Production entry point: drives builds through the `docker` CLI. Tests
/// and embedders that want a different driver use [`invoke_build_with`].
pub async fn invoke_build(config_text: &str, options: InvokeBuildOptions) -> Result<()> {
    invoke_build_with(
        config_text,
        options,
        Arc::new(DockerRunner::new()),
        Arc::new(DockerArtifactFetcher::new()),
    )
    .await
}

/// [`invoke_build`] with an explicit build driver and artifact fetcher.
pub async fn invoke_build_with(
    config_text: &str,
    options: InvokeBuildOptions,
    runner: Arc<dyn BuildRunner>,
    fetcher: Arc<dyn ArtifactFetcher>,
) -> Result<()> {
    let cfg = config::parse_and_validate(config_text)?;
    let graph = BuildGraph::from_config(&cfg);

    // Seed the first wave before fetching anything.
    let initial_wave = graph.frontier(&HashSet::new(), &HashSet::new());
    if initial_wave.is_empty() {
        return Err(WinchmanError::Config(
            "no independent build units defined".to_string(),
        ));
    }

    let context = fetch::create_build_context(&options.build_package).await?;

    let engine = WaveEngine::new(runner, fetcher);
    engine
        .run(&graph, initial_wave, context.root(), &options)
        .await
}

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_text = std::fs::read_to_string(&args.config)?;

    if args.dry_run {
        let cfg = config::parse_and_validate(&config_text)?;
        print_dry_run(&cfg);
        return Ok(());
    }

    let package_url = args.package_url.clone().ok_or_else(|| {
        WinchmanError::Config("--package-url is required unless --dry-run is set".to_string())
    })?;

    let options = InvokeBuildOptions {
        registry: args.registry.clone(),
        project_name: args.project_name.clone(),
        build_package: BuildPackageOptions {
            url: package_url,
            sub_directory: args.sub_directory.clone(),
        },
        default_push_credentials: PushCredentials {
            username: args.username.clone(),
            password: args.password.clone(),
        },
    };

    invoke_build(&config_text, options).await?;
    info!("pipeline completed successfully");
    Ok(())
}

/// Simple dry-run output: print blocks, dependencies and publish targets.
fn print_dry_run(cfg: &PipelineConfig) {
    println!("winchman dry-run");
    println!();

    println!("blocks ({}):", cfg.blocks.len());
    for block in &cfg.blocks {
        println!("  - {}", block.name);
        println!("      dockerfile: {}", block.dockerfile);
        if !block.requires.is_empty() {
            println!("      requires: {:?}", block.requires);
        }
        if !block.image_name.is_empty() {
            println!("      image_name: {}", block.image_name);
        }
        if !block.push_info.image.is_empty() {
            println!("      push_info.image: {}", block.push_info.image);
        }
        if !block.tags.is_empty() {
            println!("      tags: {:?}", block.tags);
        }
        if block.push_image {
            println!("      push_image: true");
        }
        if block.disable_cache {
            println!("      disable_cache: true");
        }
    }
}
