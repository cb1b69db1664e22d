// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `winchman`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "winchman",
    version,
    about = "Run a wave-scheduled container-image build pipeline from a YAML config.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build config file (YAML).
    #[arg(long, value_name = "PATH", default_value = "winchman.yaml")]
    pub config: String,

    /// URL of the source archive to use as the build context.
    #[arg(long, value_name = "URL")]
    pub package_url: Option<String>,

    /// Path within the archive to use as the context root.
    #[arg(long, value_name = "PATH", default_value = "")]
    pub sub_directory: String,

    /// Image registry passed to every block build.
    #[arg(long, value_name = "REGISTRY", default_value = "")]
    pub registry: String,

    /// Fallback project name for blocks that do not publish.
    #[arg(long, value_name = "NAME", default_value = "")]
    pub project_name: String,

    /// Default push username, for blocks without their own credentials.
    #[arg(long, value_name = "USER", default_value = "")]
    pub username: String,

    /// Default push password, for blocks without their own credentials.
    #[arg(long, value_name = "PASS", default_value = "")]
    pub password: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WINCHMAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the blocks, but don't fetch or build.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
