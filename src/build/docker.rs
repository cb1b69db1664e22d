// src/build/docker.rs

//! Production build driver shelling out to the `docker` CLI.
//!
//! One `run_build` call performs `docker build` (and `docker login` +
//! `docker push` for pushing blocks) against the shared context directory,
//! streaming CLI output back as log records. The produced image id is read
//! from an `--iidfile` and revealed through an `image_id` log field, which
//! is how the engine-side consumer discovers it.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::build::runner::{
    runner_channels, BuildRunner, LogLevel, LogRecord, RunnerChannels, RunnerStreams,
    StatusEvent,
};
use crate::build::unit::UnitConfig;

/// Build driver backed by the `docker` binary.
#[derive(Debug, Clone)]
pub struct DockerRunner {
    program: String,
}

impl DockerRunner {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// Use a different container CLI (e.g. `podman`).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DockerRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildRunner for DockerRunner {
    fn run_build(&self, config: UnitConfig, context_dir: &Path) -> RunnerStreams {
        let (channels, streams) = runner_channels(64);
        let program = self.program.clone();
        let context_dir = context_dir.to_path_buf();

        tokio::spawn(async move {
            let RunnerChannels { logs, status, done } = channels;
            let result = drive_build(&program, &config, &context_dir, &logs, &status).await;
            let _ = done.send(result);
            // log and status senders drop here, closing the streams after
            // the completion value is delivered.
        });

        streams
    }
}

/// The full `registry/project` image reference for a unit.
fn image_reference(config: &UnitConfig) -> String {
    if config.registry.is_empty() {
        config.project.clone()
    } else {
        format!("{}/{}", config.registry, config.project)
    }
}

async fn drive_build(
    program: &str,
    config: &UnitConfig,
    context_dir: &Path,
    logs: &mpsc::Sender<LogRecord>,
    status: &mpsc::Sender<StatusEvent>,
) -> Result<()> {
    let reference = image_reference(config);

    let _ = status.send(StatusEvent::new("build_started")).await;

    let iid_dir = tempfile::tempdir().context("creating iidfile directory")?;
    let iid_path: PathBuf = iid_dir.path().join("iid");

    let mut cmd = Command::new(program);
    cmd.arg("build")
        .arg("-f")
        .arg(context_dir.join(&config.dockerfile))
        .arg("--iidfile")
        .arg(&iid_path);

    if config.disable_cache {
        cmd.arg("--no-cache");
    }
    for tag in &config.tags {
        cmd.arg("-t").arg(format!("{reference}:{tag}"));
    }
    if config.tags.is_empty() {
        cmd.arg("-t").arg(&reference);
    }
    cmd.arg(context_dir);

    run_streaming(cmd, logs)
        .await
        .with_context(|| format!("building image for block '{}'", config.name))?;

    let image_id = tokio::fs::read_to_string(&iid_path)
        .await
        .context("reading image id file")?
        .trim()
        .to_string();

    let _ = logs
        .send(
            LogRecord::new(LogLevel::Info, format!("built image {reference}"))
                .with_field("image_id", &image_id),
        )
        .await;
    let _ = status.send(StatusEvent::new("build_completed")).await;

    if config.push {
        push_image(program, config, &reference, logs, status).await?;
    }

    Ok(())
}

async fn push_image(
    program: &str,
    config: &UnitConfig,
    reference: &str,
    logs: &mpsc::Sender<LogRecord>,
    status: &mpsc::Sender<StatusEvent>,
) -> Result<()> {
    if config.credentials.is_complete() {
        login(program, config).await?;
    }

    let _ = status.send(StatusEvent::new("push_started")).await;

    let targets: Vec<String> = if config.tags.is_empty() {
        vec![reference.to_string()]
    } else {
        config
            .tags
            .iter()
            .map(|tag| format!("{reference}:{tag}"))
            .collect()
    };

    for target in targets {
        let _ = logs
            .send(LogRecord::new(LogLevel::Info, format!("pushing {target}")))
            .await;

        let mut cmd = Command::new(program);
        cmd.arg("push").arg(&target);
        run_streaming(cmd, logs)
            .await
            .with_context(|| format!("pushing {target}"))?;
    }

    let _ = status.send(StatusEvent::new("push_completed")).await;
    Ok(())
}

/// `docker login` with the password fed over stdin so it never appears in
/// an argument vector.
async fn login(program: &str, config: &UnitConfig) -> Result<()> {
    let registry_host = config.registry.split('/').next().unwrap_or_default();

    let mut cmd = Command::new(program);
    cmd.arg("login")
        .arg("-u")
        .arg(&config.credentials.username)
        .arg("--password-stdin");
    if !registry_host.is_empty() {
        cmd.arg(registry_host);
    }
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let mut child = cmd.spawn().context("spawning docker login")?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(config.credentials.password.as_bytes())
            .await
            .context("writing login password")?;
    }

    let status = child.wait().await.context("waiting for docker login")?;
    if !status.success() {
        return Err(anyhow!("docker login failed for registry '{registry_host}'"));
    }
    Ok(())
}

/// Run a command to completion, forwarding its stdout as info records and
/// its stderr as debug records.
async fn run_streaming(mut cmd: Command, logs: &mpsc::Sender<LogRecord>) -> Result<()> {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().context("spawning process")?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_logs = logs.clone();
    let stdout_task = tokio::spawn(async move {
        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = stdout_logs.send(LogRecord::new(LogLevel::Info, line)).await;
            }
        }
    });

    let stderr_logs = logs.clone();
    let stderr_task = tokio::spawn(async move {
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = stderr_logs.send(LogRecord::new(LogLevel::Debug, line)).await;
            }
        }
    });

    let status = child.wait().await.context("waiting for process")?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if !status.success() {
        return Err(anyhow!(
            "process exited with code {}",
            status.code().unwrap_or(-1)
        ));
    }
    Ok(())
}
