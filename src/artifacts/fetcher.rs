// src/artifacts/fetcher.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Reads a path out of a built image as a tar archive.
///
/// Production code uses [`DockerArtifactFetcher`]; tests provide their own
/// implementation that serves pre-built archives.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync + 'static {
    /// Return a tar archive of the directory `path` inside the image
    /// identified by `image_id`.
    async fn fetch_archive(&self, image_id: &str, path: &str) -> Result<Vec<u8>>;
}

/// Artifact fetcher backed by the `docker` CLI.
///
/// A temporary container is created from the image so its filesystem can be
/// read; `docker cp <id>:<path> -` emits the requested directory as a tar
/// stream on stdout. The container is removed on every exit path.
#[derive(Debug, Clone)]
pub struct DockerArtifactFetcher {
    program: String,
}

impl DockerArtifactFetcher {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn create_container(&self, image_id: &str) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("create")
            .arg(image_id)
            .output()
            .await
            .context("spawning docker create")?;

        if !output.status.success() {
            return Err(anyhow!(
                "docker create failed for image '{}': {}",
                image_id,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn remove_container(&self, container_id: &str) {
        let removed = Command::new(&self.program)
            .arg("rm")
            .arg("-f")
            .arg(container_id)
            .output()
            .await;

        match removed {
            Ok(output) if output.status.success() => {
                debug!(container = %container_id, "removed artifact container");
            }
            Ok(output) => warn!(
                container = %container_id,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "failed to remove artifact container"
            ),
            Err(err) => warn!(
                container = %container_id,
                error = %err,
                "failed to remove artifact container"
            ),
        }
    }
}

impl Default for DockerArtifactFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactFetcher for DockerArtifactFetcher {
    async fn fetch_archive(&self, image_id: &str, path: &str) -> Result<Vec<u8>> {
        let container_id = self.create_container(image_id).await?;

        let copied = Command::new(&self.program)
            .arg("cp")
            .arg(format!("{container_id}:{path}"))
            .arg("-")
            .output()
            .await
            .context("spawning docker cp");

        self.remove_container(&container_id).await;

        let output = copied?;
        if !output.status.success() {
            return Err(anyhow!(
                "docker cp failed for '{}' in image '{}': {}",
                path,
                image_id,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(output.stdout)
    }
}
