// Not every test binary uses every helper in here.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use winchman::artifacts::ArtifactFetcher;
use winchman::build::{
    runner_channels, BuildRunner, LogLevel, LogRecord, RunnerStreams, UnitConfig,
};
use winchman::config::PushCredentials;
use winchman::fetch::BuildPackageOptions;
use winchman::InvokeBuildOptions;

/// Observable milestones of a fake build, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Launched(String),
    Completed(String),
}

#[derive(Debug, Clone)]
struct BlockBehaviour {
    image_id: Option<String>,
    failure: Option<String>,
}

/// A fake build driver that:
/// - records launches and completions (with their relative order),
/// - records the `UnitConfig` each block was handed,
/// - snapshots which producers' artifact directories existed in the context
///   at launch time,
/// - reveals a configured image id through an `image_id` log field and then
///   reports the configured outcome.
///
/// A small delay before completion keeps launch and completion events from
/// interleaving trivially, so wave-level concurrency is observable.
pub struct FakeRunner {
    behaviours: HashMap<String, BlockBehaviour>,
    delay: Duration,
    events: Arc<Mutex<Vec<RunnerEvent>>>,
    seen_configs: Arc<Mutex<Vec<UnitConfig>>>,
    launch_inputs: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            behaviours: HashMap::new(),
            delay: Duration::from_millis(25),
            events: Arc::new(Mutex::new(Vec::new())),
            seen_configs: Arc::new(Mutex::new(Vec::new())),
            launch_inputs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Block succeeds and reveals the given image id.
    pub fn succeeds(mut self, block: &str, image_id: &str) -> Self {
        self.behaviours.insert(
            block.to_string(),
            BlockBehaviour {
                image_id: Some(image_id.to_string()),
                failure: None,
            },
        );
        self
    }

    /// Block succeeds without ever revealing an image id.
    pub fn succeeds_without_image(mut self, block: &str) -> Self {
        self.behaviours.insert(
            block.to_string(),
            BlockBehaviour {
                image_id: None,
                failure: None,
            },
        );
        self
    }

    /// Block fails with the given reason.
    pub fn fails(mut self, block: &str, reason: &str) -> Self {
        self.behaviours.insert(
            block.to_string(),
            BlockBehaviour {
                image_id: None,
                failure: Some(reason.to_string()),
            },
        );
        self
    }

    pub fn events(&self) -> Vec<RunnerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn launched(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RunnerEvent::Launched(name) => Some(name),
                RunnerEvent::Completed(_) => None,
            })
            .collect()
    }

    pub fn seen_configs(&self) -> Vec<UnitConfig> {
        self.seen_configs.lock().unwrap().clone()
    }

    /// Producers whose artifacts were already installed in the context when
    /// the given block launched.
    pub fn inputs_at_launch(&self, block: &str) -> Vec<String> {
        self.launch_inputs
            .lock()
            .unwrap()
            .get(block)
            .cloned()
            .unwrap_or_default()
    }
}

impl BuildRunner for FakeRunner {
    fn run_build(&self, config: UnitConfig, context_dir: &Path) -> RunnerStreams {
        let name = config.name.clone();

        self.events
            .lock()
            .unwrap()
            .push(RunnerEvent::Launched(name.clone()));
        self.launch_inputs
            .lock()
            .unwrap()
            .insert(name.clone(), installed_inputs(context_dir));
        self.seen_configs.lock().unwrap().push(config);

        let behaviour = self
            .behaviours
            .get(&name)
            .cloned()
            .unwrap_or(BlockBehaviour {
                image_id: Some(format!("img-{name}")),
                failure: None,
            });
        let delay = self.delay;
        let events = Arc::clone(&self.events);

        let (ch, streams) = runner_channels(8);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if let Some(image_id) = &behaviour.image_id {
                let _ = ch
                    .logs
                    .send(
                        LogRecord::new(LogLevel::Info, "built image")
                            .with_field("image_id", image_id),
                    )
                    .await;
            }

            events
                .lock()
                .unwrap()
                .push(RunnerEvent::Completed(name.clone()));

            let result = match behaviour.failure {
                None => Ok(()),
                Some(reason) => Err(anyhow::anyhow!(reason)),
            };
            let _ = ch.done.send(result);
            drop(ch.logs);
            drop(ch.status);
        });

        streams
    }
}

/// Sorted names under `<context>/.winchman/in/`, empty when absent.
fn installed_inputs(context_dir: &Path) -> Vec<String> {
    let in_dir = context_dir.join(".winchman/in");
    let mut names: Vec<String> = std::fs::read_dir(in_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Artifact fetcher serving canned tar archives keyed by image id.
pub struct MapFetcher {
    archives: HashMap<String, Vec<u8>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self {
            archives: HashMap::new(),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve an archive for `image_id` containing `out/<file>` with the
    /// given contents.
    pub fn with_artifact(mut self, image_id: &str, file: &str, contents: &[u8]) -> Self {
        self.archives
            .insert(image_id.to_string(), out_archive(file, contents));
        self
    }

    /// Image ids artifacts were fetched for, in fetch order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactFetcher for MapFetcher {
    async fn fetch_archive(&self, image_id: &str, _path: &str) -> anyhow::Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(image_id.to_string());
        self.archives
            .get(image_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no artifacts for image '{image_id}'"))
    }
}

/// A tar archive containing a single `out/<file>` entry.
pub fn out_archive(file: &str, contents: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_path(format!("out/{file}")).unwrap();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, contents).unwrap();
    builder.into_inner().unwrap()
}

/// Pipeline options with a registry and fallback project, no credentials.
pub fn test_options() -> InvokeBuildOptions {
    InvokeBuildOptions {
        registry: "registry.test/acme".to_string(),
        project_name: "test-project".to_string(),
        build_package: BuildPackageOptions::default(),
        default_push_credentials: PushCredentials::default(),
    }
}
