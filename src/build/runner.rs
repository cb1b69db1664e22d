// src/build/runner.rs

//! Contract between the wave engine and a single-block build driver.
//!
//! A driver hands back three finite streams: structured log records, opaque
//! status transitions, and a terminal completion. The engine never looks at
//! the streaming shape itself; [`consume`] folds the three streams into a
//! `(image id, outcome)` pair, which is all the scheduler sees.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::build::unit::UnitConfig;

/// Severity of a runner log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

/// One structured log record emitted by a build driver.
///
/// A record whose `fields` contain an `image_id` entry reveals the image
/// identifier the block produced; the most recent such record wins.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The `image_id` field, if this record carries one.
    pub fn image_id(&self) -> Option<&str> {
        self.fields.get("image_id").map(|s| s.as_str())
    }
}

/// An internal driver state transition. Opaque to the engine; forwarded to
/// the log sink at debug level.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub event_type: String,
    pub fields: BTreeMap<String, String>,
}

impl StatusEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            fields: BTreeMap::new(),
        }
    }
}

/// Terminal status of one block's build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Failed(String),
}

/// The receiving half of a running build: what a [`BuildRunner`] hands the
/// engine.
pub struct RunnerStreams {
    pub logs: mpsc::Receiver<LogRecord>,
    pub status: mpsc::Receiver<StatusEvent>,
    pub done: oneshot::Receiver<anyhow::Result<()>>,
}

/// The producing half, held by the driver while the build runs.
pub struct RunnerChannels {
    pub logs: mpsc::Sender<LogRecord>,
    pub status: mpsc::Sender<StatusEvent>,
    pub done: oneshot::Sender<anyhow::Result<()>>,
}

/// Create a connected channel pair for one build.
pub fn runner_channels(buffer: usize) -> (RunnerChannels, RunnerStreams) {
    let (log_tx, log_rx) = mpsc::channel(buffer);
    let (status_tx, status_rx) = mpsc::channel(buffer);
    let (done_tx, done_rx) = oneshot::channel();

    (
        RunnerChannels {
            logs: log_tx,
            status: status_tx,
            done: done_tx,
        },
        RunnerStreams {
            logs: log_rx,
            status: status_rx,
            done: done_rx,
        },
    )
}

/// Trait abstracting how one block's image build is performed.
///
/// Production code uses [`super::DockerRunner`]; tests provide their own
/// implementation that feeds the streams without touching a container
/// engine. Implementations return immediately; the build itself runs in a
/// task the implementation spawns.
pub trait BuildRunner: Send + Sync + 'static {
    fn run_build(&self, config: UnitConfig, context_dir: &Path) -> RunnerStreams;
}

/// Drive a build's three streams to completion.
///
/// Every log record is forwarded to the log sink at its own level, status
/// events at debug. The returned image id is the last `image_id` field
/// observed before completion. A log or status stream that closes before
/// the completion stream yields is treated as a build failure.
pub async fn consume(block: &str, streams: RunnerStreams) -> (Option<String>, BuildOutcome) {
    let RunnerStreams {
        mut logs,
        mut status,
        mut done,
    } = streams;

    let mut image_id: Option<String> = None;

    loop {
        // Log and status records are drained ahead of the completion value
        // so a buffered `image_id` field is never lost to a faster `done`.
        tokio::select! {
            biased;

            record = logs.recv() => match record {
                Some(record) => {
                    if let Some(id) = record.image_id() {
                        image_id = Some(id.to_string());
                    }
                    forward_log(block, &record);
                }
                None => return (image_id, finish_on_close(&mut done, "log")),
            },

            event = status.recv() => match event {
                Some(event) => {
                    debug!(
                        block = %block,
                        fields = ?event.fields,
                        "status event (type {})",
                        event.event_type
                    );
                }
                None => return (image_id, finish_on_close(&mut done, "status")),
            },

            result = &mut done => {
                return match result {
                    Ok(Ok(())) => (image_id, BuildOutcome::Success),
                    Ok(Err(err)) => (image_id, BuildOutcome::Failed(err.to_string())),
                    Err(_) => (
                        image_id,
                        BuildOutcome::Failed("exit channel closed prematurely".to_string()),
                    ),
                };
            }
        }
    }
}

/// A log or status stream closed. If the completion value was already
/// delivered the build is finished and that value wins; otherwise the
/// stream genuinely closed prematurely.
fn finish_on_close(
    done: &mut oneshot::Receiver<anyhow::Result<()>>,
    which: &str,
) -> BuildOutcome {
    match done.try_recv() {
        Ok(Ok(())) => BuildOutcome::Success,
        Ok(Err(err)) => BuildOutcome::Failed(err.to_string()),
        Err(_) => BuildOutcome::Failed(format!("{which} channel closed prematurely")),
    }
}

/// Forward one runner record to the tracing sink at its own level.
///
/// Fatal and panic records map to error: one block's log stream must not
/// abort the process while its wave-mates are still running.
fn forward_log(block: &str, record: &LogRecord) {
    match record.level {
        LogLevel::Debug => debug!(block = %block, fields = ?record.fields, "{}", record.message),
        LogLevel::Info => info!(block = %block, fields = ?record.fields, "{}", record.message),
        LogLevel::Warn => warn!(block = %block, fields = ?record.fields, "{}", record.message),
        LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => {
            error!(block = %block, fields = ?record.fields, "{}", record.message)
        }
    }
}
