//! Status observer interface (spec §4.8 / SPEC_FULL §4.8): a snapshot API for
//! progress renderers, plus the message bus warnings/errors are routed on.

use std::path::PathBuf;
use std::sync::Arc;

use crate::dispatch::FileRegistry;

/// Sentinel `file_id` for a message with no owning file (spec §3 "Message":
/// "otherwise it is displayed globally").
pub const GLOBAL_MESSAGE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Warning,
    Error,
}

/// A routed warning/error/info string (spec §3 "Message").
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageKind,
    pub context: String,
    pub content: String,
    pub file_id: u32,
}

impl Message {
    pub fn info(context: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            context: context.into(),
            content: content.into(),
            file_id: GLOBAL_MESSAGE,
        }
    }

    pub fn warning(context: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Warning,
            context: context.into(),
            content: content.into(),
            file_id: GLOBAL_MESSAGE,
        }
    }

    pub fn error_for_file(file_id: u32, context: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            context: context.into(),
            content: content.into(),
            file_id,
        }
    }
}

pub type MessageSender = async_channel::Sender<Message>;
pub type MessageReceiver = async_channel::Receiver<Message>;

/// Creates the shared message bus (spec §5: "many producers, one consumer =
/// observer").
pub fn message_bus() -> (MessageSender, MessageReceiver) {
    async_channel::unbounded()
}

/// Per-file status as consumed by a progress renderer.
#[derive(Debug, Clone)]
pub struct FileStatus {
    pub id: u32,
    pub output_path: PathBuf,
    pub ratio: f64,
    pub active_connections: u64,
    pub done: u64,
    pub size: u64,
    pub finished: bool,
    pub error: Option<String>,
}

/// A point-in-time view across every file in a run, consumed by renderers
/// and tests alike (spec §4.8's "Snapshot API consumed by progress
/// renderers").
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub files: Vec<FileStatus>,
    pub total_done: u64,
    pub total_size: u64,
}

impl StatusSnapshot {
    pub fn all_finished(&self) -> bool {
        !self.files.is_empty()
            && self
                .files
                .iter()
                .all(|f| f.finished || f.error.is_some())
    }
}

/// Builds a [`StatusSnapshot`] by summing each file's chunk totals (spec
/// §4.5's per-tick computation, made available outside the aggregator so
/// tests and one-shot callers don't need a running aggregator task).
pub async fn snapshot(registry: &FileRegistry) -> StatusSnapshot {
    let mut files = Vec::with_capacity(registry.len());
    let mut total_done = 0u64;
    let mut total_size = 0u64;

    for file in registry.iter() {
        let (done, total, active) = file.totals().await;
        let size = file.size();
        total_done += done;
        total_size += total.max(size);

        files.push(FileStatus {
            id: file.id,
            output_path: file.output_path.clone(),
            ratio: if total > 0 {
                (done as f64 / total as f64) * 100.0
            } else {
                0.0
            },
            active_connections: active,
            done,
            size,
            finished: file.is_finished(),
            error: file.error().await,
        });
    }

    StatusSnapshot {
        files,
        total_done,
        total_size,
    }
}

pub fn registry_from(files: Vec<Arc<crate::file::File>>) -> FileRegistry {
    Arc::new(files)
}
