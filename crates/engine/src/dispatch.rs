//! The dispatch queue: a shared multi-producer/multi-consumer FIFO of chunk
//! jobs (spec §2, §4.4, glossary "Dispatch queue"). Also defines the
//! finished-notification channel workers report completions on.
//!
//! Jobs carry `file_id` + `chunk_id` rather than an owning reference, per the
//! back-pointer design in spec §9: the worker and rebalancer both resolve a
//! job against the shared [`FileRegistry`], which owns the actual `File`s
//! and their chunk lists.

use std::sync::Arc;

use crate::chunk::Chunk;
use crate::file::File;

/// A chunk job on the dispatch queue (spec §3 "Chunk job").
#[derive(Debug, Clone)]
pub struct ChunkJob {
    pub file_id: u32,
    pub chunk_id: u32,
    pub url: String,
    pub output_path: std::path::PathBuf,
}

/// Reported by a worker on chunk completion (spec §4.3: "announce completion
/// with `{file_id, chunk_id}` on a finished channel").
#[derive(Debug, Clone, Copy)]
pub struct FinishedNotice {
    pub file_id: u32,
    pub chunk_id: u32,
}

/// All files live for the duration of a run, indexed by `file_id`.
pub type FileRegistry = Arc<Vec<Arc<File>>>;

pub type JobSender = async_channel::Sender<ChunkJob>;
pub type JobReceiver = async_channel::Receiver<ChunkJob>;

pub type FinishedSender = async_channel::Sender<FinishedNotice>;
pub type FinishedReceiver = async_channel::Receiver<FinishedNotice>;

/// Creates the shared dispatch queue. Unbounded: a planner producing chunks
/// faster than workers can drain them should not block on HEAD requests
/// (spec §5 names the worker pool size, not the queue capacity, as the
/// bound on in-flight work).
pub fn dispatch_queue() -> (JobSender, JobReceiver) {
    async_channel::unbounded()
}

/// Creates the finished-notification channel (spec §5: "many producers, one
/// consumer = rebalancer").
pub fn finished_channel() -> (FinishedSender, FinishedReceiver) {
    async_channel::unbounded()
}

/// Resolves a job's `chunk_id` against its file's current chunk list,
/// cloning the `Arc<Chunk>` so the caller can release the list lock before
/// doing any I/O (spec §5: the per-file mutex guards the *list*, not
/// individual chunk fields, which are lock-free atomics).
pub async fn resolve_chunk(file: &File, chunk_id: u32) -> Option<Arc<Chunk>> {
    file.chunks
        .lock()
        .await
        .iter()
        .find(|c| c.id() == chunk_id)
        .cloned()
}
