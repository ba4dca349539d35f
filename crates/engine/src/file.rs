//! A [`File`] owns one input URL's chunk list and tracks its lifecycle:
//! `planned -> downloading -> finished|failed` (spec §3).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, Semaphore};

use crate::chunk::Chunk;

/// Sidecar file extension, matching the original GoXel accelerator's
/// `<output>.<ext>` naming (spec §3, §6).
pub const SIDECAR_EXTENSION: &str = "gx";

pub struct File {
    pub id: u32,
    pub url: String,
    pub output_path: PathBuf,
    pub work_path: PathBuf,
    pub chunks: Mutex<Vec<std::sync::Arc<Chunk>>>,
    /// Gates concurrent chunk claims for this file to `--max-conn-file`
    /// (spec §5). Acquiring is a suspension point, never a busy loop.
    pub semaphore: Semaphore,
    size: AtomicU64,
    finished: AtomicBool,
    error: Mutex<Option<String>>,
}

impl File {
    pub fn new(id: u32, url: String, output_path: PathBuf, max_conn_file: usize) -> Self {
        let work_path = sidecar_path(&output_path);
        Self {
            id,
            url,
            output_path,
            work_path,
            chunks: Mutex::new(Vec::new()),
            semaphore: Semaphore::new(max_conn_file.max(1)),
            size: AtomicU64::new(0),
            finished: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    pub fn set_size(&self, size: u64) {
        self.size.store(size, Ordering::Relaxed);
    }

    pub async fn set_error(&self, msg: impl Into<String>) {
        *self.error.lock().await = Some(msg.into());
    }

    pub async fn error(&self) -> Option<String> {
        self.error.lock().await.clone()
    }

    pub async fn is_errored(&self) -> bool {
        self.error.lock().await.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    /// Sums `done`/`total` across this file's chunks and counts "active
    /// connections" as chunks whose `done` is strictly between `0` and
    /// `total` (glossary: "Active connection"), matching the original
    /// accelerator's `UpdateStatus` exactly.
    pub async fn totals(&self) -> (u64, u64, u64) {
        let chunks = self.chunks.lock().await;
        let mut done = 0u64;
        let mut total = 0u64;
        let mut active = 0u64;
        for chunk in chunks.iter() {
            done += chunk.done();
            total += chunk.total();
            if chunk.is_active() {
                active += 1;
            }
        }
        (done, total, active)
    }
}

pub fn sidecar_path(output: &Path) -> PathBuf {
    let mut s = output.as_os_str().to_os_string();
    s.push(".");
    s.push(SIDECAR_EXTENSION);
    PathBuf::from(s)
}

/// Picks the output path for `url` under `directory`, applying spec §6's
/// collision policy: numeric suffixes (`name.0`, `name.1`, …) unless
/// overwrite was requested and no sidecar exists. A sidecar already sitting
/// next to a candidate path means that candidate is a resumable in-progress
/// download, which takes precedence over `--overwrite` (spec §9).
pub fn allocate_output(directory: &Path, url: &str, overwrite: bool) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(directory)?;

    let base_name = base_name_of(url);
    let mut candidate = directory.join(&base_name);
    let mut suffix: i64 = -1;

    loop {
        let output_exists = candidate.exists();
        let sidecar_exists = sidecar_path(&candidate).exists();

        if output_exists && !sidecar_exists {
            if suffix == -1 && overwrite {
                break;
            }
            suffix += 1;
            candidate = directory.join(format!("{base_name}.{suffix}"));
            continue;
        }

        break;
    }

    Ok(candidate)
}

/// Last path segment of a URL, matching Go's `path.Base(f.URL)` (spec §6
/// "Output naming"). Falls back to a fixed name for URLs with no segments.
fn base_name_of(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.rsplit('/').find(|s| !s.is_empty()) {
        Some(name) => name.to_string(),
        None => "download".to_string(),
    }
}
