//! Rebalancer (spec §4.4): on every chunk completion, steals work from the
//! largest outstanding chunk across all live files and splits it in place so
//! idle workers never starve while slower chunks are still in flight.

use std::sync::Arc;

use tokio::sync::watch;

use crate::chunk::Chunk;
use crate::dispatch::{ChunkJob, FileRegistry, FinishedReceiver, JobSender};
use crate::file::File;

/// Runs the rebalancer loop until the aggregator reports every file
/// finished-or-failed, then closes the dispatch queue so workers drain and
/// exit (spec §4.4 "Termination").
pub async fn run_rebalancer(
    finished: FinishedReceiver,
    registry: FileRegistry,
    jobs: JobSender,
    buffer_size: usize,
    mut all_finished: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            notice = finished.recv() => {
                if notice.is_err() {
                    break;
                }
                maybe_split_largest(&registry, buffer_size, &jobs).await;
            }
            changed = all_finished.changed() => {
                if changed.is_err() || *all_finished.borrow() {
                    break;
                }
            }
        }
    }

    jobs.close();
}

/// Finds the chunk with the largest remaining byte count across every live
/// file, and splits it if that remainder is worth splitting (spec's
/// heuristic: `remaining > 2 * buffer_size`).
async fn maybe_split_largest(registry: &FileRegistry, buffer_size: usize, jobs: &JobSender) {
    let threshold = 2 * buffer_size as u64;

    let mut best: Option<(Arc<File>, Arc<Chunk>)> = None;
    for file in registry.iter() {
        if file.is_finished() {
            continue;
        }
        let chunks = file.chunks.lock().await;
        for chunk in chunks.iter() {
            if chunk.remaining() == 0 {
                continue;
            }
            let better = match &best {
                Some((_, current)) => chunk.remaining() > current.remaining(),
                None => true,
            };
            if better {
                best = Some((file.clone(), chunk.clone()));
            }
        }
    }

    let Some((file, victim)) = best else {
        return;
    };

    // Structural mutation (pushing the sibling) is serialized per-file
    // (spec §5); field mutation on the victim itself is lock-free atomics,
    // re-validated here since time has passed since the scan above.
    let mut chunks = file.chunks.lock().await;
    let remaining = victim.remaining();
    if remaining <= threshold {
        return;
    }

    let pos = victim.resume_position();
    let mid = pos + remaining / 2;
    let old_end = victim.end();
    let old_id = victim.id();

    // Spec: "the new sibling inherits the victim's id" — the victim stays in
    // place (same `Arc`, so an in-flight worker already holding it keeps
    // streaming into it uninterrupted) and takes the fresh id instead.
    let new_id = chunks.iter().map(|c| c.id()).max().map_or(0, |m| m + 1);
    victim.set_id(new_id);
    victim.shrink_end_to(mid);

    let sibling = Arc::new(Chunk::new(old_id, mid, old_end, 0));
    chunks.push(sibling);
    drop(chunks);

    let _ = jobs
        .send(ChunkJob {
            file_id: file.id,
            chunk_id: old_id,
            url: file.url.clone(),
            output_path: file.output_path.clone(),
        })
        .await;
}
