//! File-state aggregator (spec §4.5): on a ~100ms tick, recomputes each
//! file's status, finalizes files that reached `done >= size`, and rewrites
//! sidecars on a sparser cadence so resume state stays near-current without
//! thrashing the disk.
//!
//! Grounded on `original_source/goxel/monitor.go`'s tick loop for the
//! cadence and rewrite-sparsity constants (`monitorCount = 10`).

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::dispatch::FileRegistry;
use crate::planner::write_sidecar;
use crate::status::{snapshot, StatusSnapshot};

/// Tick interval between aggregation passes (spec §4.5).
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Sidecars are rewritten every `SIDECAR_REWRITE_TICKS` ticks, matching the
/// original accelerator's `monitorCount` constant.
pub const SIDECAR_REWRITE_TICKS: u32 = 10;

/// Final totals reported once every file has reached finished-or-failed
/// (spec §4.5 "Finish semantics": "a final aggregation prints total bytes
/// and elapsed time").
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub total_bytes: u64,
    pub elapsed: Duration,
}

/// Runs the aggregator loop until every file is finished or errored, then
/// signals the rebalancer (via `all_finished`) to close the dispatch queue,
/// and returns the final summary.
pub async fn run_aggregator(
    registry: FileRegistry,
    snapshot_tx: watch::Sender<StatusSnapshot>,
    all_finished_tx: watch::Sender<bool>,
) -> Summary {
    let start = Instant::now();
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    let mut tick_count: u32 = 0;

    loop {
        interval.tick().await;
        tick_count += 1;

        let all_done = tick(&registry, tick_count).await;
        let snap = snapshot(&registry).await;
        let _ = snapshot_tx.send(snap);

        if all_done {
            break;
        }
    }

    for file in registry.iter() {
        if file.is_finished() {
            let _ = tokio::fs::remove_file(&file.work_path).await;
        }
    }

    let _ = all_finished_tx.send(true);

    let total_bytes = {
        let mut total = 0u64;
        for file in registry.iter() {
            let (done, _, _) = file.totals().await;
            total += done;
        }
        total
    };

    Summary {
        total_bytes,
        elapsed: start.elapsed(),
    }
}

/// One aggregation pass: finalizes newly-completed files and, on a sparser
/// cadence, rewrites in-progress sidecars. Returns whether every file has
/// reached finished-or-errored.
async fn tick(registry: &FileRegistry, tick_count: u32) -> bool {
    let rewrite_this_tick = tick_count % SIDECAR_REWRITE_TICKS == 0;
    let mut all_done = true;

    for file in registry.iter() {
        if file.is_errored().await {
            continue;
        }

        if file.is_finished() {
            continue;
        }

        let (done, total, _active) = file.totals().await;

        if done >= file.size().max(total) && done > 0 && file.size() > 0 {
            file.mark_finished();
            info!(file_id = file.id, "file finished");
            continue;
        }

        all_done = false;

        if rewrite_this_tick {
            if let Err(e) = write_sidecar(file).await {
                warn!(file_id = file.id, error = %e, "failed to rewrite sidecar");
            }
        }
    }

    all_done
}
