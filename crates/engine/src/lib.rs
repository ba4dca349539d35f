//! Core engine: chunked, resumable, rebalancing HTTP downloads (spec §1-§5).
//!
//! `cli` drives this crate through [`run`]: build a [`Config`], collect raw
//! URLs, run them through a preprocessor chain, and hand both to [`run`],
//! which plans, dispatches, downloads, rebalances, and aggregates until every
//! file is finished or failed.

pub mod aggregator;
pub mod chunk;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod file;
pub mod planner;
pub mod preprocess;
pub mod rebalancer;
pub mod status;
pub mod worker;

pub use aggregator::Summary;
pub use config::Config;
pub use dispatch::FileRegistry;
pub use error::{ChunkError, ConfigError, PlanError};
pub use file::File;
pub use preprocess::UrlPreprocessor;
pub use status::{FileStatus, Message, MessageKind, StatusSnapshot};

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Everything a renderer needs to follow a run to completion: a live
/// snapshot feed, the warning/error message bus, and a handle to await the
/// final [`Summary`] (spec §4.8's "Snapshot API consumed by progress
/// renderers").
pub struct RunHandle {
    pub snapshots: watch::Receiver<StatusSnapshot>,
    pub messages: status::MessageReceiver,
    pub registry: FileRegistry,
    join: tokio::task::JoinHandle<Summary>,
}

impl RunHandle {
    /// Waits for the aggregator to observe every file finished-or-failed and
    /// returns the final summary.
    pub async fn wait(self) -> Summary {
        self.join.await.unwrap_or(Summary {
            total_bytes: 0,
            elapsed: std::time::Duration::default(),
        })
    }

    /// Splits this handle into its parts so a caller can drive a render loop
    /// on the snapshot/message streams while separately awaiting completion.
    pub fn into_parts(
        self,
    ) -> (
        watch::Receiver<StatusSnapshot>,
        status::MessageReceiver,
        tokio::task::JoinHandle<Summary>,
    ) {
        (self.snapshots, self.messages, self.join)
    }
}

/// Plans and downloads every URL according to `config`, after running them
/// through `preprocessors` in order (spec §5's top-level control flow).
///
/// Spawns one planner task per file, a worker pool sized
/// `min(max_conn, max_conn_file * file_count)` (spec §5), one rebalancer
/// task, and one aggregator task, then returns immediately with a
/// [`RunHandle`] the caller can use to drive a renderer loop.
pub async fn run(
    config: Config,
    urls: Vec<String>,
    preprocessors: Vec<Box<dyn UrlPreprocessor>>,
) -> Result<RunHandle, ConfigError> {
    if urls.is_empty() {
        return Err(ConfigError::NoUrls);
    }

    let client = platform::build_client(config.proxy.as_deref(), config.insecure)
        .map_err(ConfigError::Client)?;

    let (messages_tx, messages_rx) = status::message_bus();
    let urls = preprocess::run_chain(&preprocessors, urls, &messages_tx).await;
    if urls.is_empty() {
        return Err(ConfigError::NoUrls);
    }

    let mut files = Vec::with_capacity(urls.len());
    for (id, url) in urls.into_iter().enumerate() {
        let output_path = file::allocate_output(&config.output_directory, &url, config.overwrite)
            .map_err(|source| ConfigError::OutputDirectory {
                path: config.output_directory.clone(),
                source,
            })?;
        files.push(Arc::new(File::new(
            id as u32,
            url,
            output_path,
            config.max_conn_file,
        )));
    }
    let registry: FileRegistry = Arc::new(files);

    let (jobs_tx, jobs_rx) = dispatch::dispatch_queue();
    let (finished_tx, finished_rx) = dispatch::finished_channel();
    let (all_finished_tx, all_finished_rx) = watch::channel(false);
    let (snapshot_tx, snapshot_rx) = watch::channel(StatusSnapshot::default());

    for file in registry.iter().cloned() {
        let client = client.clone();
        let headers = config.headers.clone();
        let max_conn_file = config.max_conn_file;
        let no_resume = config.no_resume;
        let jobs_tx = jobs_tx.clone();
        tokio::spawn(async move {
            if let Err(e) =
                planner::plan_file(&file, &client, &headers, max_conn_file, no_resume, &jobs_tx)
                    .await
            {
                warn!(file_id = file.id, error = %e, "file planning failed");
            }
        });
    }

    let worker_count = config
        .max_conn
        .min(config.max_conn_file * registry.len().max(1))
        .max(1);
    info!(worker_count, file_count = registry.len(), "starting worker pool");

    for worker_id in 0..worker_count {
        tokio::spawn(worker::run_worker(
            worker_id as u32,
            client.clone(),
            config.headers.clone(),
            config.buffer_size,
            jobs_rx.clone(),
            registry.clone(),
            finished_tx.clone(),
            messages_tx.clone(),
        ));
    }
    drop(jobs_rx);
    drop(finished_tx);

    tokio::spawn(rebalancer::run_rebalancer(
        finished_rx,
        registry.clone(),
        jobs_tx,
        config.buffer_size,
        all_finished_rx,
    ));

    let join = tokio::spawn(aggregator::run_aggregator(
        registry.clone(),
        snapshot_tx,
        all_finished_tx,
    ));

    Ok(RunHandle {
        snapshots: snapshot_rx,
        messages: messages_rx,
        registry,
        join,
    })
}
