//! Download worker (spec §4.3): pulls chunk jobs off the dispatch queue,
//! fetches one ranged GET per job, and streams the body to the correct
//! offset in the output file.
//!
//! Grounded on `Fluxaus-FluxDM::chunked::download_chunk` for the
//! ranged-GET-then-seek-then-stream shape, generalized to read from the
//! shared dispatch queue and to report completion on the finished channel
//! instead of returning synchronously. Per spec's Non-goals ("no retry
//! backoff policy beyond skipping failed chunks"), a failed chunk is
//! abandoned once — the teacher's `max_retries`/`exponential_backoff` are
//! deliberately not reproduced here.

use std::collections::HashMap;

use futures_util::TryStreamExt;
use reqwest::Client;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

use crate::dispatch::{resolve_chunk, FinishedNotice, FinishedSender, FileRegistry, JobReceiver};
use crate::error::ChunkError;
use crate::status::{Message, MessageSender};

/// Reports a per-chunk transport/IO failure on the message bus (spec §7:
/// "per-chunk transport: ... chunk abandoned"), using `ChunkError`'s
/// `Display` impl for the taxonomy-consistent wording rather than an ad-hoc
/// string at each call site.
async fn report_chunk_error(
    messages: &MessageSender,
    file_id: u32,
    chunk_id: u32,
    error: ChunkError,
) {
    let _ = messages
        .send(Message::error_for_file(
            file_id,
            "worker",
            format!("chunk {chunk_id}: {error}"),
        ))
        .await;
}

/// Runs one worker's pull loop until the dispatch queue closes and drains
/// (spec §4.5 "Finish semantics"). Intended to be spawned once per pool
/// slot; `worker_id` is stamped onto claimed chunks for display forensics
/// only (spec §9).
#[allow(clippy::too_many_arguments)]
pub async fn run_worker(
    worker_id: u32,
    client: Client,
    headers: HashMap<String, String>,
    buffer_size: usize,
    jobs: JobReceiver,
    registry: FileRegistry,
    finished: FinishedSender,
    messages: MessageSender,
) {
    while let Ok(job) = jobs.recv().await {
        let Some(file) = registry.iter().find(|f| f.id == job.file_id) else {
            continue;
        };

        let Some(chunk) = resolve_chunk(file, job.chunk_id).await else {
            continue;
        };

        if chunk.is_complete() {
            continue;
        }

        // Suspension point: blocks until this file has a free per-file slot
        // (spec §5's `--max-conn-file` bound). Never busy-loops.
        let Ok(_permit) = file.semaphore.acquire().await else {
            continue;
        };

        chunk.set_worker(worker_id);

        let range = format!(
            "bytes={}-{}",
            chunk.resume_position(),
            chunk.end().saturating_sub(1)
        );

        let mut request = client.get(&job.url).header(reqwest::header::RANGE, range);
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                report_chunk_error(
                    &messages,
                    job.file_id,
                    job.chunk_id,
                    ChunkError::Network(e.to_string()),
                )
                .await;
                continue;
            }
        };

        if response.status().as_u16() >= 400 {
            report_chunk_error(
                &messages,
                job.file_id,
                job.chunk_id,
                ChunkError::Http(response.status().as_u16()),
            )
            .await;
            continue;
        }

        let mut out = match tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .open(&job.output_path)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                report_chunk_error(
                    &messages,
                    job.file_id,
                    job.chunk_id,
                    ChunkError::Io(format!("could not open output file: {e}")),
                )
                .await;
                continue;
            }
        };

        if let Err(e) = out
            .seek(std::io::SeekFrom::Start(chunk.resume_position()))
            .await
        {
            report_chunk_error(
                &messages,
                job.file_id,
                job.chunk_id,
                ChunkError::Io(format!("seek failed: {e}")),
            )
            .await;
            continue;
        }

        let byte_stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(byte_stream);
        let mut buf = vec![0u8; buffer_size.max(1)];
        let mut io_error = None;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    io_error = Some(e);
                    break;
                }
            };

            if let Err(e) = out.write_all(&buf[..n]).await {
                io_error = Some(e);
                break;
            }

            chunk.add_done(n as u64);

            // Re-checked every iteration, not just once: a concurrent
            // rebalancer split can shrink this chunk's `end`/`total` while
            // the GET is still streaming, at which point the live `total()`
            // this worker reads drops and it stops exactly at the new
            // boundary, ceding the tail to the sibling job (spec §4.4/§5).
            if chunk.is_complete() {
                break;
            }
        }

        if let Some(e) = io_error {
            report_chunk_error(
                &messages,
                job.file_id,
                job.chunk_id,
                ChunkError::Io(e.to_string()),
            )
            .await;
            continue;
        }

        let _ = finished
            .send(FinishedNotice {
                file_id: job.file_id,
                chunk_id: job.chunk_id,
            })
            .await;
    }
}
