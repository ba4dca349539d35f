//! File planner (spec §4.2): HEADs a URL, decides whether to resume or
//! partition fresh, writes the sidecar, then pushes every chunk onto the
//! dispatch queue.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;

use crate::chunk::{fresh_chunks, resume_chunks, Chunk};
use crate::dispatch::{ChunkJob, JobSender};
use crate::error::PlanError;
use crate::file::File;

/// Plans one file: HEAD, resume-or-fresh chunk construction, sidecar write,
/// job dispatch. On any planning failure the file's `error` is set and the
/// file contributes no jobs — other files proceed unaffected (spec §7).
pub async fn plan_file(
    file: &Arc<File>,
    client: &Client,
    headers: &HashMap<String, String>,
    max_conn_file: usize,
    no_resume: bool,
    jobs: &JobSender,
) -> Result<(), PlanError> {
    match plan_file_inner(file, client, headers, max_conn_file, no_resume, jobs).await {
        Ok(()) => Ok(()),
        Err(e) => {
            file.set_error(e.to_string()).await;
            Err(e)
        }
    }
}

async fn plan_file_inner(
    file: &Arc<File>,
    client: &Client,
    headers: &HashMap<String, String>,
    max_conn_file: usize,
    no_resume: bool,
    jobs: &JobSender,
) -> Result<(), PlanError> {
    let mut request = client.head(&file.url);
    for (name, value) in headers {
        request = request.header(name, value);
    }

    let response = request
        .send()
        .await
        .map_err(|e| PlanError::Network(e.to_string()))?;

    if response.status().as_u16() >= 400 {
        return Err(PlanError::Http(response.status().as_u16()));
    }

    let content_length = response
        .content_length()
        .ok_or(PlanError::MissingContentLength)?;
    file.set_size(content_length);

    let supports_ranges = response
        .headers()
        .get(reqwest::header::ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "bytes")
        .unwrap_or(false);

    let chunks: Vec<Chunk> = if no_resume {
        fresh_chunks(content_length, max_conn_file, supports_ranges)
    } else {
        match storage::read_sidecar(&file.work_path) {
            Ok(records) if !records.is_empty() => resume_chunks(records, max_conn_file),
            _ => fresh_chunks(content_length, max_conn_file, supports_ranges),
        }
    };

    {
        let mut guard = file.chunks.lock().await;
        *guard = chunks.into_iter().map(Arc::new).collect();
    }

    write_sidecar(file).await?;

    let chunk_ids: Vec<u32> = file.chunks.lock().await.iter().map(|c| c.id()).collect();
    for chunk_id in chunk_ids {
        let job = ChunkJob {
            file_id: file.id,
            chunk_id,
            url: file.url.clone(),
            output_path: file.output_path.clone(),
        };
        if jobs.send(job).await.is_err() {
            // dispatch queue closed (run already winding down); nothing more to do
            break;
        }
    }

    Ok(())
}

/// Overwrites this file's sidecar with its current chunk records. Runs on a
/// blocking thread since [`storage::write_sidecar`] is synchronous I/O
/// (spec §4.1/§4.5: writes are whole-file truncate + overwrite).
pub async fn write_sidecar(file: &File) -> Result<(), PlanError> {
    let records: Vec<storage::ChunkRecord> = {
        let chunks = file.chunks.lock().await;
        chunks.iter().map(|c| c.to_record()).collect()
    };
    let path = file.work_path.clone();

    tokio::task::spawn_blocking(move || storage::write_sidecar(&path, &records))
        .await
        .map_err(|e| PlanError::Network(format!("sidecar writer task panicked: {e}")))?
        .map_err(|e| PlanError::Network(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn new_file(id: u32, url: String, dir: &std::path::Path) -> Arc<File> {
        Arc::new(File::new(id, url, dir.join("out.bin"), 4))
    }

    #[tokio::test]
    async fn fresh_plan_splits_by_content_length_and_accept_ranges() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/f"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Length", "1000")
                    .insert_header("Accept-Ranges", "bytes"),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let file = new_file(0, format!("{}/f", server.uri()), dir.path()).await;
        let client = Client::new();
        let (tx, rx) = async_channel::unbounded();

        plan_file(&file, &client, &HashMap::new(), 4, true, &tx)
            .await
            .unwrap();

        assert_eq!(file.size(), 1000);
        let chunks = file.chunks.lock().await;
        assert_eq!(chunks.len(), 4);
        let total: u64 = chunks.iter().map(|c| c.total()).sum();
        assert_eq!(total, 1000);
        drop(chunks);

        let mut jobs = Vec::new();
        while let Ok(job) = rx.try_recv() {
            jobs.push(job);
        }
        assert_eq!(jobs.len(), 4);
    }

    #[tokio::test]
    async fn no_accept_ranges_yields_single_chunk() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/f"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Length", "500"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let file = new_file(0, format!("{}/f", server.uri()), dir.path()).await;
        let client = Client::new();
        let (tx, _rx) = async_channel::unbounded();

        plan_file(&file, &client, &HashMap::new(), 4, true, &tx)
            .await
            .unwrap();

        let chunks = file.chunks.lock().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end(), 500);
    }

    #[tokio::test]
    async fn missing_content_length_is_fatal_for_the_file() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/f"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let file = new_file(0, format!("{}/f", server.uri()), dir.path()).await;
        let client = Client::new();
        let (tx, _rx) = async_channel::unbounded();

        let err = plan_file(&file, &client, &HashMap::new(), 4, true, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::MissingContentLength));
        assert!(file.is_errored().await);
    }

    #[tokio::test]
    async fn http_error_status_is_fatal_for_the_file() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/f"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let file = new_file(0, format!("{}/f", server.uri()), dir.path()).await;
        let client = Client::new();
        let (tx, _rx) = async_channel::unbounded();

        let err = plan_file(&file, &client, &HashMap::new(), 4, true, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Http(404)));
    }

    #[tokio::test]
    async fn resumes_from_existing_sidecar_and_splits_to_requested_count() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/f"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Length", "300")
                    .insert_header("Accept-Ranges", "bytes"),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let file = new_file(0, format!("{}/f", server.uri()), dir.path()).await;

        let records = vec![
            storage::ChunkRecord { id: 0, worker: 0, start: 0, end: 100, done: 50, total: 100 },
            storage::ChunkRecord { id: 1, worker: 0, start: 100, end: 200, done: 50, total: 100 },
            storage::ChunkRecord { id: 2, worker: 0, start: 200, end: 300, done: 0, total: 100 },
        ];
        storage::write_sidecar(&file.work_path, &records).unwrap();

        let client = Client::new();
        let (tx, _rx) = async_channel::unbounded();

        plan_file(&file, &client, &HashMap::new(), 4, false, &tx)
            .await
            .unwrap();

        let chunks = file.chunks.lock().await;
        assert_eq!(chunks.len(), 4);
        let mut ranges: Vec<(u64, u64)> = chunks.iter().map(|c| (c.start, c.end())).collect();
        ranges.sort();
        assert_eq!(ranges[0].0, 50);
        assert_eq!(ranges.last().unwrap().1, 300);
    }
}
