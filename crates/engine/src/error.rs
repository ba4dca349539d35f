//! Error taxonomy, split by the failure domain each belongs to (spec §7):
//! configuration errors are fatal, planning errors fail one file, transport
//! errors abandon one chunk.

use thiserror::Error;

/// Fatal configuration errors. These abort the whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no URLs to download")]
    NoUrls,
    #[error(transparent)]
    Client(#[from] platform::ClientError),
    #[error("could not create output directory {path}: {source}")]
    OutputDirectory {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-file planning errors. These mark one [`crate::file::File`] as errored
/// and exclude it from dispatch; other files proceed unaffected.
#[derive(Debug, Error, Clone)]
pub enum PlanError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP error: status {0}")]
    Http(u16),
    #[error("missing Content-Length header")]
    MissingContentLength,
}

/// Per-chunk transport/IO errors. These abandon one chunk; the file may
/// still finish via its other chunks, or remain resumable.
#[derive(Debug, Error, Clone)]
pub enum ChunkError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP error: status {0}")]
    Http(u16),
    #[error("file I/O error: {0}")]
    Io(String),
}
