//! Command-line flags (spec §6), parsed with `clap`'s derive API.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "fluxdm", version, about = "A chunked, resumable HTTP download accelerator")]
pub struct Args {
    /// Additional URLs to download, given positionally.
    pub urls: Vec<String>,

    /// Max parallel chunks per file.
    #[arg(short = 'm', long = "max-conn-file", default_value_t = 4)]
    pub max_conn_file: usize,

    /// Max parallel chunks total.
    #[arg(long = "max-conn", default_value_t = 8)]
    pub max_conn: usize,

    /// Path to a newline-separated URL list.
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Output directory.
    #[arg(short = 'o', long = "output", default_value = ".")]
    pub output: PathBuf,

    /// Skip TLS certificate verification.
    #[arg(long = "insecure")]
    pub insecure: bool,

    /// Overwrite existing output files.
    #[arg(long = "overwrite")]
    pub overwrite: bool,

    /// Suppress the progress UI.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Proxy URL: `(http|https|socks5)://host:port`.
    #[arg(short = 'p', long = "proxy")]
    pub proxy: Option<String>,

    /// Copy buffer size, in KiB.
    #[arg(long = "buffer-size", default_value_t = 256)]
    pub buffer_size_kib: usize,

    /// Scroll output rather than redraw in place.
    #[arg(short = 's', long = "scroll")]
    pub scroll: bool,

    /// Ignore existing sidecars and start fresh.
    #[arg(long = "no-resume")]
    pub no_resume: bool,

    /// Repeatable `Name=Value` request header.
    #[arg(long = "header")]
    pub header: Vec<String>,

    /// AllDebrid username, falling back to `GOXEL_ALLDEBRID_USERNAME`.
    #[arg(long = "alldebrid-username", env = "GOXEL_ALLDEBRID_USERNAME")]
    pub alldebrid_username: Option<String>,

    /// AllDebrid password, falling back to `GOXEL_ALLDEBRID_PASSWD`.
    #[arg(long = "alldebrid-password", env = "GOXEL_ALLDEBRID_PASSWD")]
    pub alldebrid_password: Option<String>,
}

impl Args {
    /// Parses `--header Name=Value` entries, dropping malformed ones with a
    /// warning left to the caller (spec §6: header flag is repeatable).
    pub fn parsed_headers(&self) -> Vec<(String, String)> {
        self.header
            .iter()
            .filter_map(|h| h.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect()
    }
}
