//! Explicit run configuration, threaded through the planner, worker
//! factory, and preprocessor constructors instead of a process-wide
//! singleton (spec §9 "Global `goxel` singleton").

use std::collections::HashMap;

/// Parameters shared by every component of a run. Built by the `cli` crate
/// from parsed flags; the engine never parses arguments itself.
#[derive(Debug, Clone)]
pub struct Config {
    /// `--max-conn-file` / `-m`: max parallel chunks per file.
    pub max_conn_file: usize,
    /// `--max-conn`: max parallel chunks total.
    pub max_conn: usize,
    /// `--output` / `-o`: output directory.
    pub output_directory: std::path::PathBuf,
    /// `--insecure`: skip TLS verification.
    pub insecure: bool,
    /// `--overwrite`: overwrite existing output files.
    pub overwrite: bool,
    /// `--proxy` / `-p`.
    pub proxy: Option<String>,
    /// `--buffer-size`, in bytes (flag is given in KiB).
    pub buffer_size: usize,
    /// `--no-resume`: ignore existing sidecars.
    pub no_resume: bool,
    /// `--header` (repeatable), `Name=Value` request headers.
    pub headers: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_conn_file: 4,
            max_conn: 8,
            output_directory: std::path::PathBuf::from("."),
            insecure: false,
            overwrite: false,
            proxy: None,
            buffer_size: 256 * 1024,
            no_resume: false,
            headers: HashMap::new(),
        }
    }
}
