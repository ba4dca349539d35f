//! Newline-delimited URL list loader (`--file`). Folded directly into the
//! `cli` crate per SPEC_FULL §1: reading lines from a file doesn't warrant a
//! pluggable collaborator interface of its own.

use std::path::Path;

/// Reads one URL per non-empty line. Blank-line/whitespace filtering happens
/// later in the preprocessor chain (spec §8 "URL list containing blanks and
/// malformed URLs"); this loader only splits the file into lines.
pub fn load_url_file(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents.lines().map(|l| l.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    #[test]
    fn reads_one_url_per_line() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "https://example.com/a").unwrap();
        writeln!(f, "").unwrap();
        writeln!(f, "https://example.com/b").unwrap();

        let urls = load_url_file(f.path()).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com/a".to_string(),
                "".to_string(),
                "https://example.com/b".to_string(),
            ]
        );
    }
}
