//! Episode audit log: append-only JSONL, one `EpisodeResult` per line.
//!
//! Each append holds an exclusive advisory lock on the file for the duration
//! of the write, so concurrent writers never interleave partial lines.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::result::EpisodeResult;

/// File name of the audit log inside a run directory.
pub const AUDIT_FILE: &str = "episodes.jsonl";

/// Append-only episode log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log at `{run_dir}/episodes.jsonl`.
    pub fn in_run_dir(run_dir: &Path) -> Self {
        Self::new(run_dir.join(AUDIT_FILE))
    }

    pub fn append(&self, result: &EpisodeResult) -> io::Result<()> {
        let mut line = serde_json::to_string(result)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock()?;
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        let unlocked = file.unlock();
        written?;
        unlocked
    }

    /// Read every well-formed record. Malformed lines are skipped.
    pub fn read_all(&self) -> io::Result<Vec<EpisodeResult>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let reader = io::BufReader::new(file);
        let mut results = Vec::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<EpisodeResult>(&line) {
                Ok(result) => results.push(result),
                Err(e) => log::warn!(
                    "skipping malformed audit line {} in {}: {e}",
                    lineno + 1,
                    self.path.display()
                ),
            }
        }

        Ok(results)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
