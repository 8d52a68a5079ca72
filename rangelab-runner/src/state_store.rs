//! Crash-safe persistence of one `PortfolioState` per (run, policy).
//!
//! Layout: `{run_dir}/state/{policy}.json`
//!
//! Writes go to a temp file in the same directory, are flushed and synced,
//! then renamed over the target. A reader sees either the old file or the
//! complete new one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rangelab_core::domain::PortfolioState;
use thiserror::Error;

const STATE_DIR: &str = "state";

/// Errors from the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Map a policy name to a file stem. ASCII alphanumerics, `-` and `_` are
/// kept; everything else becomes `_`.
pub fn sanitize_policy_name(policy: &str) -> String {
    let stem: String = policy
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

/// Path of the state file for a policy under a run directory.
pub fn state_path(run_dir: &Path, policy: &str) -> PathBuf {
    run_dir
        .join(STATE_DIR)
        .join(format!("{}.json", sanitize_policy_name(policy)))
}

/// Load a policy's state. A missing file yields the default (closed) state.
pub fn load(run_dir: &Path, policy: &str) -> Result<PortfolioState, StoreError> {
    let path = state_path(run_dir, policy);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PortfolioState::default()),
        Err(e) => return Err(io_err(&path)(e)),
    };
    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt { path, source })
}

/// Whether a state file exists for this policy.
pub fn exists(run_dir: &Path, policy: &str) -> bool {
    state_path(run_dir, policy).is_file()
}

/// Atomically persist a policy's state.
pub fn save(run_dir: &Path, policy: &str, state: &PortfolioState) -> Result<(), StoreError> {
    let path = state_path(run_dir, policy);
    let dir = path.parent().unwrap_or(run_dir);
    fs::create_dir_all(dir).map_err(io_err(dir))?;

    let json = serde_json::to_vec_pretty(state)?;
    let tmp_path = path.with_extension(format!("json.tmp.{}", std::process::id()));

    let write_tmp = || -> io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.flush()?;
        file.sync_all()
    };
    if let Err(e) = write_tmp() {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(&tmp_path)(e));
    }

    if let Err(e) = fs::rename(&tmp_path, &path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(&path)(e));
    }

    // Persist the rename itself. Not every platform can open a directory.
    if let Ok(dir_handle) = File::open(dir) {
        let _ = dir_handle.sync_all();
    }

    log::debug!("saved state for policy '{policy}' to {}", path.display());
    Ok(())
}
