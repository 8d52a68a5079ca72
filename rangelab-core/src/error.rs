//! Error taxonomy for episode simulation.
//!
//! All three variants are fatal for the episode they occur in. Nothing in the
//! core retries; the caller decides what to do with a failed episode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while simulating an episode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// The fetched tick window is too short to replay.
    #[error("insufficient data: need at least {required} snapshots, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Upstream data failed a unit-sanity guardrail (likely a column mapping mistake).
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// The proposal is malformed.
    #[error("validation: {0}")]
    Validation(String),
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::InsufficientData { .. } => ErrorKind::InsufficientData,
            SimError::DataIntegrity(_) => ErrorKind::DataIntegrity,
            SimError::Validation(_) => ErrorKind::Validation,
        }
    }
}

/// Serializable failure classification carried on failed result records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientData,
    DataIntegrity,
    Validation,
    Provider,
    Storage,
}
