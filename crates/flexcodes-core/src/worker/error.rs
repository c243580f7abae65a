use std::path::PathBuf;

use thiserror::Error;

use super::WorkerState;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to pre-cache {asset}: {reason}")]
    Install { asset: String, reason: String },

    #[error("Cache storage error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache entry {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid worker state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: WorkerState, to: WorkerState },
}
