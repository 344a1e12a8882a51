//! Playbook loading errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybookError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("duplicate playbook id: {0}")]
    Duplicate(String),

    #[error("invalid playbook {id}: {reason}")]
    Invalid { id: String, reason: String },
}

pub type PlaybookResult<T> = Result<T, PlaybookError>;
