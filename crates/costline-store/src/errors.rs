//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`StateStore`](crate::StateStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure reading or writing a record.
    #[error("state store I/O error at {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Could not acquire the advisory lock.
    #[error("failed to lock {path}: {source}")]
    Lock {
        /// Lock file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize a record.
    #[error("failed to serialize session state: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The record file holds another session's state.
    #[error("record {path} belongs to session {owner}")]
    ForeignRecord {
        /// Record file.
        path: PathBuf,
        /// Session the persisted record belongs to.
        owner: String,
    },

    /// The record changed since the state was loaded.
    #[error("revision conflict for session {session_id}: loaded {expected}, found {found}")]
    Conflict {
        /// Session whose record moved.
        session_id: String,
        /// Revision the caller loaded.
        expected: u64,
        /// Revision currently persisted.
        found: u64,
    },
}

impl StoreError {
    /// Whether reloading and retrying could succeed.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
