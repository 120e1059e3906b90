//! # Error Types
//!
//! - [`SyncError`] is the single fatal path out of a sync run.
//! - [`CacheError`] covers persisted-cache problems. These are recovered
//!   locally (logged, cache treated as absent) and never abort a run.

use thiserror::Error;

use crate::host::HostError;

/// Fatal errors that abort a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing or malformed identifiers or credentials.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A collaborator rejected the supplied credentials.
    #[error("authentication failed during {operation}: {detail}")]
    Authentication {
        /// Operation that was being attempted.
        operation: String,
        /// Status or message returned by the collaborator.
        detail: String,
    },

    /// Every attempt of a retryable transfer failed.
    #[error(
        "transfer of {filename} ({size_bytes} bytes) failed after {attempts} attempts: {last_error}"
    )]
    TransferExhausted {
        filename: String,
        size_bytes: usize,
        attempts: u32,
        last_error: HostError,
    },

    /// A non-retryable collaborator failure.
    #[error("{operation} failed: {source}")]
    Remote {
        operation: String,
        #[source]
        source: HostError,
    },
}

impl SyncError {
    /// Lift a collaborator error into a fatal run error, keeping
    /// authentication failures distinguishable.
    pub fn from_host(operation: impl Into<String>, err: HostError) -> Self {
        let operation = operation.into();
        match err {
            HostError::Unauthorized { status, .. } => SyncError::Authentication {
                operation,
                detail: format!("HTTP {status}"),
            },
            other => SyncError::Remote {
                operation,
                source: other,
            },
        }
    }

    /// True for credential failures from either collaborator.
    pub fn is_authentication(&self) -> bool {
        matches!(self, SyncError::Authentication { .. })
    }
}

impl From<crate::config::ConfigError> for SyncError {
    fn from(err: crate::config::ConfigError) -> Self {
        SyncError::Configuration(err.to_string())
    }
}

/// Persisted-cache failures.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing the backing file failed.
    #[error("cache io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The persisted document could not be decoded or encoded.
    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
