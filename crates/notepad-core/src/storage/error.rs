//! Substrate error handling
//!
//! Typed errors for substrate access. None of these ever reach callers of the
//! persistent store; they are classified here so diagnostics can say what
//! went wrong.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while touching the durable substrate
#[derive(Error, Debug)]
pub enum SubstrateError {
    /// No substrate is reachable from this execution context
    #[error("Storage is unavailable in this execution context")]
    Unavailable,

    /// Access refused (storage disabled by policy, permission denied)
    #[error("Access denied to storage key '{key}'")]
    AccessDenied { key: String },

    /// Write would exceed the substrate's quota
    #[error("Storage quota of {limit} bytes exceeded while writing '{key}'")]
    QuotaExceeded { key: String, limit: usize },

    /// Failed to read or write a backing file
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SubstrateError {
    /// Create an error from an I/O error with key and path context
    ///
    /// Permission errors become `AccessDenied`, disk-full errors become
    /// `QuotaExceeded`, and everything else stays an I/O error.
    pub fn from_io(error: io::Error, key: &str, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => SubstrateError::AccessDenied {
                key: key.to_string(),
            },
            _ if is_disk_full_error(&error) => SubstrateError::QuotaExceeded {
                key: key.to_string(),
                limit: 0,
            },
            _ => SubstrateError::Io {
                path,
                source: error,
            },
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for substrate operations
pub type SubstrateResult<T> = Result<T, SubstrateError>;
