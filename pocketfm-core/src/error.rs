//! src/error.rs
//! ============================================================================
//! # `AppError`: Unified Error Type for the File Manager Core
//!
//! Every fallible operation in the crate returns `Result<T, AppError>`. Variants
//! carry the path they failed on so the collaborator can decide how to render
//! the failure instead of receiving placeholder data.

use pocketclip::ClipError;
use std::{
    fmt,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// A single entry that failed inside a recursive operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl EntryFailure {
    pub fn new<P: Into<PathBuf>, S: ToString>(path: P, reason: S) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Unified error type for all file manager operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Requested file or directory does not exist.
    #[error("File or directory not found: {0:?}")]
    NotFound(PathBuf),

    /// Missing read or write permission.
    #[error("Permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    /// The destination of a copy, move or rename is already taken.
    #[error("Destination already exists: {0:?}")]
    DestinationExists(PathBuf),

    /// Directory listing failed for a reason other than not-found/denied.
    #[error("Navigation failed: cannot access {path:?}: {reason}")]
    NavigationFailed { path: PathBuf, reason: String },

    /// File operation specific errors
    #[error("File operation '{operation}' failed on {path:?}: {reason}")]
    FileOperationFailed {
        operation: String, // "copy", "delete", "rename", "move"
        path: PathBuf,
        reason: String,
    },

    /// Some children of a recursive operation failed. Nothing is rolled back.
    #[error(
        "File operation '{operation}' on {path:?} partially failed: {completed} done, {} failed",
        .failures.len()
    )]
    PartialFailure {
        operation: String,
        path: PathBuf,
        completed: u64,
        failures: Vec<EntryFailure>,
    },

    /// Input validation errors
    #[error("Invalid input: {field} - {message}")]
    InvalidInput {
        field: String, // "new_name", "destination", ...
        message: String,
    },

    /// Image could not be decoded into a thumbnail.
    #[error("Thumbnail generation failed for {path:?}: {reason}")]
    Thumbnail { path: PathBuf, reason: String },

    /// Clipboard misuse (nothing held, stale paste, ...).
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipError),

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// TOML config serialization error.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Config file I/O error with path.
    #[error("Failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Background task failed to run to completion.
    #[error("Task {task_id} failed: {reason}")]
    TaskFailed { task_id: String, reason: String },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AppError {
    /// Map an `io::Error` raised while touching `path` onto the taxonomy.
    pub fn from_io(operation: &str, path: &Path, err: &io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            ErrorKind::AlreadyExists => Self::DestinationExists(path.to_path_buf()),
            _ => Self::file_operation_failed(operation, path, err.to_string()),
        }
    }

    /// Create a file operation failure error
    pub fn file_operation_failed<S1, P, S2>(operation: S1, path: P, reason: S2) -> Self
    where
        S1: Into<String>,
        P: Into<PathBuf>,
        S2: Into<String>,
    {
        Self::FileOperationFailed {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a navigation failure error
    pub fn navigation_failed<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::NavigationFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an input validation error
    pub fn invalid_input<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a thumbnail decode error
    pub fn thumbnail<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::Thumbnail {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a task failure error
    pub fn task_failed<S1: Into<String>, S2: Into<String>>(task_id: S1, reason: S2) -> Self {
        Self::TaskFailed {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    /// Entries that failed inside a recursive operation, if any.
    #[must_use]
    pub fn failures(&self) -> &[EntryFailure] {
        match self {
            Self::PartialFailure { failures, .. } => failures,
            _ => &[],
        }
    }
}

// Manual Clone implementation to handle non-Clone fields
impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
            Self::NotFound(path) => Self::NotFound(path.clone()),
            Self::PermissionDenied(path) => Self::PermissionDenied(path.clone()),
            Self::DestinationExists(path) => Self::DestinationExists(path.clone()),
            Self::NavigationFailed { path, reason } => Self::NavigationFailed {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::FileOperationFailed {
                operation,
                path,
                reason,
            } => Self::FileOperationFailed {
                operation: operation.clone(),
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::PartialFailure {
                operation,
                path,
                completed,
                failures,
            } => Self::PartialFailure {
                operation: operation.clone(),
                path: path.clone(),
                completed: *completed,
                failures: failures.clone(),
            },
            Self::InvalidInput { field, message } => Self::InvalidInput {
                field: field.clone(),
                message: message.clone(),
            },
            Self::Thumbnail { path, reason } => Self::Thumbnail {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::Clipboard(e) => Self::Clipboard(e.clone()),
            Self::Config(e) => Self::Other(format!("Config error: {e}")),
            Self::ConfigSerialize(e) => Self::Other(format!("Config error: {e}")),
            Self::ConfigIo { path, source } => Self::ConfigIo {
                path: path.clone(),
                source: io::Error::new(source.kind(), source.to_string()),
            },
            Self::TaskFailed { task_id, reason } => Self::TaskFailed {
                task_id: task_id.clone(),
                reason: reason.clone(),
            },
            Self::Other(msg) => Self::Other(msg.clone()),
        }
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_onto_taxonomy() {
        let path = Path::new("/data/missing");

        let err = AppError::from_io("copy", path, &io::Error::from(ErrorKind::NotFound));
        assert!(matches!(err, AppError::NotFound(p) if p == path));

        let err = AppError::from_io("copy", path, &io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let err = AppError::from_io("copy", path, &io::Error::from(ErrorKind::AlreadyExists));
        assert!(matches!(err, AppError::DestinationExists(_)));

        let err = AppError::from_io("copy", path, &io::Error::other("disk on fire"));
        assert!(matches!(err, AppError::FileOperationFailed { operation, .. } if operation == "copy"));
    }

    #[test]
    fn partial_failure_lists_entries_and_survives_clone() {
        let err = AppError::PartialFailure {
            operation: "delete".into(),
            path: PathBuf::from("/sdcard/DCIM"),
            completed: 3,
            failures: vec![EntryFailure::new("/sdcard/DCIM/locked", "Permission denied")],
        };

        let cloned = err.clone();
        assert_eq!(cloned.failures().len(), 1);
        assert!(cloned.to_string().contains("3 done, 1 failed"));
    }
}
