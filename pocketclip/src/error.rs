//! Clipboard error types

use compact_str::CompactString;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

pub type ClipResult<T> = Result<T, ClipError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipError {
    #[error("Clipboard is empty")]
    Empty,

    #[error("Failed to read metadata for {path}: {kind:?}")]
    MetadataError {
        path: CompactString,
        kind: ErrorKind,
    },

    #[error("Invalid file path: {0}")]
    InvalidPath(CompactString),

    #[error("Cannot paste {source_path} into itself ({dest_dir})")]
    PasteIntoSelf {
        source_path: CompactString,
        dest_dir: CompactString,
    },

    #[error("Held item {0} is no longer in the clipboard")]
    StaleItem(CompactString),
}

impl ClipError {
    #[inline]
    pub fn metadata_error(path: &Path, io_error: &std::io::Error) -> Self {
        Self::MetadataError {
            path: CompactString::from(path.to_string_lossy()),
            kind: io_error.kind(),
        }
    }

    #[inline]
    pub fn invalid_path(path: &Path) -> Self {
        Self::InvalidPath(CompactString::from(path.to_string_lossy()))
    }

    #[inline]
    pub fn paste_into_self(source: &Path, dest_dir: &Path) -> Self {
        Self::PasteIntoSelf {
            source_path: CompactString::from(source.to_string_lossy()),
            dest_dir: CompactString::from(dest_dir.to_string_lossy()),
        }
    }
}
