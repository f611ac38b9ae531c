use crate::error::{ClipError, ClipResult};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardItem {
    pub id: String,
    pub source_path: PathBuf,
    pub operation: ClipboardOperation,
    pub is_dir: bool,
    pub held_at: Instant,
}

impl ClipboardItem {
    pub fn new_copy(path: impl Into<PathBuf>) -> ClipResult<Self> {
        Self::new(path.into(), ClipboardOperation::Copy)
    }

    pub fn new_move(path: impl Into<PathBuf>) -> ClipResult<Self> {
        Self::new(path.into(), ClipboardOperation::Move)
    }

    pub fn new(path: PathBuf, operation: ClipboardOperation) -> ClipResult<Self> {
        if path.file_name().is_none() {
            return Err(ClipError::invalid_path(&path));
        }

        let metadata =
            std::fs::metadata(&path).map_err(|e| ClipError::metadata_error(&path, &e))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            source_path: path,
            operation,
            is_dir: metadata.is_dir(),
            held_at: Instant::now(),
        })
    }

    pub fn display_name(&self) -> &str {
        self.source_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOperation {
    Copy,
    Move,
}

impl std::fmt::Display for ClipboardOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
        }
    }
}
