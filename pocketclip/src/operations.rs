use crate::error::{ClipError, ClipResult};
use crate::item::{ClipboardItem, ClipboardOperation};
use std::path::{Path, PathBuf};

/// A paste resolved against a destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteOperation {
    pub item_id: String,
    pub source_path: PathBuf,
    pub destination_dir: PathBuf,
    pub destination_path: PathBuf,
    pub operation: ClipboardOperation,
}

impl PasteOperation {
    pub fn new(item: &ClipboardItem, dest_dir: impl Into<PathBuf>) -> ClipResult<Self> {
        let destination_dir: PathBuf = dest_dir.into();

        let file_name = item
            .source_path
            .file_name()
            .ok_or_else(|| ClipError::invalid_path(&item.source_path))?;

        if item.is_dir && destination_dir.starts_with(&item.source_path) {
            return Err(ClipError::paste_into_self(
                &item.source_path,
                &destination_dir,
            ));
        }

        let destination_path = destination_dir.join(file_name);

        Ok(Self {
            item_id: item.id.clone(),
            source_path: item.source_path.clone(),
            destination_dir,
            destination_path,
            operation: item.operation,
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    pub fn operation_name(&self) -> &'static str {
        match self.operation {
            ClipboardOperation::Copy => "Copy",
            ClipboardOperation::Move => "Move",
        }
    }
}
