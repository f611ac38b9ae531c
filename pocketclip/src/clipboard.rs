use crate::error::{ClipError, ClipResult};
use crate::item::ClipboardItem;
use crate::operations::PasteOperation;
use std::path::PathBuf;

/// Single-slot clipboard: holds at most one copied or cut source.
///
/// Holding a new item discards the previous one. The slot is only cleared by
/// [`Clipboard::complete_paste`] (after the paste succeeded) or [`Clipboard::clear`].
#[derive(Debug, Default)]
pub struct Clipboard {
    slot: Option<ClipboardItem>,
    stats: ClipboardStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipboardStats {
    pub held: u64,
    pub replaced: u64,
    pub pasted: u64,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold_copy(&mut self, path: impl Into<PathBuf>) -> ClipResult<&ClipboardItem> {
        self.hold(ClipboardItem::new_copy(path)?)
    }

    pub fn hold_move(&mut self, path: impl Into<PathBuf>) -> ClipResult<&ClipboardItem> {
        self.hold(ClipboardItem::new_move(path)?)
    }

    pub fn hold(&mut self, item: ClipboardItem) -> ClipResult<&ClipboardItem> {
        self.stats.held += 1;
        if self.slot.replace(item).is_some() {
            self.stats.replaced += 1;
        }

        self.slot.as_ref().ok_or(ClipError::Empty)
    }

    pub fn holding(&self) -> Option<&ClipboardItem> {
        self.slot.as_ref()
    }

    pub fn is_holding(&self) -> bool {
        self.slot.is_some()
    }

    /// Resolve the held item against `dest_dir` without releasing it.
    pub fn paste(&self, dest_dir: impl Into<PathBuf>) -> ClipResult<PasteOperation> {
        let item = self.slot.as_ref().ok_or(ClipError::Empty)?;
        PasteOperation::new(item, dest_dir)
    }

    /// Release the slot once the paste identified by `item_id` has succeeded.
    ///
    /// A paste that finishes after the user already held something else leaves
    /// the newer item alone.
    pub fn complete_paste(&mut self, item_id: &str) -> ClipResult<ClipboardItem> {
        match self.slot.take_if(|item| item.id == item_id) {
            Some(item) => {
                self.stats.pasted += 1;
                Ok(item)
            }
            None => Err(ClipError::StaleItem(item_id.into())),
        }
    }

    pub fn clear(&mut self) -> Option<ClipboardItem> {
        self.slot.take()
    }

    pub fn stats(&self) -> ClipboardStats {
        self.stats
    }
}
