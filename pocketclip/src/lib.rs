//! # pocketclip - Pending clipboard for file managers
//!
//! Holds at most one copied or cut source and resolves it into a
//! [`PasteOperation`] against a destination directory. Performing the copy or
//! move is left to the caller; the clipboard only tracks what is held and
//! releases it once the caller reports a successful paste.

pub mod clipboard;
pub mod error;
pub mod item;
pub mod operations;

// Re-export main types for easy use
pub use clipboard::{Clipboard, ClipboardStats};
pub use error::{ClipError, ClipResult};
pub use item::{ClipboardItem, ClipboardOperation};
pub use operations::PasteOperation;
