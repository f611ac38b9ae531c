//! src/view/icons.rs
//! ============================================================================
//! # Entry Icons
//!
//! Short text badges per display category, so listings stay readable on any
//! terminal font.

use crate::fs::category::FileCategory;

pub const SYMLINK_ICON: &str = "[ln]";

#[must_use]
pub const fn icon_for(category: FileCategory) -> &'static str {
    match category {
        FileCategory::Folder => "[  ]",
        FileCategory::FolderFull => "[..]",
        FileCategory::Pdf => "pdf ",
        FileCategory::Audio => "aud ",
        FileCategory::Image => "img ",
        FileCategory::Archive => "zip ",
        FileCategory::Video => "vid ",
        FileCategory::Document => "doc ",
        FileCategory::Spreadsheet => "xls ",
        FileCategory::Presentation => "ppt ",
        FileCategory::Html => "htm ",
        FileCategory::Xml => "xml ",
        FileCategory::Config => "cfg ",
        FileCategory::AndroidPackage => "apk ",
        FileCategory::JavaArchive => "jar ",
        FileCategory::Text => "txt ",
    }
}
