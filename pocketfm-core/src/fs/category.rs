//! Display category of an entry, chosen from its extension. The collaborator
//! maps categories to icons.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    /// Empty or unreadable directory.
    Folder,
    /// Readable directory with at least one child.
    FolderFull,
    Pdf,
    Audio,
    Image,
    Archive,
    Video,
    Document,
    Spreadsheet,
    Presentation,
    Html,
    Xml,
    Config,
    AndroidPackage,
    JavaArchive,
    Text,
}

impl FileCategory {
    /// Category for a regular file given its lowercase extension.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.unwrap_or("") {
            "pdf" => Self::Pdf,
            "mp3" | "wma" | "m4a" | "m4p" => Self::Audio,
            "png" | "jpg" | "jpeg" | "gif" | "tiff" => Self::Image,
            "zip" | "gzip" | "gz" => Self::Archive,
            "m4v" | "wmv" | "3gp" | "mp4" => Self::Video,
            "doc" | "docx" => Self::Document,
            "xls" | "xlsx" => Self::Spreadsheet,
            "ppt" | "pptx" => Self::Presentation,
            "html" => Self::Html,
            "xml" => Self::Xml,
            "conf" => Self::Config,
            "apk" => Self::AndroidPackage,
            "jar" => Self::JavaArchive,
            _ => Self::Text,
        }
    }

    pub fn for_directory(items_count: Option<u64>) -> Self {
        match items_count {
            Some(n) if n > 0 => Self::FolderFull,
            _ => Self::Folder,
        }
    }

    #[inline]
    pub const fn is_image(self) -> bool {
        matches!(self, Self::Image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_map_to_categories() {
        assert_eq!(FileCategory::from_extension(Some("jpeg")), FileCategory::Image);
        assert_eq!(FileCategory::from_extension(Some("m4p")), FileCategory::Audio);
        assert_eq!(FileCategory::from_extension(Some("apk")), FileCategory::AndroidPackage);
        assert_eq!(FileCategory::from_extension(Some("rs")), FileCategory::Text);
        assert_eq!(FileCategory::from_extension(None), FileCategory::Text);
    }

    #[test]
    fn folder_fullness_follows_child_count() {
        assert_eq!(FileCategory::for_directory(Some(3)), FileCategory::FolderFull);
        assert_eq!(FileCategory::for_directory(Some(0)), FileCategory::Folder);
        assert_eq!(FileCategory::for_directory(None), FileCategory::Folder);
    }
}
