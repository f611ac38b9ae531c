//! `src/fs/entry_info.rs`
//! ============================================================
//! Per-entry metadata shown in a directory listing.
//!
//! Entries are rebuilt on every listing and never cached across navigation,
//! so everything here is a snapshot of one `stat` plus, for directories, one
//! `read_dir` to count children.

// Bring Arc into scope for shared ownership.
use std::sync::Arc;

// Work with filesystem paths.
use std::path::{Path, PathBuf};

// Access OS string views.
use std::ffi::OsStr;

// Obtain file metadata.
use std::fs::{self, Metadata};

// Handle time values safely.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// CompactString for small-string optimisation.
use compact_str::CompactString;

// Chrono for timestamp formatting.
use chrono::{DateTime, Local, TimeZone};

use crate::error::AppError;
use crate::fs::category::FileCategory;
use crate::fs::permissions::Permissions;
use crate::util::humanize::{format_size, permission_string};

// ------------------------------------------------------------
// EntryKind — file, directory, symlink, or something else.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Symlink,
    Other,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dir => write!(f, "Dir"),
            Self::File => write!(f, "File"),
            Self::Symlink => write!(f, "Symlink"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Dot files are hidden. Checked on the raw bytes so names that are not
/// valid UTF-8 are classified too.
#[inline]
#[must_use]
pub fn is_hidden_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().starts_with(b".")
}

// ------------------------------------------------------------
// DirectoryEntry — one row of a listing.
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    // Shared absolute path
    pub path: Arc<PathBuf>,

    // Byte length (0 for directories)
    pub size: u64,

    // Children count; None for files and unreadable directories
    pub items_count: Option<u64>,

    // Last-modification timestamp
    pub modified: SystemTime,

    // File or directory name
    pub name: CompactString,

    // Lower-case extension (files only)
    pub extension: Option<CompactString>,

    pub permissions: Permissions,

    pub category: FileCategory,

    // Symlinks are followed; these describe the target
    pub is_dir: bool,
    pub is_file: bool,
    pub is_symlink: bool,
    pub hidden: bool,
}

impl DirectoryEntry {
    /// Build an entry for `path`, following symlinks the way a listing does.
    /// A dangling link is described by the link itself.
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let link_meta: Metadata =
            fs::symlink_metadata(path).map_err(|e| AppError::from_io("stat", path, &e))?;

        let is_symlink = link_meta.file_type().is_symlink();
        let meta: Metadata = if is_symlink {
            fs::metadata(path).unwrap_or(link_meta)
        } else {
            link_meta
        };

        Ok(Self::from_meta(path, &meta, is_symlink))
    }

    // Internal builder shared by listing and single-path lookups.
    fn from_meta(path: &Path, meta: &Metadata, is_symlink: bool) -> Self {
        let is_dir: bool = meta.is_dir();
        let is_file: bool = meta.is_file();

        // Lossy for display only; `path` keeps the exact bytes.
        let file_name: &OsStr = path.file_name().unwrap_or(path.as_os_str());
        let name: CompactString = CompactString::new(file_name.to_string_lossy());

        let extension: Option<CompactString> = if is_file {
            path.extension()
                .and_then(OsStr::to_str)
                .map(|s: &str| -> CompactString { CompactString::new(s.to_lowercase()) })
        } else {
            None
        };

        let items_count: Option<u64> = if is_dir {
            fs::read_dir(path).ok().map(|r| r.count() as u64)
        } else {
            None
        };

        let category = if is_dir {
            FileCategory::for_directory(items_count)
        } else {
            FileCategory::from_extension(extension.as_deref())
        };

        Self {
            path: Arc::new(path.to_path_buf()),
            size: if is_dir { 0 } else { meta.len() },
            items_count,
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
            hidden: is_hidden_name(file_name),
            name,
            extension,
            permissions: Permissions::probe(path, is_dir),
            category,
            is_dir,
            is_file,
            is_symlink,
        }
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        if self.is_dir {
            EntryKind::Dir
        } else if self.is_file {
            EntryKind::File
        } else if self.is_symlink {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }

    /// Non-empty image files are the only entries worth a thumbnail.
    #[inline]
    #[must_use]
    pub fn wants_thumbnail(&self) -> bool {
        self.is_file && self.size > 0 && self.category.is_image()
    }

    #[must_use]
    pub fn size_human(&self) -> String {
        format_size(self.size)
    }

    #[must_use]
    pub fn permission_string(&self) -> String {
        permission_string(self.permissions)
    }

    /// Second display line: `[(hidden) | ]<size | N items> | <perms>`.
    #[must_use]
    pub fn summary(&self) -> String {
        let detail = if self.is_dir {
            format!("{} items", self.items_count.unwrap_or(0))
        } else {
            self.size_human()
        };

        let hidden = if self.hidden { "(hidden) | " } else { "" };

        format!("{hidden}{detail} | {}", self.permission_string())
    }

    // Format the modification date.
    #[expect(clippy::cast_possible_wrap, reason = "Expected")]
    #[must_use]
    pub fn format_date(&self, fmt: &str) -> String {
        let dur: Duration = self
            .modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| -> Duration { Duration::from_secs(0) });

        let dt: DateTime<Local> = Local
            .timestamp_opt(dur.as_secs() as i64, dur.subsec_nanos())
            .single()
            .unwrap_or_else(|| -> DateTime<Local> { Local::now() });

        dt.format(fmt).to_string()
    }
}
