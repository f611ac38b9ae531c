//! Capacity of the filesystem holding a path.

use crate::error::AppError;
use std::fmt;
use std::path::Path;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub total: u64,
    pub free: u64,
    /// Free space usable by an unprivileged process.
    pub available: u64,
}

impl StorageStats {
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }

    /// Status-line label, e.g. `sdcard: Total 29.71 GB\t\tAvailable 12.03 GB`.
    #[expect(clippy::cast_precision_loss, reason = "Display only")]
    #[must_use]
    pub fn label(&self, volume: &str) -> String {
        format!(
            "{volume}: Total {:.2} GB\t\tAvailable {:.2} GB",
            self.total as f64 / GIB,
            self.available as f64 / GIB
        )
    }
}

impl fmt::Display for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total, {} free",
            bytesize::ByteSize::b(self.total),
            bytesize::ByteSize::b(self.available)
        )
    }
}

#[cfg(unix)]
pub fn storage_stats(path: &Path) -> Result<StorageStats, AppError> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| AppError::invalid_input("path", "path contains a NUL byte"))?;

    let mut stat: MaybeUninit<libc::statvfs> = MaybeUninit::uninit();

    // SAFETY: `c_path` is NUL-terminated and `stat` points to writable storage.
    let result = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        return Err(AppError::from_io("statvfs", path, &err));
    }

    // SAFETY: statvfs returned 0, so the struct is initialised.
    let stat = unsafe { stat.assume_init() };
    let frsize = stat.f_frsize as u64;

    #[allow(clippy::useless_conversion)]
    Ok(StorageStats {
        total: u64::from(stat.f_blocks) * frsize,
        free: u64::from(stat.f_bfree) * frsize,
        available: u64::from(stat.f_bavail) * frsize,
    })
}

#[cfg(not(unix))]
pub fn storage_stats(path: &Path) -> Result<StorageStats, AppError> {
    std::fs::metadata(path).map_err(|e| AppError::from_io("statvfs", path, &e))?;
    Err(AppError::Other("storage statistics are not supported on this platform".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn stats_for_tempdir_are_consistent() {
        let dir = TempDir::new().unwrap();
        let stats = storage_stats(dir.path()).unwrap();

        assert!(stats.total > 0);
        assert!(stats.free <= stats.total);
        assert!(stats.available <= stats.free);
        assert_eq!(stats.used(), stats.total - stats.free);
    }

    #[cfg(unix)]
    #[test]
    fn missing_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = storage_stats(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn label_uses_gigabytes() {
        let stats = StorageStats {
            total: 4 * 1024 * 1024 * 1024,
            free: 2 * 1024 * 1024 * 1024,
            available: 1024 * 1024 * 1024 + 512 * 1024 * 1024,
        };
        assert_eq!(stats.label("sdcard"), "sdcard: Total 4.00 GB\t\tAvailable 1.50 GB");
    }
}
