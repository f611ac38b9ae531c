//! Access checks for the current process, mirroring what the user is actually
//! allowed to do rather than what the mode bits say.

use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub is_dir: bool,
    pub readable: bool,
    pub writable: bool,
}

impl Permissions {
    pub fn probe(path: &Path, is_dir: bool) -> Self {
        Self {
            is_dir,
            readable: can_read(path),
            writable: can_write(path),
        }
    }
}

#[cfg(unix)]
fn access(path: &Path, mode: libc::c_int) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };

    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

#[cfg(unix)]
pub fn can_read(path: &Path) -> bool {
    access(path, libc::R_OK)
}

#[cfg(unix)]
pub fn can_write(path: &Path) -> bool {
    access(path, libc::W_OK)
}

#[cfg(not(unix))]
pub fn can_read(path: &Path) -> bool {
    std::fs::metadata(path).is_ok()
}

#[cfg(not(unix))]
pub fn can_write(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| !meta.permissions().readonly())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fresh_tempdir_is_readable_and_writable() {
        let dir = TempDir::new().unwrap();
        let perms = Permissions::probe(dir.path(), true);

        assert!(perms.is_dir);
        assert!(perms.readable);
        assert!(perms.writable);
    }

    #[test]
    fn missing_path_has_no_access() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");

        assert!(!can_read(&missing));
        assert!(!can_write(&missing));
    }
}
