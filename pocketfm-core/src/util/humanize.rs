//! src/util/humanize.rs

use crate::fs::permissions::Permissions;

const KB: u64 = 1024;
const MB: u64 = KB * KB;
const GB: u64 = MB * KB;

/// Render a byte count in 1024-based units, picking the largest unit the value
/// exceeds: `512.00 bytes`, `1.50 Kb`, `3.25 Mb`, `1.00 Gb`.
#[expect(clippy::cast_precision_loss, reason = "Display only")]
pub fn format_size(size: u64) -> String {
    let size_f = size as f64;

    if size > GB {
        format!("{:.2} Gb", size_f / GB as f64)
    } else if size > MB {
        format!("{:.2} Mb", size_f / MB as f64)
    } else if size > KB {
        format!("{:.2} Kb", size_f / KB as f64)
    } else {
        format!("{size_f:.2} bytes")
    }
}

/// At most four characters: `-`, then `d` for directories, then `r` and `w`
/// when the current user has that access.
pub fn permission_string(perms: Permissions) -> String {
    let mut out = String::with_capacity(4);
    out.push('-');

    if perms.is_dir {
        out.push('d');
    }
    if perms.readable {
        out.push('r');
    }
    if perms.writable {
        out.push('w');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_picks_largest_exceeded_unit() {
        assert_eq!(format_size(0), "0.00 bytes");
        assert_eq!(format_size(1024), "1024.00 bytes");
        assert_eq!(format_size(1536), "1.50 Kb");
        assert_eq!(format_size(5 * MB + MB / 4), "5.25 Mb");
        assert_eq!(format_size(3 * GB), "3.00 Gb");
    }

    #[test]
    fn permission_flags() {
        let dir = Permissions {
            is_dir: true,
            readable: true,
            writable: true,
        };
        let read_only_file = Permissions {
            is_dir: false,
            readable: true,
            writable: false,
        };

        assert_eq!(permission_string(dir), "-drw");
        assert_eq!(permission_string(read_only_file), "-r");
        assert_eq!(permission_string(Permissions::default()), "-");
    }
}
