//! src/view/listing.rs
//! ============================================================================
//! # Text rendering of replies for the line driver

use crate::controller::event_loop::{Notification, Reply};
use crate::fs::entry_info::DirectoryEntry;
use crate::view::icons::{SYMLINK_ICON, icon_for};
use std::fmt::Write;
use std::path::Path;

const DATE_FORMAT: &str = "%d/%m/%Y %I:%M %p";

/// One row per entry: badge, name, summary line, modification date.
#[must_use]
pub fn render_listing(dir: &Path, entries: &[DirectoryEntry]) -> String {
    let mut out = String::with_capacity(64 + entries.len() * 80);
    let _ = writeln!(out, "{} ({} entries)", dir.display(), entries.len());

    if entries.is_empty() {
        out.push_str("  (empty)\n");
        return out;
    }

    let name_width = entries
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(0)
        .min(40);

    for entry in entries {
        let icon = if entry.is_symlink {
            SYMLINK_ICON
        } else {
            icon_for(entry.category)
        };

        let _ = writeln!(
            out,
            "  {icon} {:<name_width$}  {:<24}  {}",
            entry.name,
            entry.summary(),
            entry.format_date(DATE_FORMAT),
        );
    }

    out
}

#[must_use]
pub fn render_notification(notification: &Notification) -> String {
    format!("[{}] {}", notification.level.tag(), notification.message)
}

/// Text for a reply; `None` for `Reply::Quit`.
#[must_use]
pub fn render_reply(reply: &Reply) -> Option<String> {
    match reply {
        Reply::Listing { dir, entries } => Some(render_listing(dir, entries)),
        Reply::Notify(notification) => Some(render_notification(notification)),
        Reply::Text(text) => Some(text.clone()),
        Reply::Quit => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::event_loop::NotificationLevel;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn listing_shows_badges_and_summaries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Music")).unwrap();
        fs::write(dir.path().join("cover.jpg"), b"jpg").unwrap();

        let entries = vec![
            DirectoryEntry::from_path(&dir.path().join("Music")).unwrap(),
            DirectoryEntry::from_path(&dir.path().join("cover.jpg")).unwrap(),
        ];
        let text = render_listing(dir.path(), &entries);

        assert!(text.contains("(2 entries)"));
        assert!(text.contains("[  ] Music"));
        assert!(text.contains("img  cover.jpg"));
        assert!(text.contains("0 items | -drw"));
        assert!(text.contains("3.00 bytes | -rw"));
    }

    #[test]
    fn empty_listing_says_so() {
        let text = render_listing(Path::new("/tmp/nothing"), &[]);
        assert!(text.ends_with("(empty)\n"));
    }

    #[test]
    fn notifications_are_tagged() {
        let n = Notification::new(NotificationLevel::Error, "boom");
        assert_eq!(render_notification(&n), "[error] boom");
        assert!(render_reply(&Reply::Quit).is_none());
    }
}
