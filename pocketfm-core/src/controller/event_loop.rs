//! ``src/controller/event_loop.rs``
//! ============================================================================
//! # Event Loop: applies actions and task results to the session
//!
//! Two inputs feed the session: `Action`s parsed from the collaborator and
//! `TaskResult`s sent by background tasks. Both are turned into `Reply`
//! values (listings, notifications, plain text) for the collaborator to
//! render. The event loop itself does no rendering.

use crate::controller::actions::Action;
use crate::error::AppError;
use crate::fs::entry_info::DirectoryEntry;
use crate::model::session::Session;
use crate::tasks::file_ops_task::{FileOpOutcome, FileOperation};
use crate::tasks::thumbnail_task::ThumbnailRequest;
use compact_str::{CompactString, format_compact};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Completion messages from background tasks.
#[derive(Debug, Clone)]
pub enum TaskResult {
    /// Background listing finished.
    DirectoryLoad {
        path: PathBuf,
        result: Result<Vec<DirectoryEntry>, AppError>,
    },

    /// File operation completion
    FileOperationComplete {
        operation_id: String,
        operation: FileOperation,
        result: Result<FileOpOutcome, AppError>,
    },

    /// A thumbnail was decoded and cached.
    ThumbnailReady { path: PathBuf },

    /// A thumbnail could not be decoded.
    ThumbnailFailed { path: PathBuf, error: AppError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationLevel {
    Info = 0,
    Success = 1,
    Warning = 2,
    Error = 3,
}

impl NotificationLevel {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "ok",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// Compact notification with timestamp
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: CompactString,
    pub level: NotificationLevel,
    pub timestamp: Instant,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<CompactString>) -> Self {
        Self {
            message: message.into(),
            level,
            timestamp: Instant::now(),
        }
    }
}

/// Something for the collaborator to show.
#[derive(Debug, Clone)]
pub enum Reply {
    Listing {
        dir: PathBuf,
        entries: Vec<DirectoryEntry>,
    },
    Notify(Notification),
    Text(String),
    Quit,
}

impl Reply {
    fn info(message: impl Into<CompactString>) -> Self {
        Self::Notify(Notification::new(NotificationLevel::Info, message))
    }

    fn success(message: impl Into<CompactString>) -> Self {
        Self::Notify(Notification::new(NotificationLevel::Success, message))
    }

    fn warning(message: impl Into<CompactString>) -> Self {
        Self::Notify(Notification::new(NotificationLevel::Warning, message))
    }
}

/// Error notification plus one line per failing entry.
fn error_replies(context: &str, error: &AppError) -> Vec<Reply> {
    let mut replies = vec![Reply::Notify(Notification::new(
        NotificationLevel::Error,
        format_compact!("{context}: {error}"),
    ))];

    replies.extend(
        error
            .failures()
            .iter()
            .map(|failure| Reply::Text(format!("  {failure}"))),
    );

    replies
}

pub struct EventLoop {
    session: Session,
    task_rx: mpsc::UnboundedReceiver<TaskResult>,
    event_count: u64,
}

impl EventLoop {
    pub fn new(session: Session, task_rx: mpsc::UnboundedReceiver<TaskResult>) -> Self {
        info!("Initializing event loop at {}", session.current_dir().display());
        Self {
            session,
            task_rx,
            event_count: 0,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    #[must_use]
    pub const fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Waits for the next background result. `None` once every sender is gone.
    pub async fn next_task_result(&mut self) -> Option<TaskResult> {
        self.task_rx.recv().await
    }

    fn listing(&self) -> Vec<Reply> {
        match self.session.list() {
            Ok(entries) => vec![Reply::Listing {
                dir: self.session.current_dir().to_path_buf(),
                entries,
            }],
            Err(e) => error_replies("Cannot list directory", &e),
        }
    }

    fn navigated(&self, result: Result<Vec<DirectoryEntry>, AppError>) -> Vec<Reply> {
        match result {
            Ok(entries) => vec![Reply::Listing {
                dir: self.session.current_dir().to_path_buf(),
                entries,
            }],
            Err(e) => error_replies("Cannot open directory", &e),
        }
    }

    fn started(&self, operation: &str, operation_id: &str, source: &str) -> Vec<Reply> {
        debug!(operation_id, "{} started", operation);
        vec![Reply::info(format_compact!("{operation} of {source} started"))]
    }

    fn transfer_paths(&self, source: &str, dest_dir: &str) -> Result<(PathBuf, PathBuf), AppError> {
        Ok((self.session.resolve(source)?, self.session.resolve_dir(dest_dir)?))
    }

    pub fn handle_action(&mut self, action: Action) -> Vec<Reply> {
        self.event_count += 1;
        trace!("Handling action {:?}", action);

        match action {
            Action::List => self.listing(),

            Action::Enter(name) => {
                let result = if name.starts_with('/') {
                    self.session.descend_path(&PathBuf::from(&name))
                } else {
                    self.session.descend(&name)
                };
                self.navigated(result)
            }

            Action::Up => {
                let result = self.session.ascend();
                self.navigated(result)
            }

            Action::Home => {
                let result = self.session.reset_home();
                self.navigated(result)
            }

            Action::Pwd => vec![Reply::Text(self.session.current_dir().display().to_string())],

            Action::Copy { source, dest_dir } => match self.transfer_paths(&source, &dest_dir) {
                Ok((src, dest)) => {
                    let id = self.session.copy(&src, &dest);
                    self.started("Copy", &id, &source)
                }
                Err(e) => error_replies("Copy", &e),
            },

            Action::Move { source, dest_dir } => match self.transfer_paths(&source, &dest_dir) {
                Ok((src, dest)) => {
                    let id = self.session.move_to(&src, &dest);
                    self.started("Move", &id, &source)
                }
                Err(e) => error_replies("Move", &e),
            },

            Action::Yank(name) => {
                let path = match self.session.resolve(&name) {
                    Ok(path) => path,
                    Err(e) => return error_replies("Clipboard", &e),
                };
                match self.session.hold_copy(&path) {
                    Ok(item) => vec![Reply::info(format_compact!(
                        "Holding {} for copy",
                        item.display_name()
                    ))],
                    Err(e) => error_replies("Clipboard", &e),
                }
            }

            Action::Cut(name) => {
                let path = match self.session.resolve(&name) {
                    Ok(path) => path,
                    Err(e) => return error_replies("Clipboard", &e),
                };
                match self.session.hold_move(&path) {
                    Ok(item) => vec![Reply::info(format_compact!(
                        "Holding {} for move",
                        item.display_name()
                    ))],
                    Err(e) => error_replies("Clipboard", &e),
                }
            }

            Action::Paste => match self.session.paste() {
                Ok((id, paste)) => self.started(
                    paste.operation_name(),
                    &id,
                    &paste.source_path().display().to_string(),
                ),
                Err(e) => error_replies("Paste", &e),
            },

            Action::ClearClipboard => match self.session.clear_clipboard() {
                Some(item) => vec![Reply::info(format_compact!(
                    "Dropped {} from clipboard",
                    item.display_name()
                ))],
                None => vec![Reply::info("Clipboard already empty")],
            },

            Action::Delete(name) => match self.session.resolve(&name) {
                Ok(target) => {
                    let id = self.session.delete(&target);
                    self.started("Delete", &id, &name)
                }
                Err(e) => error_replies("Delete", &e),
            },

            Action::Rename { target, new_name } => {
                let started = self
                    .session
                    .resolve(&target)
                    .and_then(|path| self.session.rename(&path, &new_name));
                match started {
                    Ok(id) => self.started("Rename", &id, &target),
                    Err(e) => error_replies("Rename", &e),
                }
            }

            Action::Thumbnail(name) => self.thumbnail(&name),

            Action::Info(name) => match self
                .session
                .resolve(&name)
                .and_then(|path| DirectoryEntry::from_path(&path))
            {
                Ok(entry) => vec![Reply::Text(format!(
                    "{}\n  {}\n  {:?} {:?}, modified {}",
                    entry.path.display(),
                    entry.summary(),
                    entry.kind(),
                    entry.category,
                    entry.format_date("%Y-%m-%d %H:%M")
                ))],
                Err(e) => error_replies("Info", &e),
            },

            Action::ShowHidden(show) => {
                self.session.set_show_hidden(show);
                self.listing()
            }

            Action::ShowThumbnails(show) => {
                self.session.set_show_thumbnails(show);
                self.listing()
            }

            Action::Storage => match self.session.storage_stats() {
                Ok(stats) => vec![Reply::Text(format!(
                    "{}\n  {}",
                    stats.label("storage"),
                    stats
                ))],
                Err(e) => error_replies("Storage", &e),
            },

            Action::Refresh => {
                drop(self.session.refresh_in_background());
                Vec::new()
            }

            Action::Help => vec![Reply::Text(Action::HELP.to_string())],

            Action::Quit => vec![Reply::Quit],
        }
    }

    fn thumbnail(&mut self, name: &str) -> Vec<Reply> {
        let entry = match self
            .session
            .resolve(name)
            .and_then(|path| DirectoryEntry::from_path(&path))
        {
            Ok(entry) => entry,
            Err(e) => return error_replies("Thumbnail", &e),
        };

        match self.session.request_thumbnail(&entry) {
            Some(ThumbnailRequest::Ready(thumb)) => vec![Reply::Text(format!(
                "{}: {}x{} thumbnail, {} bytes",
                entry.name,
                thumb.width,
                thumb.height,
                thumb.byte_len()
            ))],
            Some(ThumbnailRequest::Pending) => {
                vec![Reply::info(format_compact!("Generating thumbnail for {}", entry.name))]
            }
            Some(ThumbnailRequest::Deferred) => {
                vec![Reply::warning("Thumbnail queue is full, try again shortly")]
            }
            Some(ThumbnailRequest::Failed(reason)) => {
                vec![Reply::warning(format_compact!("No thumbnail for {}: {reason}", entry.name))]
            }
            Some(ThumbnailRequest::Cancelled) => vec![Reply::warning("Thumbnails were stopped")],
            None => vec![Reply::info(format_compact!("{} has no thumbnail", entry.name))],
        }
    }

    pub fn handle_task_result(&mut self, result: TaskResult) -> Vec<Reply> {
        self.event_count += 1;

        match result {
            TaskResult::DirectoryLoad { path, result } => {
                if path != self.session.current_dir() {
                    debug!("Dropping stale listing of {}", path.display());
                    return Vec::new();
                }
                match result {
                    Ok(entries) => vec![Reply::Listing { dir: path, entries }],
                    Err(e) => error_replies("Cannot list directory", &e),
                }
            }

            TaskResult::FileOperationComplete {
                operation_id,
                operation,
                result,
            } => {
                self.session
                    .on_operation_complete(&operation_id, &operation, &result);

                let source = operation.source().display();
                let mut replies = match &result {
                    Ok(outcome) => {
                        vec![Reply::success(format_compact!("{operation} of {source} done: {outcome}"))]
                    }
                    Err(e) => error_replies(&format!("{operation} of {source} failed"), e),
                };

                replies.extend(self.listing());
                replies
            }

            TaskResult::ThumbnailReady { path } => {
                vec![Reply::info(format_compact!("Thumbnail ready: {}", path.display()))]
            }

            TaskResult::ThumbnailFailed { path, error } => vec![Reply::warning(format_compact!(
                "Thumbnail failed for {}: {error}",
                path.display()
            ))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn event_loop_at(home: &std::path::Path) -> EventLoop {
        let config = Config {
            home: Some(home.to_path_buf()),
            ..Config::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        EventLoop::new(Session::new(config, tx), rx)
    }

    fn listing_names(replies: &[Reply]) -> Option<Vec<String>> {
        replies.iter().find_map(|reply| match reply {
            Reply::Listing { entries, .. } => {
                Some(entries.iter().map(|e| e.name.to_string()).collect())
            }
            _ => None,
        })
    }

    fn has_level(replies: &[Reply], level: NotificationLevel) -> bool {
        replies
            .iter()
            .any(|reply| matches!(reply, Reply::Notify(n) if n.level == level))
    }

    #[test]
    fn enter_and_up_produce_listings() {
        let home = TempDir::new().unwrap();
        fs::create_dir(home.path().join("Pictures")).unwrap();
        fs::write(home.path().join("Pictures").join("cat.png"), b"png").unwrap();
        let mut event_loop = event_loop_at(home.path());

        let replies = event_loop.handle_action(Action::Enter("Pictures".into()));
        assert_eq!(listing_names(&replies), Some(vec!["cat.png".to_string()]));

        let replies = event_loop.handle_action(Action::Up);
        assert_eq!(listing_names(&replies), Some(vec!["Pictures".to_string()]));
        assert_eq!(event_loop.event_count(), 2);
    }

    #[test]
    fn missing_directory_is_an_error_notification() {
        let home = TempDir::new().unwrap();
        let mut event_loop = event_loop_at(home.path());

        let replies = event_loop.handle_action(Action::Enter("nowhere".into()));
        assert!(has_level(&replies, NotificationLevel::Error));
        assert!(listing_names(&replies).is_none());
    }

    #[tokio::test]
    async fn completed_operation_notifies_and_relists() {
        let home = TempDir::new().unwrap();
        fs::create_dir(home.path().join("old")).unwrap();
        fs::write(home.path().join("old").join("x"), b"x").unwrap();
        let mut event_loop = event_loop_at(home.path());

        event_loop.handle_action(Action::Delete("old".into()));
        let result = event_loop.next_task_result().await.unwrap();
        let replies = event_loop.handle_task_result(result);

        assert!(has_level(&replies, NotificationLevel::Success));
        assert_eq!(listing_names(&replies), Some(Vec::new()));
    }

    #[tokio::test]
    async fn names_that_resolve_to_directories_around_us_are_refused() {
        let root = TempDir::new().unwrap();
        let home = root.path().join("home");
        fs::create_dir(&home).unwrap();
        fs::write(home.join("precious.txt"), b"keep me").unwrap();
        fs::write(home.join("junk"), b"x").unwrap();
        let mut event_loop = event_loop_at(&home);

        for line in [r#"rm """#, "rm .", "rm ..", r#"rename "" other"#, r#"cp "" sub"#] {
            let action: Action = line.parse().unwrap();
            let replies = event_loop.handle_action(action);
            assert!(has_level(&replies, NotificationLevel::Error), "{line} was accepted");
        }
        let replies = event_loop.handle_action(Action::Enter(String::new()));
        assert!(has_level(&replies, NotificationLevel::Error));
        assert_eq!(event_loop.session().current_dir(), home);

        // Only the legitimate delete below ever reaches a task.
        event_loop.handle_action(Action::Delete("junk".into()));
        let TaskResult::FileOperationComplete { operation, result, .. } =
            event_loop.next_task_result().await.unwrap()
        else {
            panic!("expected a file operation result");
        };
        assert!(result.is_ok());
        assert_eq!(operation.source().as_path(), home.join("junk"));

        assert!(home.join("precious.txt").exists());
        assert!(!home.join("junk").exists());
    }

    #[tokio::test]
    async fn stale_background_listing_is_dropped() {
        let home = TempDir::new().unwrap();
        let mut event_loop = event_loop_at(home.path());

        let replies = event_loop.handle_task_result(TaskResult::DirectoryLoad {
            path: home.path().join("elsewhere"),
            result: Ok(Vec::new()),
        });
        assert!(replies.is_empty());
    }

    #[test]
    fn partial_failures_list_each_entry() {
        let err = AppError::PartialFailure {
            operation: "delete".into(),
            path: PathBuf::from("/data"),
            completed: 1,
            failures: vec![
                crate::error::EntryFailure::new("/data/a", "busy"),
                crate::error::EntryFailure::new("/data/b", "busy"),
            ],
        };

        let replies = error_replies("Delete", &err);
        assert_eq!(replies.len(), 3);
        assert!(matches!(&replies[1], Reply::Text(line) if line.contains("/data/a")));
    }

    #[test]
    fn paste_without_hold_is_an_error() {
        let home = TempDir::new().unwrap();
        let mut event_loop = event_loop_at(home.path());

        let replies = event_loop.handle_action(Action::Paste);
        assert!(has_level(&replies, NotificationLevel::Error));
    }
}
