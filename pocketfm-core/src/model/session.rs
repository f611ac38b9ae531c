//! src/model/session.rs
//! ============================================================================
//! # Session: the single owner of browsing state
//!
//! The collaborator (UI or driver) talks only to a `Session`. It owns the
//! navigation stack, visibility flags, clipboard and the thumbnail generator
//! of the directory currently on screen. Long-running work is spawned as
//! tasks that report back through the `TaskResult` channel; the session never
//! blocks on them.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use pocketclip::{Clipboard, ClipboardItem, ClipboardOperation, PasteOperation};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::cache::thumbnail_cache::ThumbnailCache;
use crate::config::Config;
use crate::controller::event_loop::TaskResult;
use crate::error::AppError;
use crate::fs::dir_lister::{list_dir, spawn_directory_load};
use crate::fs::entry_info::DirectoryEntry;
use crate::fs::storage::{StorageStats, storage_stats};
use crate::model::navigation::NavigationState;
use crate::model::snapshot::SessionSnapshot;
use crate::tasks::file_ops_task::{FileOpOutcome, FileOperation, FileOperationTask};
use crate::tasks::thumbnail_task::{ThumbnailGenerator, ThumbnailRequest};

pub struct Session {
    nav: NavigationState,
    config: Config,
    clipboard: Clipboard,
    task_tx: UnboundedSender<TaskResult>,
    thumbnails: ThumbnailCache,
    generator: Option<ThumbnailGenerator>,

    // operation_id -> clipboard item id, for pastes still running
    pending_pastes: HashMap<String, String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("current", &self.nav.current())
            .field("depth", &self.nav.depth())
            .field("holding", &self.clipboard.holding().map(|i| &i.source_path))
            .field("pending_pastes", &self.pending_pastes.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(config: Config, task_tx: UnboundedSender<TaskResult>) -> Self {
        let home = config.home_dir();
        let thumbnails = ThumbnailCache::new(&config.thumbnails);

        info!("Session starting at {}", home.display());

        Self {
            nav: NavigationState::new(&home),
            config,
            clipboard: Clipboard::new(),
            task_tx,
            thumbnails,
            generator: None,
            pending_pastes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn current_dir(&self) -> &Path {
        self.nav.current()
    }

    #[must_use]
    pub const fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    #[must_use]
    pub const fn thumbnail_cache(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    /// Resolves a name typed by the user against the current directory.
    /// Absolute paths are taken as-is. The result must name a single entry:
    /// `""`, `.`, `..` and `/` are rejected so they never reach an operation.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, AppError> {
        let path = self.resolve_dir(name)?;
        if path.file_name().is_none() {
            return Err(AppError::invalid_input(
                "name",
                format!("{name:?} does not name an entry"),
            ));
        }
        Ok(path)
    }

    /// Like [`Session::resolve`] but for destination directories, where `.`
    /// and `..` are meaningful.
    pub fn resolve_dir(&self, name: &str) -> Result<PathBuf, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::invalid_input("name", "name must not be empty"));
        }

        let candidate = Path::new(name);
        Ok(if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.current_dir().join(candidate)
        })
    }

    // ------------------------------------------------------------------
    // Listing and navigation
    // ------------------------------------------------------------------

    /// Entries of the current directory.
    pub fn list(&self) -> Result<Vec<DirectoryEntry>, AppError> {
        list_dir(
            self.current_dir(),
            self.config.show_hidden,
            self.config.listing.order,
        )
    }

    /// Lists the current directory on the blocking pool; the result arrives
    /// as `TaskResult::DirectoryLoad`.
    pub fn refresh_in_background(&self) -> JoinHandle<()> {
        spawn_directory_load(
            self.current_dir().to_path_buf(),
            self.config.show_hidden,
            self.config.listing.order,
            self.task_tx.clone(),
        )
    }

    /// Enters child directory `name`. When the new directory cannot be listed
    /// the step is undone and the error returned.
    #[instrument(level = "debug", skip(self))]
    pub fn descend(&mut self, name: &str) -> Result<Vec<DirectoryEntry>, AppError> {
        if matches!(name.trim(), "" | "." | "..") {
            return Err(AppError::invalid_input(
                "name",
                format!("{name:?} is not a child directory"),
            ));
        }

        let before = self.nav.depth();
        self.nav.descend(name);
        self.enter(before)
    }

    /// Enters a directory from a listing row. Uses the entry's exact path, so
    /// names that only display lossily can still be opened.
    pub fn descend_entry(&mut self, entry: &DirectoryEntry) -> Result<Vec<DirectoryEntry>, AppError> {
        if !entry.is_dir {
            return Err(AppError::invalid_input(
                "name",
                format!("{} is not a directory", entry.name),
            ));
        }
        self.descend_path(&entry.path)
    }

    /// Enters an absolute directory (restore, bookmarks). Re-lists if it is
    /// already current.
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub fn descend_path(&mut self, path: &Path) -> Result<Vec<DirectoryEntry>, AppError> {
        let before = self.nav.depth();
        self.nav.descend_path(path);
        self.enter(before)
    }

    pub fn ascend(&mut self) -> Result<Vec<DirectoryEntry>, AppError> {
        let before = self.nav.current().to_path_buf();
        if self.nav.ascend() != before {
            self.stop_thumbnails();
        }
        self.list()
    }

    pub fn reset_home(&mut self) -> Result<Vec<DirectoryEntry>, AppError> {
        let home = self.config.home_dir();
        self.nav.reset(&home);
        self.stop_thumbnails();
        self.list()
    }

    fn enter(&mut self, depth_before: usize) -> Result<Vec<DirectoryEntry>, AppError> {
        match self.list() {
            Ok(entries) => {
                if self.nav.depth() != depth_before {
                    self.stop_thumbnails();
                }
                Ok(entries)
            }
            Err(e) => {
                if self.nav.depth() > depth_before {
                    debug!("Cannot enter {}: {}", self.nav.current().display(), e);
                    self.nav.ascend();
                }
                Err(e)
            }
        }
    }

    pub fn set_show_hidden(&mut self, show: bool) {
        self.config.show_hidden = show;
    }

    pub fn set_show_thumbnails(&mut self, show: bool) {
        self.config.show_thumbnails = show;
        if !show {
            self.stop_thumbnails();
        }
    }

    // ------------------------------------------------------------------
    // Bulk operations
    // ------------------------------------------------------------------

    fn spawn_operation(&self, operation: FileOperation) -> String {
        let task = FileOperationTask::new(
            operation,
            self.task_tx.clone(),
            self.config.file_ops.clone(),
        );
        let operation_id = task.operation_id.clone();

        info!(
            operation_id = %operation_id,
            operation = %task.operation,
            source = %task.operation.source().display(),
            "Spawning file operation"
        );

        drop(task.spawn());
        operation_id
    }

    /// Starts copying `src` into `dest_dir`. Returns the operation id.
    pub fn copy(&self, src: &Path, dest_dir: &Path) -> String {
        self.spawn_operation(FileOperation::Copy {
            source: Arc::new(src.to_path_buf()),
            dest_dir: Arc::new(dest_dir.to_path_buf()),
        })
    }

    pub fn move_to(&self, src: &Path, dest_dir: &Path) -> String {
        self.spawn_operation(FileOperation::Move {
            source: Arc::new(src.to_path_buf()),
            dest_dir: Arc::new(dest_dir.to_path_buf()),
        })
    }

    pub fn delete(&self, target: &Path) -> String {
        self.spawn_operation(FileOperation::Delete {
            target: Arc::new(target.to_path_buf()),
        })
    }

    /// Starts a rename. Obviously bad names are rejected before anything is
    /// spawned.
    pub fn rename(&self, target: &Path, new_name: &str) -> Result<String, AppError> {
        if new_name.trim().is_empty() {
            return Err(AppError::invalid_input("new_name", "name must not be empty"));
        }

        Ok(self.spawn_operation(FileOperation::Rename {
            source: Arc::new(target.to_path_buf()),
            new_name: new_name.to_string(),
        }))
    }

    // ------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------

    pub fn hold_copy(&mut self, path: &Path) -> Result<&ClipboardItem, AppError> {
        Ok(self.clipboard.hold_copy(path)?)
    }

    pub fn hold_move(&mut self, path: &Path) -> Result<&ClipboardItem, AppError> {
        Ok(self.clipboard.hold_move(path)?)
    }

    pub fn clear_clipboard(&mut self) -> Option<ClipboardItem> {
        self.clipboard.clear()
    }

    /// Pastes the held item into the current directory. The clipboard keeps
    /// the item until the operation reports success.
    pub fn paste(&mut self) -> Result<(String, PasteOperation), AppError> {
        let paste: PasteOperation = self.clipboard.paste(self.current_dir())?;

        let operation_id = match paste.operation {
            ClipboardOperation::Copy => self.copy(paste.source_path(), paste.destination_dir()),
            ClipboardOperation::Move => self.move_to(paste.source_path(), paste.destination_dir()),
        };

        self.pending_pastes
            .insert(operation_id.clone(), paste.item_id.clone());

        Ok((operation_id, paste))
    }

    /// Bookkeeping once a file operation task reports back.
    pub fn on_operation_complete(
        &mut self,
        operation_id: &str,
        operation: &FileOperation,
        result: &Result<FileOpOutcome, AppError>,
    ) {
        if let Some(item_id) = self.pending_pastes.remove(operation_id) {
            if result.is_ok() {
                if let Err(e) = self.clipboard.complete_paste(&item_id) {
                    debug!("Clipboard changed while pasting: {}", e);
                }
            } else {
                debug!("Paste {} failed, keeping clipboard item", operation_id);
            }
        }

        // A partial failure may still have removed or overwritten entries.
        let touched = matches!(result, Ok(_) | Err(AppError::PartialFailure { .. }));
        if !touched {
            return;
        }

        if operation.removes_source() {
            self.thumbnails.invalidate_prefix(operation.source());
        }

        let written = match result {
            Ok(FileOpOutcome::Renamed { to }) => Some(to.clone()),
            _ => operation.destination(),
        };
        if let Some(dest) = written {
            self.thumbnails.invalidate_prefix(&dest);
        }
    }

    // ------------------------------------------------------------------
    // Thumbnails
    // ------------------------------------------------------------------

    /// Thumbnail for `entry`, or `None` when the entry does not get one
    /// (thumbnails off, not an image, empty file).
    pub fn request_thumbnail(&mut self, entry: &DirectoryEntry) -> Option<ThumbnailRequest> {
        if !self.config.show_thumbnails || !entry.wants_thumbnail() {
            return None;
        }

        let generator = self.generator.get_or_insert_with(|| {
            ThumbnailGenerator::spawn(
                self.thumbnails.clone(),
                &self.config.thumbnails,
                self.task_tx.clone(),
            )
        });

        Some(generator.request(&entry.path))
    }

    /// Cancels the generator of the view being left.
    pub fn stop_thumbnails(&mut self) {
        if let Some(generator) = self.generator.take() {
            generator.cancel();
        }
    }

    // ------------------------------------------------------------------
    // Persistence and status
    // ------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(self.current_dir())
    }

    /// Re-enters the saved location when it still exists.
    pub async fn restore(&mut self, snapshot: &SessionSnapshot) -> bool {
        let Some(location) = snapshot.usable_location().await else {
            if let Some(saved) = &snapshot.location {
                warn!("Saved location {} is gone, staying home", saved.display());
            }
            return false;
        };

        match self.descend_path(location) {
            Ok(_) => true,
            Err(e) => {
                warn!("Cannot restore {}: {}", location.display(), e);
                false
            }
        }
    }

    pub fn storage_stats(&self) -> Result<StorageStats, AppError> {
        storage_stats(self.current_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn session_at(home: &Path) -> (Session, UnboundedReceiver<TaskResult>) {
        let config = Config {
            home: Some(home.to_path_buf()),
            ..Config::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::new(config, tx), rx)
    }

    async fn next_completion(
        rx: &mut UnboundedReceiver<TaskResult>,
    ) -> (String, FileOperation, Result<FileOpOutcome, AppError>) {
        loop {
            if let TaskResult::FileOperationComplete {
                operation_id,
                operation,
                result,
            } = rx.recv().await.unwrap()
            {
                return (operation_id, operation, result);
            }
        }
    }

    #[test]
    fn navigation_round_trip() {
        let home = TempDir::new().unwrap();
        fs::create_dir(home.path().join("Music")).unwrap();
        fs::write(home.path().join("Music").join("song.mp3"), b"x").unwrap();
        let (mut session, _rx) = session_at(home.path());

        let entries = session.descend("Music").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(session.current_dir(), home.path().join("Music"));

        session.ascend().unwrap();
        assert_eq!(session.current_dir(), home.path());
    }

    #[test]
    fn failed_descend_leaves_stack_untouched() {
        let home = TempDir::new().unwrap();
        let (mut session, _rx) = session_at(home.path());
        let depth = session.navigation().depth();

        assert!(matches!(session.descend("missing"), Err(AppError::NotFound(_))));
        assert_eq!(session.navigation().depth(), depth);
        assert_eq!(session.current_dir(), home.path());
    }

    #[test]
    fn names_that_are_not_entries_are_rejected() {
        let home = TempDir::new().unwrap();
        let (mut session, _rx) = session_at(home.path());
        let depth = session.navigation().depth();

        for name in ["", "  ", ".", "..", "/", "sub/.."] {
            assert!(
                matches!(session.resolve(name), Err(AppError::InvalidInput { .. })),
                "{name:?} resolved"
            );
        }
        for name in ["", ".", ".."] {
            assert!(matches!(session.descend(name), Err(AppError::InvalidInput { .. })));
        }
        assert_eq!(session.navigation().depth(), depth);

        assert_eq!(session.resolve("a.txt").unwrap(), home.path().join("a.txt"));
        assert_eq!(session.resolve_dir(".").unwrap(), home.path().join("."));
        assert!(session.resolve_dir("").is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn lossy_named_directory_can_be_entered_from_its_row() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let home = TempDir::new().unwrap();
        let odd = home.path().join(OsStr::from_bytes(b"m\xfcsica"));
        fs::create_dir(&odd).unwrap();
        let (mut session, _rx) = session_at(home.path());

        let row = session.list().unwrap().remove(0);
        session.descend_entry(&row).unwrap();
        assert_eq!(session.current_dir(), odd);
    }

    #[tokio::test]
    async fn overwriting_copy_drops_stale_thumbnail() {
        let home = TempDir::new().unwrap();
        let incoming = home.path().join("incoming");
        fs::create_dir(&incoming).unwrap();
        let target = home.path().join("p.png");
        image::RgbaImage::from_pixel(8, 8, image::Rgba([255, 0, 0, 255]))
            .save(&target)
            .unwrap();
        image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 255, 255]))
            .save(incoming.join("p.png"))
            .unwrap();

        let mut config = Config {
            home: Some(home.path().to_path_buf()),
            ..Config::default()
        };
        config.file_ops.collision = crate::config::CollisionPolicy::Overwrite;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = Session::new(config, tx);

        let row = DirectoryEntry::from_path(&target).unwrap();
        session.request_thumbnail(&row).unwrap();
        loop {
            if let TaskResult::ThumbnailReady { .. } = rx.recv().await.unwrap() {
                break;
            }
        }
        assert!(session.thumbnail_cache().contains(&target));

        session.copy(&incoming.join("p.png"), home.path());
        let (id, operation, result) = next_completion(&mut rx).await;
        assert!(result.is_ok());
        session.on_operation_complete(&id, &operation, &result);

        assert!(!session.thumbnail_cache().contains(&target));
    }

    #[test]
    fn partial_delete_drops_thumbnails_under_target() {
        use crate::cache::thumbnail_cache::{Thumbnail, ThumbnailSlot};

        let home = TempDir::new().unwrap();
        let (mut session, _rx) = session_at(home.path());
        let trip = home.path().join("trip");
        let shot = trip.join("1.png");
        session.thumbnail_cache().insert(
            Arc::from(shot.as_path()),
            ThumbnailSlot::Ready(Arc::new(Thumbnail::new(image::RgbaImage::new(2, 2)))),
        );

        let operation = FileOperation::Delete {
            target: Arc::new(trip.clone()),
        };
        let result = Err(AppError::PartialFailure {
            operation: "delete".into(),
            path: trip.clone(),
            completed: 1,
            failures: vec![crate::error::EntryFailure::new(trip.join("locked"), "busy")],
        });
        session.on_operation_complete("op", &operation, &result);

        assert!(!session.thumbnail_cache().contains(&shot));
    }

    #[test]
    fn hidden_toggle_changes_listing() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join(".secret"), b"").unwrap();
        fs::write(home.path().join("plain"), b"").unwrap();
        let (mut session, _rx) = session_at(home.path());

        assert_eq!(session.list().unwrap().len(), 1);
        session.set_show_hidden(true);
        assert_eq!(session.list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn successful_paste_clears_clipboard() {
        let home = TempDir::new().unwrap();
        let src = home.path().join("doc.txt");
        fs::write(&src, b"contents").unwrap();
        fs::create_dir(home.path().join("inbox")).unwrap();
        let (mut session, mut rx) = session_at(home.path());

        session.hold_move(&src).unwrap();
        session.descend("inbox").unwrap();
        let (id, _) = session.paste().unwrap();

        let (done_id, operation, result) = next_completion(&mut rx).await;
        assert_eq!(done_id, id);
        session.on_operation_complete(&done_id, &operation, &result);

        assert!(result.is_ok());
        assert!(!session.clipboard().is_holding());
        assert!(!src.exists());
        assert!(home.path().join("inbox").join("doc.txt").exists());
    }

    #[tokio::test]
    async fn failed_paste_keeps_clipboard() {
        let home = TempDir::new().unwrap();
        let src = home.path().join("doc.txt");
        let inbox = home.path().join("inbox");
        fs::write(&src, b"new").unwrap();
        fs::create_dir(&inbox).unwrap();
        fs::write(inbox.join("doc.txt"), b"old").unwrap();
        let (mut session, mut rx) = session_at(home.path());

        session.hold_copy(&src).unwrap();
        session.descend("inbox").unwrap();
        session.paste().unwrap();

        let (done_id, operation, result) = next_completion(&mut rx).await;
        session.on_operation_complete(&done_id, &operation, &result);

        assert!(matches!(result, Err(AppError::DestinationExists(_))));
        assert!(session.clipboard().is_holding());
        assert_eq!(fs::read(inbox.join("doc.txt")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn thumbnails_only_for_non_empty_images() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join("notes.txt"), b"text").unwrap();
        fs::write(home.path().join("empty.png"), b"").unwrap();
        let (mut session, _rx) = session_at(home.path());

        for entry in session.list().unwrap() {
            assert!(session.request_thumbnail(&entry).is_none());
        }
    }

    #[tokio::test]
    async fn leaving_a_directory_cancels_its_generator() {
        let home = TempDir::new().unwrap();
        image::RgbaImage::new(8, 8)
            .save(home.path().join("pic.png"))
            .unwrap();
        fs::create_dir(home.path().join("sub")).unwrap();
        let (mut session, _rx) = session_at(home.path());

        let entry = session
            .list()
            .unwrap()
            .into_iter()
            .find(|e| e.name == "pic.png")
            .unwrap();
        assert!(matches!(
            session.request_thumbnail(&entry),
            Some(ThumbnailRequest::Pending)
        ));
        assert!(session.generator.is_some());

        session.descend("sub").unwrap();
        assert!(session.generator.is_none());
    }

    #[tokio::test]
    async fn snapshot_restore() {
        let home = TempDir::new().unwrap();
        let deep = home.path().join("a").join("b");
        fs::create_dir_all(&deep).unwrap();

        let (mut first, _rx1) = session_at(home.path());
        first.descend("a").unwrap();
        first.descend("b").unwrap();
        let snapshot = first.snapshot();

        let (mut second, _rx2) = session_at(home.path());
        assert!(second.restore(&snapshot).await);
        assert_eq!(second.current_dir(), deep);
        assert_eq!(second.navigation().iter().next(), Some(Path::new("/")));
    }
}
