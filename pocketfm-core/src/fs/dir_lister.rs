//! ``src/fs/dir_lister.rs``
//!
//! # Directory Lister
//!
//! Enumerates one directory into `DirectoryEntry` rows, honouring the hidden
//! file filter and the configured order. A missing or unreadable directory is
//! reported as an error; the lister never invents placeholder rows.

use crate::config::ListingOrder;
use crate::controller::event_loop::TaskResult;
use crate::error::AppError;
use crate::fs::entry_info::{DirectoryEntry, is_hidden_name};
use std::{
    cmp::Ordering,
    fs::{self, ReadDir},
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Lists `path` synchronously.
///
/// # Arguments
/// * `path` - The directory to enumerate.
/// * `show_hidden` - Whether to include names starting with '.'.
/// * `order` - How to order the resulting entries.
#[instrument(level = "debug", skip(order), fields(path = %path.display()))]
pub fn list_dir(
    path: &Path,
    show_hidden: bool,
    order: ListingOrder,
) -> Result<Vec<DirectoryEntry>, AppError> {
    let start_time = Instant::now();

    let read_dir: ReadDir = fs::read_dir(path).map_err(|e| listing_error(path, &e))?;
    let mut entries: Vec<DirectoryEntry> = Vec::new();

    for entry in read_dir {
        let entry_path: PathBuf = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                debug!("Skipping unreadable entry in {:?}: {}", path, e);
                continue;
            }
        };

        if !show_hidden && is_hidden(&entry_path) {
            continue;
        }

        match DirectoryEntry::from_path(&entry_path) {
            Ok(info) => entries.push(info),

            Err(e) => {
                // Log the error but continue processing other entries
                info!("Failed to get DirectoryEntry for {:?}: {}", entry_path, e);
            }
        }
    }

    sort_entries(&mut entries, order);

    let duration: Duration = start_time.elapsed();
    debug!(
        marker = "DIRECTORY_LIST",
        entries = entries.len(),
        duration_us = duration.as_micros() as u64,
        "Listed {} in {:?}",
        path.display(),
        duration
    );

    Ok(entries)
}

/// Lists `path` on the blocking pool and delivers the result as a
/// `TaskResult::DirectoryLoad`. Large directories can take a while; this keeps
/// the interactive context free in the meantime.
pub fn spawn_directory_load(
    path: PathBuf,
    show_hidden: bool,
    order: ListingOrder,
    task_tx: UnboundedSender<TaskResult>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let list_path = path.clone();
        let result = tokio::task::spawn_blocking(move || list_dir(&list_path, show_hidden, order))
            .await
            .unwrap_or_else(|e| Err(AppError::task_failed("directory_load", e.to_string())));

        let _ = task_tx.send(TaskResult::DirectoryLoad { path, result });
    })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name().is_some_and(is_hidden_name)
}

fn listing_error(path: &Path, err: &std::io::Error) -> AppError {
    match err.kind() {
        ErrorKind::NotFound => AppError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => AppError::PermissionDenied(path.to_path_buf()),
        _ => AppError::navigation_failed(path, err.to_string()),
    }
}

fn sort_entries(entries: &mut [DirectoryEntry], order: ListingOrder) {
    match order {
        ListingOrder::Native => {}

        ListingOrder::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),

        ListingOrder::DirsFirst => entries.sort_by(
            |a: &DirectoryEntry, b: &DirectoryEntry| -> Ordering {
                if a.is_dir && !b.is_dir {
                    Ordering::Less
                } else if !a.is_dir && b.is_dir {
                    Ordering::Greater
                } else {
                    a.name.cmp(&b.name)
                }
            },
        ),
    }
}
