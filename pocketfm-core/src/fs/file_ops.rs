//! ``src/fs/file_ops.rs``
//! ============================================================================
//! # File Operations: copy, move, delete and rename on the local filesystem
//!
//! Every operation is stateless and async. Recursive walks are iterative (an
//! explicit stack instead of recursion) so deep trees cannot overflow. Failures
//! of individual children are collected and reported as
//! [`AppError::PartialFailure`]; whatever already succeeded is left in place.

use crate::config::{CollisionPolicy, FileOpsConfig};
use crate::error::{AppError, EntryFailure};
use crate::fs::permissions::can_write;
use bytes::BytesMut;
use bytesize::ByteSize;
use std::{
    ffi::OsStr,
    fmt,
    fs::Metadata,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::{Arc, OnceLock},
    time::Instant,
};
use tokio::fs as TokioFs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const MAX_POOLED_BUFFERS: usize = 8;

/// Shared pool of copy buffers so concurrent copies do not reallocate.
static BUFFER_POOL: OnceLock<BufferPool> = OnceLock::new();

struct BufferPool {
    buffers: Arc<Mutex<Vec<BytesMut>>>,
}

impl BufferPool {
    fn new() -> Self {
        Self {
            buffers: Arc::new(Mutex::new(Vec::with_capacity(MAX_POOLED_BUFFERS))),
        }
    }

    async fn get_buffer(&self, size: usize) -> BytesMut {
        let mut buffers: MutexGuard<'_, Vec<BytesMut>> = self.buffers.lock().await;

        let mut buffer: BytesMut = buffers
            .pop()
            .unwrap_or_else(|| -> BytesMut { BytesMut::with_capacity(size) });

        buffer.resize(size, 0);
        buffer
    }

    async fn return_buffer(&self, mut buffer: BytesMut) {
        buffer.clear();

        let mut buffers: MutexGuard<'_, Vec<BytesMut>> = self.buffers.lock().await;
        if buffers.len() < MAX_POOLED_BUFFERS {
            buffers.push(buffer);
        }
    }

    fn global() -> &'static Self {
        BUFFER_POOL.get_or_init(Self::new)
    }
}

/// What a successful (or partially successful) operation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpReport {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
}

impl OpReport {
    #[must_use]
    pub const fn entries(&self) -> u64 {
        self.files + self.dirs
    }

    fn file(bytes: u64) -> Self {
        Self {
            files: 1,
            dirs: 0,
            bytes,
        }
    }
}

impl fmt::Display for OpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files, {} folders, {}",
            self.files,
            self.dirs,
            ByteSize::b(self.bytes)
        )
    }
}

/// Copies `src` into `dst_dir`, producing `dst_dir/basename(src)`.
///
/// Directories are copied recursively. Symlinks nested inside a copied tree
/// are recreated as symlinks rather than followed.
#[instrument(level = "info", skip_all, fields(src = %src.display(), dst = %dst_dir.display()))]
pub async fn copy_to_directory(
    src: &Path,
    dst_dir: &Path,
    config: &FileOpsConfig,
) -> Result<OpReport, AppError> {
    let start_time = Instant::now();

    let src_meta: Metadata = TokioFs::metadata(src)
        .await
        .map_err(|e| AppError::from_io("copy", src, &e))?;
    let target: PathBuf = resolve_target("copy", src, dst_dir, src_meta.is_dir()).await?;

    if config.collision == CollisionPolicy::Fail && exists(&target).await {
        return Err(AppError::DestinationExists(target));
    }

    let report: OpReport = if src_meta.is_dir() {
        copy_tree(src, &target, config).await?
    } else {
        OpReport::file(copy_file(src, &target, config).await?)
    };

    info!(
        marker = "FILE_OP_COMPLETE",
        operation = "copy",
        files = report.files,
        dirs = report.dirs,
        bytes = report.bytes,
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Copied {} to {}",
        src.display(),
        target.display()
    );

    Ok(report)
}

/// Moves `src` into `dst_dir`. A plain rename is tried first; when that fails
/// (typically across filesystems) the tree is copied and the source deleted.
/// The source is only deleted once the copy fully succeeded.
#[instrument(level = "info", skip_all, fields(src = %src.display(), dst = %dst_dir.display()))]
pub async fn move_to_directory(
    src: &Path,
    dst_dir: &Path,
    config: &FileOpsConfig,
) -> Result<OpReport, AppError> {
    let src_meta: Metadata = TokioFs::symlink_metadata(src)
        .await
        .map_err(|e| AppError::from_io("move", src, &e))?;
    let target: PathBuf = resolve_target("move", src, dst_dir, src_meta.is_dir()).await?;

    if config.collision == CollisionPolicy::Fail && exists(&target).await {
        return Err(AppError::DestinationExists(target));
    }

    match TokioFs::rename(src, &target).await {
        Ok(()) => {
            info!(
                marker = "FILE_OP_COMPLETE",
                operation = "move",
                "Renamed {} to {}",
                src.display(),
                target.display()
            );

            Ok(if src_meta.is_dir() {
                OpReport {
                    files: 0,
                    dirs: 1,
                    bytes: 0,
                }
            } else {
                OpReport::file(src_meta.len())
            })
        }

        Err(e) => {
            debug!("Rename failed ({}), falling back to copy and delete", e);

            let report: OpReport = copy_to_directory(src, dst_dir, config).await?;
            delete_target(src).await?;

            Ok(report)
        }
    }
}

/// Deletes a file, symlink or directory tree. Symlinks are removed, never
/// followed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn delete_target(path: &Path) -> Result<OpReport, AppError> {
    let meta: Metadata = TokioFs::symlink_metadata(path)
        .await
        .map_err(|e| AppError::from_io("delete", path, &e))?;

    if !meta.is_dir() {
        TokioFs::remove_file(path)
            .await
            .map_err(|e| AppError::from_io("delete", path, &e))?;

        info!(marker = "FILE_OP_COMPLETE", operation = "delete", "Deleted {}", path.display());
        return Ok(OpReport::file(meta.len()));
    }

    let mut report = OpReport::default();
    let mut failures: Vec<EntryFailure> = Vec::new();

    // Pre-order walk: files go immediately, directories are remembered in
    // visit order so removing them in reverse is post-order.
    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut stack: Vec<PathBuf> = vec![path.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = match TokioFs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                failures.push(EntryFailure::new(&dir, e));
                continue;
            }
        };
        dirs.push(dir.clone());

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    failures.push(EntryFailure::new(&dir, e));
                    break;
                }
            };

            let child: PathBuf = entry.path();
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => stack.push(child),

                Ok(_) => {
                    let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                    match TokioFs::remove_file(&child).await {
                        Ok(()) => {
                            report.files += 1;
                            report.bytes += size;
                        }
                        Err(e) => failures.push(EntryFailure::new(&child, e)),
                    }
                }

                Err(e) => failures.push(EntryFailure::new(&child, e)),
            }
        }
    }

    for dir in dirs.iter().rev() {
        if has_reported_failure(dir, &failures) {
            continue;
        }

        match TokioFs::remove_dir(dir).await {
            Ok(()) => report.dirs += 1,
            Err(e) => failures.push(EntryFailure::new(dir, e)),
        }
    }

    if !failures.is_empty() {
        warn!(
            operation = "delete",
            failed = failures.len(),
            completed = report.entries(),
            "Partial delete of {}",
            path.display()
        );

        return Err(AppError::PartialFailure {
            operation: "delete".to_string(),
            path: path.to_path_buf(),
            completed: report.entries(),
            failures,
        });
    }

    info!(
        marker = "FILE_OP_COMPLETE",
        operation = "delete",
        files = report.files,
        dirs = report.dirs,
        "Deleted {}",
        path.display()
    );

    Ok(report)
}

/// Renames `path` within its parent directory and returns the new path.
///
/// Files keep their extension: renaming `a.txt` to `b` yields `b.txt`. A new
/// name that already carries the extension is used as given.
#[instrument(level = "info", skip_all, fields(path = %path.display(), new_name = %new_name))]
pub async fn rename_target(
    path: &Path,
    new_name: &str,
    policy: CollisionPolicy,
) -> Result<PathBuf, AppError> {
    let name: &str = validate_name(new_name)?;

    let meta: Metadata = TokioFs::symlink_metadata(path)
        .await
        .map_err(|e| AppError::from_io("rename", path, &e))?;

    let parent: &Path = path
        .parent()
        .ok_or_else(|| AppError::invalid_input("path", "cannot rename the root directory"))?;

    let file_name: String = if meta.is_dir() {
        name.to_string()
    } else {
        with_extension_kept(name, path.extension().and_then(OsStr::to_str))
    };

    let target: PathBuf = parent.join(&file_name);
    if target == path {
        return Ok(target);
    }

    if policy == CollisionPolicy::Fail && exists(&target).await {
        return Err(AppError::DestinationExists(target));
    }

    TokioFs::rename(path, &target)
        .await
        .map_err(|e| AppError::from_io("rename", path, &e))?;

    info!(
        marker = "FILE_OP_COMPLETE",
        operation = "rename",
        "Renamed {} to {}",
        path.display(),
        target.display()
    );

    Ok(target)
}

fn validate_name(new_name: &str) -> Result<&str, AppError> {
    let name: &str = new_name.trim();

    if name.is_empty() {
        return Err(AppError::invalid_input("new_name", "name must not be empty"));
    }

    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(AppError::invalid_input(
            "new_name",
            "name must not contain a path separator",
        ));
    }

    if matches!(Path::new(name).components().next(), Some(Component::CurDir | Component::ParentDir))
    {
        return Err(AppError::invalid_input("new_name", "name must not be '.' or '..'"));
    }

    Ok(name)
}

fn with_extension_kept(name: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !name.to_lowercase().ends_with(&format!(".{}", ext.to_lowercase())) => {
            format!("{name}.{ext}")
        }
        _ => name.to_string(),
    }
}

async fn exists(path: &Path) -> bool {
    TokioFs::symlink_metadata(path).await.is_ok()
}

/// Validates `dst_dir` and returns `dst_dir/basename(src)`.
async fn resolve_target(
    operation: &str,
    src: &Path,
    dst_dir: &Path,
    src_is_dir: bool,
) -> Result<PathBuf, AppError> {
    let dst_meta: Metadata = TokioFs::metadata(dst_dir)
        .await
        .map_err(|e| AppError::from_io(operation, dst_dir, &e))?;

    if !dst_meta.is_dir() {
        return Err(AppError::invalid_input(
            "destination",
            format!("{} is not a directory", dst_dir.display()),
        ));
    }

    if !can_write(dst_dir) {
        return Err(AppError::PermissionDenied(dst_dir.to_path_buf()));
    }

    let name: &OsStr = src
        .file_name()
        .ok_or_else(|| AppError::invalid_input("source", "source has no file name"))?;

    let src_parent: PathBuf = match src.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => canonical(operation, parent).await?,
        None => canonical(operation, Path::new(".")).await?,
    };
    let dst_canonical: PathBuf = canonical(operation, dst_dir).await?;

    if src_parent == dst_canonical {
        return Err(AppError::invalid_input(
            "destination",
            "source and destination are the same",
        ));
    }

    if src_is_dir && dst_canonical.starts_with(src_parent.join(name)) {
        return Err(AppError::invalid_input(
            "destination",
            format!(
                "cannot {operation} {} into itself or one of its subfolders",
                src.display()
            ),
        ));
    }

    Ok(dst_dir.join(name))
}

/// Whether `dir` itself, or anything below it, already failed. Such a
/// directory cannot be empty, and removing it would only report it twice.
fn has_reported_failure(dir: &Path, failures: &[EntryFailure]) -> bool {
    failures.iter().any(|f| f.path.starts_with(dir))
}

async fn canonical(operation: &str, path: &Path) -> Result<PathBuf, AppError> {
    TokioFs::canonicalize(path)
        .await
        .map_err(|e| AppError::from_io(operation, path, &e))
}

/// Creates `target` and copies every descendant of `src` into it.
async fn copy_tree(src: &Path, target: &Path, config: &FileOpsConfig) -> Result<OpReport, AppError> {
    create_dir(target, config.collision)
        .await
        .map_err(|e| AppError::from_io("copy", target, &e))?;

    let mut report = OpReport {
        files: 0,
        dirs: 1,
        bytes: 0,
    };
    let mut failures: Vec<EntryFailure> = Vec::new();
    let mut stack: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), target.to_path_buf())];

    while let Some((from_dir, to_dir)) = stack.pop() {
        let mut entries = match TokioFs::read_dir(&from_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                failures.push(EntryFailure::new(&from_dir, e));
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    failures.push(EntryFailure::new(&from_dir, e));
                    break;
                }
            };

            let from: PathBuf = entry.path();
            let to: PathBuf = to_dir.join(entry.file_name());

            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    failures.push(EntryFailure::new(&from, e));
                    continue;
                }
            };

            if file_type.is_dir() {
                match create_dir(&to, config.collision).await {
                    Ok(()) => {
                        report.dirs += 1;
                        stack.push((from, to));
                    }
                    Err(e) => failures.push(EntryFailure::new(&to, e)),
                }
            } else if file_type.is_symlink() {
                match copy_symlink(&from, &to).await {
                    Ok(()) => report.files += 1,
                    Err(e) => failures.push(EntryFailure::new(&from, e)),
                }
            } else {
                match copy_file(&from, &to, config).await {
                    Ok(bytes) => {
                        report.files += 1;
                        report.bytes += bytes;
                    }
                    Err(e) => failures.push(EntryFailure::new(&from, e)),
                }
            }
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        warn!(
            operation = "copy",
            failed = failures.len(),
            completed = report.entries(),
            "Partial copy of {}",
            src.display()
        );

        Err(AppError::PartialFailure {
            operation: "copy".to_string(),
            path: src.to_path_buf(),
            completed: report.entries(),
            failures,
        })
    }
}

async fn create_dir(path: &Path, policy: CollisionPolicy) -> std::io::Result<()> {
    match TokioFs::create_dir(path).await {
        Err(e) if e.kind() == ErrorKind::AlreadyExists && policy == CollisionPolicy::Overwrite => {
            if TokioFs::metadata(path).await?.is_dir() {
                Ok(())
            } else {
                Err(e)
            }
        }
        other => other,
    }
}

#[cfg(unix)]
async fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    let link_target: PathBuf = TokioFs::read_link(from).await?;
    TokioFs::symlink(link_target, to).await
}

#[cfg(not(unix))]
async fn copy_symlink(from: &Path, _to: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        ErrorKind::Unsupported,
        format!("cannot copy symlink {}", from.display()),
    ))
}

/// Streams one regular file through a pooled buffer. Returns bytes written.
async fn copy_file(src: &Path, dst: &Path, config: &FileOpsConfig) -> Result<u64, AppError> {
    let mut src_file: TokioFs::File = TokioFs::File::open(src)
        .await
        .map_err(|e| AppError::from_io("copy", src, &e))?;

    let mut options = TokioFs::OpenOptions::new();
    options.write(true);
    match config.collision {
        CollisionPolicy::Fail => options.create_new(true),
        CollisionPolicy::Overwrite => options.create(true).truncate(true),
    };

    let mut dst_file: TokioFs::File = options
        .open(dst)
        .await
        .map_err(|e| AppError::from_io("copy", dst, &e))?;

    let pool: &'static BufferPool = BufferPool::global();
    let mut buffer: BytesMut = pool.get_buffer(config.buffer_size.max(1)).await;

    let result: Result<u64, AppError> = async {
        let mut copied: u64 = 0;
        loop {
            let bytes_read: usize = src_file
                .read(&mut buffer[..])
                .await
                .map_err(|e| AppError::from_io("copy", src, &e))?;
            if bytes_read == 0 {
                break;
            }

            dst_file
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(|e| AppError::from_io("copy", dst, &e))?;
            copied += bytes_read as u64;
        }

        dst_file
            .flush()
            .await
            .map_err(|e| AppError::from_io("copy", dst, &e))?;

        Ok(copied)
    }
    .await;

    pool.return_buffer(buffer).await;
    result
}
