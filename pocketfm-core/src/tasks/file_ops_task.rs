//! ``src/tasks/file_ops_task.rs``
//! ============================================================================
//! # File Operations Task: bulk operations off the interactive context
//!
//! Copy, move, delete and rename run as spawned tokio tasks. There is no
//! progress reporting and no cancellation; exactly one
//! `TaskResult::FileOperationComplete` is sent when the operation finishes,
//! whether it succeeded or not.

use crate::config::FileOpsConfig;
use crate::controller::event_loop::TaskResult;
use crate::error::AppError;
use crate::fs::file_ops::{self, OpReport};
use std::{fmt, path::PathBuf, sync::Arc, time::Instant};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Instrument, info, warn};

/// Types of file operations supported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    /// Copy file/directory into a destination directory
    Copy {
        source: Arc<PathBuf>,
        dest_dir: Arc<PathBuf>,
    },

    /// Move file/directory into a destination directory
    Move {
        source: Arc<PathBuf>,
        dest_dir: Arc<PathBuf>,
    },

    /// Delete file/directory tree
    Delete { target: Arc<PathBuf> },

    /// Rename within the parent directory
    Rename {
        source: Arc<PathBuf>,
        new_name: String,
    },
}

impl FileOperation {
    /// Path the operation acts on.
    #[must_use]
    pub fn source(&self) -> &Arc<PathBuf> {
        match self {
            Self::Copy { source, .. } | Self::Move { source, .. } | Self::Rename { source, .. } => {
                source
            }
            Self::Delete { target } => target,
        }
    }

    /// Where a copy or move lands. Renames report theirs in the outcome.
    #[must_use]
    pub fn destination(&self) -> Option<PathBuf> {
        match self {
            Self::Copy { source, dest_dir } | Self::Move { source, dest_dir } => {
                source.file_name().map(|name| dest_dir.join(name))
            }
            Self::Delete { .. } | Self::Rename { .. } => None,
        }
    }

    /// Whether the source path disappears on success.
    #[must_use]
    pub const fn removes_source(&self) -> bool {
        !matches!(self, Self::Copy { .. })
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ret_str: &'static str = match self {
            Self::Copy { .. } => "Copy",
            Self::Move { .. } => "Move",
            Self::Delete { .. } => "Delete",
            Self::Rename { .. } => "Rename",
        };

        write!(f, "{ret_str}")
    }
}

/// Successful outcome of a [`FileOperation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOpOutcome {
    Completed(OpReport),
    Renamed { to: PathBuf },
}

impl fmt::Display for FileOpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(report) => write!(f, "{report}"),
            Self::Renamed { to } => write!(f, "now {}", to.display()),
        }
    }
}

/// File operation task for background processing
#[derive(Debug)]
pub struct FileOperationTask {
    pub operation_id: String,
    pub operation: FileOperation,
    pub task_tx: mpsc::UnboundedSender<TaskResult>,
    pub config: FileOpsConfig,
}

impl FileOperationTask {
    /// Create new file operation task with unique ID
    pub fn new(
        operation: FileOperation,
        task_tx: mpsc::UnboundedSender<TaskResult>,
        config: FileOpsConfig,
    ) -> Self {
        Self {
            operation_id: nanoid::nanoid!(),
            operation,
            task_tx,
            config,
        }
    }

    /// Runs the operation on the runtime and reports through `task_tx`.
    pub fn spawn(self) -> JoinHandle<Result<FileOpOutcome, AppError>> {
        let span = tracing::info_span!(
            "file_operation",
            operation_id = %self.operation_id,
            operation = %self.operation,
            source = %self.operation.source().display()
        );

        tokio::spawn(async move { self.execute().await }.instrument(span))
    }

    /// Runs the operation to completion and sends exactly one completion
    /// result.
    pub async fn execute(&self) -> Result<FileOpOutcome, AppError> {
        let start_time = Instant::now();

        let result: Result<FileOpOutcome, AppError> = match &self.operation {
            FileOperation::Copy { source, dest_dir } => {
                file_ops::copy_to_directory(source, dest_dir, &self.config)
                    .await
                    .map(FileOpOutcome::Completed)
            }

            FileOperation::Move { source, dest_dir } => {
                file_ops::move_to_directory(source, dest_dir, &self.config)
                    .await
                    .map(FileOpOutcome::Completed)
            }

            FileOperation::Delete { target } => file_ops::delete_target(target)
                .await
                .map(FileOpOutcome::Completed),

            FileOperation::Rename { source, new_name } => {
                file_ops::rename_target(source, new_name, self.config.collision)
                    .await
                    .map(|to| FileOpOutcome::Renamed { to })
            }
        };

        match &result {
            Ok(outcome) => info!(
                marker = "FILE_OPERATION_TASK",
                operation_id = %self.operation_id,
                duration_ms = start_time.elapsed().as_millis() as u64,
                "{} finished: {}",
                self.operation,
                outcome
            ),
            Err(e) => warn!(
                marker = "FILE_OPERATION_TASK",
                operation_id = %self.operation_id,
                duration_ms = start_time.elapsed().as_millis() as u64,
                error = %e,
                "{} failed",
                self.operation
            ),
        }

        let completion_result: TaskResult = TaskResult::FileOperationComplete {
            operation_id: self.operation_id.clone(),
            operation: self.operation.clone(),
            result: result.clone(),
        };

        if self.task_tx.send(completion_result).is_err() {
            warn!("Task result receiver dropped before {} completed", self.operation_id);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn arc(path: PathBuf) -> Arc<PathBuf> {
        Arc::new(path)
    }

    #[tokio::test]
    async fn copy_task_reports_completion() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        let dest = tmp.path().join("out");
        fs::write(&src, b"hello").unwrap();
        fs::create_dir(&dest).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = FileOperationTask::new(
            FileOperation::Copy {
                source: arc(src.clone()),
                dest_dir: arc(dest.clone()),
            },
            tx,
            FileOpsConfig::default(),
        );
        let id = task.operation_id.clone();

        let outcome = task.spawn().await.unwrap().unwrap();
        assert_eq!(
            outcome,
            FileOpOutcome::Completed(OpReport {
                files: 1,
                dirs: 0,
                bytes: 5
            })
        );

        match rx.recv().await.unwrap() {
            TaskResult::FileOperationComplete {
                operation_id,
                operation,
                result,
            } => {
                assert_eq!(operation_id, id);
                assert!(!operation.removes_source());
                assert!(result.is_ok());
            }
            other => panic!("Expected FileOperationComplete, got {other:?}"),
        }
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn failures_are_reported_too() {
        let tmp = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = FileOperationTask::new(
            FileOperation::Delete {
                target: arc(tmp.path().join("ghost")),
            },
            tx,
            FileOpsConfig::default(),
        );

        assert!(task.execute().await.is_err());
        assert!(matches!(
            rx.recv().await.unwrap(),
            TaskResult::FileOperationComplete {
                result: Err(AppError::NotFound(_)),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn rename_task_returns_new_path() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("draft.md");
        fs::write(&src, b"#").unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let task = FileOperationTask::new(
            FileOperation::Rename {
                source: arc(src),
                new_name: "final".into(),
            },
            tx,
            FileOpsConfig::default(),
        );

        assert_eq!(
            task.execute().await.unwrap(),
            FileOpOutcome::Renamed {
                to: tmp.path().join("final.md")
            }
        );
    }

    #[test]
    fn operation_ids_are_unique() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let op = FileOperation::Delete {
            target: arc(PathBuf::from("/tmp/x")),
        };
        let a = FileOperationTask::new(op.clone(), tx.clone(), FileOpsConfig::default());
        let b = FileOperationTask::new(op, tx, FileOpsConfig::default());
        assert_ne!(a.operation_id, b.operation_id);
    }
}
