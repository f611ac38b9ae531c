//! ``src/tasks/thumbnail_task.rs``
//! ============================================================================
//! # Thumbnail Generator: background decode-and-downsample worker
//!
//! One generator belongs to one directory view. Requests are answered from
//! the shared [`ThumbnailCache`] when possible, joined when the same path is
//! already in flight, and otherwise queued for a single worker task that
//! decodes on the blocking pool.
//!
//! Lifecycle: `Idle -> Generating -> Idle`, with `Cancelled` terminal and
//! reachable from either state. A decode already running when the generator is
//! cancelled runs to completion, but its result is dropped: nothing is
//! inserted and no notification is sent.

use crate::cache::thumbnail_cache::{Thumbnail, ThumbnailCache, ThumbnailKey, ThumbnailSlot};
use crate::config::ThumbnailConfig;
use crate::controller::event_loop::TaskResult;
use crate::error::AppError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use image::imageops::FilterType;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Instant,
};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::{self as TokioScheduler, JoinError, JoinHandle},
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GeneratorState {
    Idle = 0,
    Generating = 1,
    Cancelled = 2,
}

impl GeneratorState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Generating,
            _ => Self::Cancelled,
        }
    }
}

/// Answer to a thumbnail request.
#[derive(Debug, Clone)]
pub enum ThumbnailRequest {
    /// Already decoded.
    Ready(Arc<Thumbnail>),

    /// Decoding failed earlier; the path is not retried.
    Failed(Arc<str>),

    /// Queued or joined onto a decode in flight; a `ThumbnailReady` follows.
    Pending,

    /// Queue is full. Ask again on the next redraw.
    Deferred,

    /// The generator was torn down.
    Cancelled,
}

struct ThumbnailJob {
    key: ThumbnailKey,
    queued_at: Instant,
}

struct Shared {
    cache: ThumbnailCache,
    in_flight: DashMap<ThumbnailKey, ()>,
    state: AtomicU8,
    submitted: AtomicU64,
    cancel_token: CancellationToken,
    size: (u32, u32),
}

impl Shared {
    fn state(&self) -> GeneratorState {
        GeneratorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `from -> to` unless the generator has been cancelled meanwhile.
    fn transition(&self, from: GeneratorState, to: GeneratorState) {
        let _ = self.state.compare_exchange(
            from as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

pub struct ThumbnailGenerator {
    shared: Arc<Shared>,
    job_tx: mpsc::Sender<ThumbnailJob>,
    worker: JoinHandle<()>,
    // Dropping the generator stops its worker.
    _cancel_on_drop: DropGuard,
}

impl std::fmt::Debug for ThumbnailGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailGenerator")
            .field("state", &self.state())
            .field("in_flight", &self.shared.in_flight.len())
            .field("submitted", &self.submitted())
            .finish_non_exhaustive()
    }
}

impl ThumbnailGenerator {
    /// Starts the worker. Must be called from within a tokio runtime.
    pub fn spawn(
        cache: ThumbnailCache,
        config: &ThumbnailConfig,
        task_tx: mpsc::UnboundedSender<TaskResult>,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<ThumbnailJob>(config.queue_depth.max(1));

        let shared = Arc::new(Shared {
            cache,
            in_flight: DashMap::new(),
            state: AtomicU8::new(GeneratorState::Idle as u8),
            submitted: AtomicU64::new(0),
            cancel_token: CancellationToken::new(),
            size: (config.width.max(1), config.height.max(1)),
        });

        let worker = tokio::spawn(
            run_worker(shared.clone(), job_rx, task_tx)
                .instrument(tracing::info_span!("thumbnail_worker")),
        );

        let _cancel_on_drop = shared.cancel_token.clone().drop_guard();

        Self {
            shared,
            job_tx,
            worker,
            _cancel_on_drop,
        }
    }

    /// Looks up or schedules the thumbnail for `path`.
    pub fn request(&self, path: &Path) -> ThumbnailRequest {
        if self.is_cancelled() {
            return ThumbnailRequest::Cancelled;
        }

        match self.shared.cache.get(path) {
            Some(ThumbnailSlot::Ready(thumb)) => return ThumbnailRequest::Ready(thumb),
            Some(ThumbnailSlot::Failed(reason)) => return ThumbnailRequest::Failed(reason),
            None => {}
        }

        let key: ThumbnailKey = Arc::from(path);

        match self.shared.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => return ThumbnailRequest::Pending,
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let job = ThumbnailJob {
            key: key.clone(),
            queued_at: Instant::now(),
        };

        match self.job_tx.try_send(job) {
            Ok(()) => {
                self.shared.submitted.fetch_add(1, Ordering::Relaxed);
                debug!(
                    marker = "THUMBNAIL_TASK",
                    operation_type = "queued",
                    path = %path.display(),
                    "Thumbnail queued"
                );
                ThumbnailRequest::Pending
            }

            Err(TrySendError::Full(_)) => {
                self.shared.in_flight.remove(&key);
                debug!("Thumbnail queue full, deferring {}", path.display());
                ThumbnailRequest::Deferred
            }

            Err(TrySendError::Closed(_)) => {
                self.shared.in_flight.remove(&key);
                ThumbnailRequest::Cancelled
            }
        }
    }

    /// Tears the generator down. Queued jobs are dropped; a decode already
    /// running finishes but its result is discarded.
    pub fn cancel(&self) {
        if self.shared.state.swap(GeneratorState::Cancelled as u8, Ordering::AcqRel)
            != GeneratorState::Cancelled as u8
        {
            info!(
                marker = "THUMBNAIL_TASK",
                operation_type = "cancelled",
                pending = self.shared.in_flight.len(),
                "Thumbnail generator cancelled"
            );
        }
        self.shared.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel_token.is_cancelled()
    }

    #[must_use]
    pub fn state(&self) -> GeneratorState {
        self.shared.state()
    }

    /// Decodes ever queued by this generator.
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.shared.submitted.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn cache(&self) -> &ThumbnailCache {
        &self.shared.cache
    }

    /// Cancels and waits for the worker to exit.
    pub async fn shutdown(self) {
        self.cancel();
        let _ = self.worker.await;
    }
}

async fn run_worker(
    shared: Arc<Shared>,
    mut job_rx: mpsc::Receiver<ThumbnailJob>,
    task_tx: mpsc::UnboundedSender<TaskResult>,
) {
    loop {
        let job: ThumbnailJob = tokio::select! {
            biased;

            () = shared.cancel_token.cancelled() => break,

            job = job_rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        // A concurrent request may have raced a finished decode.
        if shared.cache.contains(&job.key) {
            shared.in_flight.remove(&job.key);
            continue;
        }

        shared.transition(GeneratorState::Idle, GeneratorState::Generating);

        let (width, height) = shared.size;
        let decode_key: ThumbnailKey = job.key.clone();
        let decode_start = Instant::now();

        let outcome: Result<Result<Thumbnail, AppError>, JoinError> =
            TokioScheduler::spawn_blocking(move || decode(&decode_key, width, height)).await;

        if shared.cancel_token.is_cancelled() {
            debug!(
                marker = "THUMBNAIL_TASK",
                operation_type = "discarded",
                path = %job.key.display(),
                "Generator cancelled mid-decode, discarding result"
            );
            shared.in_flight.remove(&job.key);
            break;
        }

        let path: PathBuf = job.key.to_path_buf();
        let message: TaskResult = match outcome {
            Ok(Ok(thumbnail)) => {
                debug!(
                    marker = "THUMBNAIL_TASK",
                    operation_type = "decoded",
                    path = %path.display(),
                    queue_wait_us = decode_start.duration_since(job.queued_at).as_micros() as u64,
                    decode_us = decode_start.elapsed().as_micros() as u64,
                    "Thumbnail ready"
                );
                shared
                    .cache
                    .insert(job.key.clone(), ThumbnailSlot::Ready(Arc::new(thumbnail)));
                TaskResult::ThumbnailReady { path }
            }

            Ok(Err(error)) => {
                warn!(
                    marker = "THUMBNAIL_TASK",
                    operation_type = "decode_failed",
                    path = %path.display(),
                    error = %error,
                    "Thumbnail decode failed"
                );
                shared.cache.insert(
                    job.key.clone(),
                    ThumbnailSlot::Failed(Arc::from(error.to_string())),
                );
                TaskResult::ThumbnailFailed { path, error }
            }

            Err(join_error) => {
                let error = AppError::task_failed("thumbnail", join_error.to_string());
                TaskResult::ThumbnailFailed { path, error }
            }
        };

        shared.in_flight.remove(&job.key);
        shared.transition(GeneratorState::Generating, GeneratorState::Idle);

        if task_tx.send(message).is_err() {
            break;
        }
    }

    debug!(marker = "THUMBNAIL_TASK", "Thumbnail worker exited");
}

/// Decodes `path` and scales it to exactly `width` x `height`.
pub fn decode(path: &Path, width: u32, height: u32) -> Result<Thumbnail, AppError> {
    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => AppError::from_io("thumbnail", path, &io),
        other => AppError::thumbnail(path, other.to_string()),
    })?;

    let scaled = image.resize_exact(width, height, FilterType::Triangle);
    Ok(Thumbnail::new(scaled.to_rgba8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(120, 80, Rgba([200, 10, 10, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn setup() -> (
        ThumbnailCache,
        ThumbnailConfig,
        mpsc::UnboundedSender<TaskResult>,
        UnboundedReceiver<TaskResult>,
    ) {
        let config = ThumbnailConfig::default();
        let cache = ThumbnailCache::new(&config);
        let (tx, rx) = mpsc::unbounded_channel();
        (cache, config, tx, rx)
    }

    #[test]
    fn decode_scales_to_exact_size() {
        let dir = TempDir::new().unwrap();
        let path = write_png(dir.path(), "red.png");

        let thumb = decode(&path, 52, 52).unwrap();

        assert_eq!((thumb.width, thumb.height), (52, 52));
        assert_eq!(thumb.byte_len(), 52 * 52 * 4);
    }

    #[test]
    fn decode_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        assert!(matches!(decode(&path, 52, 52), Err(AppError::Thumbnail { .. })));
    }

    #[tokio::test]
    async fn duplicate_requests_share_one_decode() {
        let dir = TempDir::new().unwrap();
        let path = write_png(dir.path(), "photo.png");
        let (cache, config, tx, mut rx) = setup();

        // Current-thread runtime: the worker cannot run until we await.
        let generator = ThumbnailGenerator::spawn(cache.clone(), &config, tx);
        assert!(matches!(generator.request(&path), ThumbnailRequest::Pending));
        assert!(matches!(generator.request(&path), ThumbnailRequest::Pending));
        assert_eq!(generator.submitted(), 1);

        match rx.recv().await.unwrap() {
            TaskResult::ThumbnailReady { path: ready } => assert_eq!(ready, path),
            other => panic!("Expected ThumbnailReady, got {other:?}"),
        }

        assert!(matches!(generator.request(&path), ThumbnailRequest::Ready(_)));
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(generator.submitted(), 1);
        assert_eq!(generator.state(), GeneratorState::Idle);
    }

    #[tokio::test]
    async fn cancelled_request_never_populates_cache() {
        let dir = TempDir::new().unwrap();
        let path = write_png(dir.path(), "photo.png");
        let (cache, config, tx, mut rx) = setup();

        let generator = ThumbnailGenerator::spawn(cache.clone(), &config, tx);
        assert!(matches!(generator.request(&path), ThumbnailRequest::Pending));

        generator.cancel();
        assert_eq!(generator.state(), GeneratorState::Cancelled);
        assert!(matches!(generator.request(&path), ThumbnailRequest::Cancelled));

        generator.shutdown().await;

        assert!(rx.recv().await.is_none());
        assert!(!cache.contains(&path));
    }

    #[tokio::test]
    async fn full_queue_defers() {
        let dir = TempDir::new().unwrap();
        let (cache, mut config, tx, _rx) = setup();
        config.queue_depth = 1;

        let first = write_png(dir.path(), "1.png");
        let second = write_png(dir.path(), "2.png");

        let generator = ThumbnailGenerator::spawn(cache, &config, tx);
        assert!(matches!(generator.request(&first), ThumbnailRequest::Pending));
        assert!(matches!(generator.request(&second), ThumbnailRequest::Deferred));
        assert_eq!(generator.submitted(), 1);

        generator.shutdown().await;
    }

    #[tokio::test]
    async fn broken_image_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"\xff\xd8 truncated").unwrap();
        let (cache, config, tx, mut rx) = setup();

        let generator = ThumbnailGenerator::spawn(cache, &config, tx);
        generator.request(&path);

        assert!(matches!(
            rx.recv().await.unwrap(),
            TaskResult::ThumbnailFailed { .. }
        ));
        assert!(matches!(generator.request(&path), ThumbnailRequest::Failed(_)));
        assert_eq!(generator.submitted(), 1);
    }
}
