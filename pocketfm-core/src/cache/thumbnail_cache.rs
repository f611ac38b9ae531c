//! `src/cache/thumbnail_cache.rs`
//! ============================================================================
//! # Thumbnail Cache
//!
//! Path-keyed store of downsampled images shared between the thumbnail worker
//! (the only writer) and the interactive context (readers).
//! - Bounded by decoded pixel bytes, LRU eviction
//! - Idle entries expire after `time_to_idle`
//! - Failed decodes are kept as negative entries so they are not retried on
//!   every redraw
//! - First insert wins; entries are immutable once present

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use image::RgbaImage;
use moka::{notification::RemovalCause, policy::EvictionPolicy, sync::Cache};
use tracing::{debug, info};

use crate::config::ThumbnailConfig;

/// Paths are cheap to clone as `Arc<Path>` and still look up by `&Path`.
pub type ThumbnailKey = Arc<Path>;

/// Nominal weight of a negative entry.
const FAILED_ENTRY_WEIGHT: u32 = 64;

/// Decoded RGBA bitmap at the requested size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbaImage,
}

impl Thumbnail {
    #[must_use]
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        }
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

/// A cached outcome for one path.
#[derive(Debug, Clone)]
pub enum ThumbnailSlot {
    Ready(Arc<Thumbnail>),
    Failed(Arc<str>),
}

impl ThumbnailSlot {
    #[must_use]
    pub fn thumbnail(&self) -> Option<&Arc<Thumbnail>> {
        match self {
            Self::Ready(thumb) => Some(thumb),
            Self::Failed(_) => None,
        }
    }

    fn weight(&self) -> u32 {
        match self {
            Self::Ready(thumb) => u32::try_from(thumb.byte_len()).unwrap_or(u32::MAX),
            Self::Failed(_) => FAILED_ENTRY_WEIGHT,
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub failures: u64,
    pub evictions: u64,
}

impl CacheStatsSnapshot {
    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Clone)]
pub struct ThumbnailCache {
    inner: Cache<ThumbnailKey, ThumbnailSlot>,
    stats: Arc<CacheStats>,
    max_bytes: u64,
}

impl std::fmt::Debug for ThumbnailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailCache")
            .field("entries", &self.inner.entry_count())
            .field("weighted_size", &self.inner.weighted_size())
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl ThumbnailCache {
    #[must_use]
    pub fn new(config: &ThumbnailConfig) -> Self {
        let stats = Arc::new(CacheStats::default());
        let stats_clone = stats.clone();
        let max_bytes = config.max_bytes.as_u64();

        let inner = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|_key: &ThumbnailKey, slot: &ThumbnailSlot| -> u32 { slot.weight() })
            .eviction_policy(EvictionPolicy::lru())
            .time_to_idle(config.time_to_idle)
            .eviction_listener(move |key: Arc<ThumbnailKey>, _slot, cause: RemovalCause| {
                if cause.was_evicted() {
                    stats_clone.record_eviction();
                    debug!(
                        marker = "CACHE_OPERATION",
                        operation_type = "evicted",
                        path = %key.display(),
                        ?cause,
                        "Thumbnail evicted"
                    );
                }
            })
            .build();

        info!(
            marker = "CACHE_OPERATION",
            operation_type = "created",
            max_bytes,
            time_to_idle_s = config.time_to_idle.as_secs(),
            "Thumbnail cache created"
        );

        Self {
            inner,
            stats,
            max_bytes,
        }
    }

    /// Cached outcome for `path`, if any.
    pub fn get(&self, path: &Path) -> Option<ThumbnailSlot> {
        let slot = self.inner.get(path);

        if slot.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }

        slot
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.inner.contains_key(path)
    }

    /// Inserts `slot` unless `path` already has an entry. Returns whether this
    /// call stored it.
    pub fn insert(&self, path: ThumbnailKey, slot: ThumbnailSlot) -> bool {
        let failed = matches!(slot, ThumbnailSlot::Failed(_));
        let fresh = self.inner.entry(path).or_insert_with(|| slot).is_fresh();

        if fresh {
            let counter = if failed {
                &self.stats.failures
            } else {
                &self.stats.inserts
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }

        fresh
    }

    /// Drops the entry for a path that was renamed, moved or deleted.
    pub fn invalidate(&self, path: &Path) {
        self.inner.invalidate(path);
    }

    /// Drops every entry at or below `prefix`.
    pub fn invalidate_prefix(&self, prefix: &Path) {
        let stale: Vec<ThumbnailKey> = self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| ThumbnailKey::clone(&key))
            .collect();

        for key in stale {
            self.inner.invalidate(&key);
        }
    }

    /// Number of live entries after pending maintenance has run.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    /// Decoded bytes held after pending maintenance has run.
    pub fn weighted_size(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.weighted_size()
    }

    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}
