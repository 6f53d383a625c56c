// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Adaptive cache coordinator.
//!
//! The [`AdaptiveCache`] ties together all components:
//! - Entry store with composite-score eviction
//! - Affinity links and freshness propagation
//! - Access pattern recording and prefetch prediction
//! - Capacity controller retuning size and scoring mix
//!
//! # Lifecycle
//!
//! ```text
//! Created → Running → ShuttingDown → Stopped
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use adaptive_cache::{AdaptiveCache, AdaptiveCacheConfig, CacheState, SetOptions};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache: AdaptiveCache = AdaptiveCache::new(AdaptiveCacheConfig::default()).unwrap();
//! assert_eq!(cache.state(), CacheState::Created);
//!
//! cache.initialize();
//! cache.set("user:42:profile", json!({"name": "Ada"}), SetOptions::default());
//! assert!(cache.get("user:42:profile").is_some());
//!
//! cache.shutdown().await;
//! # }
//! ```

mod api;
mod lifecycle;
mod store;
mod types;

pub use types::{CacheEvent, CacheHealth, CacheState, CacheStats, MaintenanceReport};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::{AdaptiveCacheConfig, ConfigError};
use crate::pressure::PressureLevel;

use store::CacheCore;

/// Bounds every cached value type must meet.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Current time on tokio's clock, so paused-time tests drive expiry.
pub(crate) fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// `hits / (hits + misses)`, or 0 before any lookup.
fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total > 0 {
        hits as f64 / total as f64
    } else {
        0.0
    }
}

pub(crate) struct Inner<V> {
    pub(super) config: AdaptiveCacheConfig,

    /// All per-key state
    pub(super) core: Mutex<CacheCore<V>>,

    pub(super) hits: AtomicU64,
    pub(super) misses: AtomicU64,
    pub(super) sets: AtomicU64,
    pub(super) evictions: AtomicU64,
    pub(super) created_at: Instant,

    pub(super) events: broadcast::Sender<CacheEvent>,

    /// Lifecycle state (broadcast to watchers)
    pub(super) state: watch::Sender<CacheState>,
    pub(super) state_rx: watch::Receiver<CacheState>,

    /// Flipped to `true` to stop background tasks
    pub(super) shutdown: watch::Sender<bool>,

    pub(super) tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Adaptive, composite-scoring eviction cache.
///
/// Cheap to clone; clones share the same store.
///
/// # Thread Safety
///
/// One mutex guards all per-key state and is held for the whole of each
/// operation; hit/miss/set/eviction counters are atomics.
pub struct AdaptiveCache<V = serde_json::Value> {
    pub(super) inner: Arc<Inner<V>>,
}

impl<V> Clone for AdaptiveCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: CacheValue> AdaptiveCache<V> {
    /// Create a cache in the `Created` state.
    ///
    /// Call [`initialize()`](Self::initialize) from inside a tokio runtime to
    /// start the background tasks.
    pub fn new(config: AdaptiveCacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (state_tx, state_rx) = watch::channel(CacheState::Created);
        let (shutdown_tx, _) = watch::channel(false);
        let (events, _) = broadcast::channel(config.event_channel_capacity);

        let inner = Inner {
            core: Mutex::new(CacheCore::new(&config)),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            created_at: now(),
            events,
            state: state_tx,
            state_rx,
            shutdown: shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdaptiveCacheConfig {
        &self.inner.config
    }

    /// Get current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CacheState {
        *self.inner.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<CacheState> {
        self.inner.state_rx.clone()
    }

    /// Subscribe to cache events.
    ///
    /// Slow subscribers lag rather than block the cache.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub(super) fn emit(&self, event: CacheEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    pub(super) fn set_state(&self, state: CacheState) {
        self.inner.state.send_replace(state);
        crate::metrics::set_cache_state(&state.to_string());
    }

    /// Whether `key` is cached. No side effects on stats or scoring.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.core.lock().contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.core.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current entry limit (moves when `adaptive_size` is on).
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.inner.core.lock().max_size()
    }

    /// Cumulative hit rate; 0 before the first lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        ratio(
            self.inner.hits.load(Ordering::Relaxed),
            self.inner.misses.load(Ordering::Relaxed),
        )
    }

    /// Keys linked to `key` by identifier similarity.
    #[must_use]
    pub fn linked_keys(&self, key: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .core
            .lock()
            .affinity()
            .linked(key)
            .map(str::to_owned)
            .collect();
        keys.sort();
        keys
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let now = now();
        let snap = self.inner.core.lock().snapshot(now);
        let hits = self.inner.hits.load(Ordering::Relaxed);
        let misses = self.inner.misses.load(Ordering::Relaxed);
        let sets = self.inner.sets.load(Ordering::Relaxed);

        let elapsed = now.saturating_duration_since(self.inner.created_at).as_secs_f64();
        let ops_per_second = if elapsed > 0.0 {
            (hits + misses + sets) as f64 / elapsed
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            hit_rate: ratio(hits, misses),
            sets,
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            entry_count: snap.entry_count,
            memory_used: snap.memory_used,
            max_size: snap.max_size,
            avg_freshness: snap.avg_freshness,
            link_count: snap.link_count,
            pattern_count: snap.pattern_count,
            ops_per_second,
            composite_weight: snap.composite_weight,
        }
    }

    /// Utilization-based health snapshot.
    #[must_use]
    pub fn health(&self) -> CacheHealth {
        let (len, memory_used, max_size, max_memory) = {
            let core = self.inner.core.lock();
            (core.len(), core.memory_used(), core.max_size(), core.max_memory())
        };
        let size_utilization = len as f64 / max_size as f64;
        let memory_utilization = memory_used as f64 / max_memory as f64;
        let pressure = PressureLevel::from_utilization(size_utilization.max(memory_utilization));

        CacheHealth {
            healthy: pressure.is_healthy(),
            memory_utilization,
            size_utilization,
            hit_rate: self.hit_rate(),
            pressure,
        }
    }

    /// Push current gauges to the metrics recorder.
    pub fn update_gauge_metrics(&self) {
        let snap = self.inner.core.lock().snapshot(now());
        crate::metrics::set_entries(snap.entry_count);
        crate::metrics::set_memory_bytes(snap.memory_used);
        crate::metrics::set_max_size(snap.max_size);
        crate::metrics::set_affinity_links(snap.link_count);
        crate::metrics::set_composite_weight(snap.composite_weight);
        crate::metrics::set_hit_rate(self.hit_rate());
        crate::metrics::set_pressure_level(self.health().pressure as u8);
    }
}
