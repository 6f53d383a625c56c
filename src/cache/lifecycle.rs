//! Cache lifecycle management: background tasks, manual ticks, shutdown.
//!
//! Three periodic tasks run while the cache is `Running`:
//!
//! | Task | Interval | Work |
//! |------|----------|------|
//! | maintenance | `maintenance_interval_secs` | expire, decay freshness, trim access logs |
//! | capacity | `capacity_interval_secs` | sample hit rate, resize, retune scoring mix |
//! | prefetch | `prefetch_interval_secs` | emit prefetch hints for due, uncached keys |
//!
//! Each task holds only a weak reference to the cache, so dropping every
//! handle also ends the tasks. The `run_*` methods perform one tick
//! synchronously for callers that drive their own schedule.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capacity::CapacityTick;
use crate::patterns::PrefetchHint;

use super::{now, AdaptiveCache, CacheEvent, CacheState, CacheValue, MaintenanceReport};

impl<V: CacheValue> AdaptiveCache<V> {
    /// Start the background tasks on the current tokio runtime.
    ///
    /// Idempotent: only the first call from the `Created` state starts
    /// anything. Outside a runtime the call logs a warning and leaves the
    /// cache in `Created`; the cache still serves requests.
    #[tracing::instrument(skip(self))]
    pub fn initialize(&self) {
        let mut tasks = self.inner.tasks.lock();
        if self.state() != CacheState::Created {
            debug!(state = %self.state(), "initialize ignored");
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("no tokio runtime, background tasks not started");
            return;
        }

        let config = &self.inner.config;
        tasks.push(self.spawn_periodic("maintenance", config.maintenance_interval(), |cache| {
            cache.run_maintenance();
        }));
        if config.adaptive_size {
            tasks.push(self.spawn_periodic("capacity", config.capacity_interval(), |cache| {
                cache.run_capacity_tuning();
            }));
        }
        if config.prefetch_enabled {
            tasks.push(self.spawn_periodic("prefetch", config.prefetch_interval(), |cache| {
                cache.run_prefetch_scan();
            }));
        }

        self.set_state(CacheState::Running);
        info!(
            tasks = tasks.len(),
            max_size = config.max_size,
            max_memory = config.max_memory,
            "adaptive cache running"
        );
    }

    fn spawn_periodic<F>(&self, name: &'static str, period: Duration, tick: F) -> JoinHandle<()>
    where
        F: Fn(&AdaptiveCache<V>) + Send + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        let mut shutdown = self.inner.shutdown.subscribe();

        tokio::spawn(async move {
            // First tick one full period after start
            let now = tokio::time::Instant::now();
            let start = now.checked_add(period).unwrap_or(now);
            let mut interval = tokio::time::interval_at(start, period);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = interval.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        tick(&AdaptiveCache { inner });
                    }
                }
            }
            debug!(task = name, "background task stopped");
        })
    }

    /// One maintenance pass: expire, decay, trim.
    pub fn run_maintenance(&self) -> MaintenanceReport {
        let started = std::time::Instant::now();
        let now = now();

        let (expired, trimmed, report) = {
            let mut core = self.inner.core.lock();
            let expired = core.expire(now);
            core.decay_freshness(now);
            let trimmed = core.trim_patterns(now);
            let report = MaintenanceReport {
                expired_count: expired.len(),
                total_entries: core.len(),
                memory_usage: core.memory_used(),
            };
            (expired, trimmed, report)
        };

        let expired_bytes: usize = expired.iter().map(|e| e.stored_size).sum();
        if !expired.is_empty() {
            crate::metrics::record_eviction("expired", expired.len(), expired_bytes);
        }
        crate::metrics::record_maintenance(expired.len(), started.elapsed());
        self.update_gauge_metrics();

        debug!(
            expired = report.expired_count,
            trimmed_logs = trimmed,
            entries = report.total_entries,
            memory = report.memory_usage,
            "maintenance completed"
        );
        self.emit(CacheEvent::MaintenanceCompleted {
            expired_count: report.expired_count,
            total_entries: report.total_entries,
            memory_usage: report.memory_usage,
        });
        report
    }

    /// One capacity controller tick.
    ///
    /// The entry limit only moves when `adaptive_size` is on; the scoring
    /// mix is retuned either way.
    pub fn run_capacity_tuning(&self) -> CapacityTick {
        let hit_rate = self.hit_rate();
        let tick = self
            .inner
            .core
            .lock()
            .tune_capacity(hit_rate, self.inner.config.adaptive_size);

        crate::metrics::record_capacity_tick(tick.resized());
        crate::metrics::set_max_size(tick.max_size);
        crate::metrics::set_composite_weight(tick.composite_weight);

        if tick.resized() {
            info!(
                previous = tick.previous_max_size,
                current = tick.max_size,
                avg_hit_rate = tick.average_hit_rate,
                "max_size adjusted"
            );
            self.emit(CacheEvent::CapacityAdjusted {
                previous: tick.previous_max_size,
                current: tick.max_size,
            });
        } else {
            debug!(
                max_size = tick.max_size,
                avg_hit_rate = tick.average_hit_rate,
                evictions = tick.evictions,
                composite_weight = tick.composite_weight,
                "capacity unchanged"
            );
        }
        tick
    }

    /// One prefetch scan. Emits a `PrefetchRequest` per hint.
    pub fn run_prefetch_scan(&self) -> Vec<PrefetchHint> {
        let hints = self.inner.core.lock().predict_prefetch(now());

        crate::metrics::record_prefetch_hints(hints.len());
        for hint in &hints {
            debug!(key = %hint.key, confidence = hint.confidence, "prefetch hint");
            self.emit(CacheEvent::PrefetchRequest {
                key: hint.key.clone(),
                confidence: hint.confidence,
            });
        }
        hints
    }

    /// Stop background tasks, wait for them, and clear the store.
    ///
    /// Later calls are no-ops. The cache keeps serving requests afterwards
    /// without background work.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        if matches!(self.state(), CacheState::ShuttingDown | CacheState::Stopped) {
            return;
        }
        let shutdown_start = std::time::Instant::now();
        info!("Initiating adaptive cache shutdown...");
        self.set_state(CacheState::ShuttingDown);

        self.inner.shutdown.send_replace(true);
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.tasks.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }

        self.inner.core.lock().clear();
        self.set_state(CacheState::Stopped);
        info!(
            elapsed_ms = shutdown_start.elapsed().as_millis() as u64,
            evictions = self.inner.evictions.load(Ordering::Relaxed),
            "Adaptive cache shutdown complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptiveCacheConfig;
    use crate::set_options::SetOptions;
    use crate::AdaptiveCache;
    use serde_json::json;

    fn cache_with(config: AdaptiveCacheConfig) -> AdaptiveCache {
        AdaptiveCache::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let cache = cache_with(AdaptiveCacheConfig::default());
        cache.initialize();
        cache.initialize();
        assert_eq!(cache.state(), CacheState::Running);
        assert_eq!(cache.inner.tasks.lock().len(), 3);
        cache.shutdown().await;
    }

    #[test]
    fn test_initialize_without_runtime_stays_created() {
        let cache = cache_with(AdaptiveCacheConfig::default());
        cache.initialize();
        assert_eq!(cache.state(), CacheState::Created);
    }

    #[tokio::test]
    async fn test_disabled_features_spawn_fewer_tasks() {
        let cache = cache_with(AdaptiveCacheConfig {
            adaptive_size: false,
            prefetch_enabled: false,
            ..Default::default()
        });
        cache.initialize();
        assert_eq!(cache.inner.tasks.lock().len(), 1);
        cache.shutdown().await;
    }

    #[test]
    fn test_huge_interval_rejected_at_construction() {
        let result = AdaptiveCache::<serde_json::Value>::new(AdaptiveCacheConfig {
            capacity_interval_secs: u64::MAX,
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(crate::config::ConfigError::TooLong { name: "capacity_interval_secs", .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_longest_interval_initializes() {
        let cache = cache_with(AdaptiveCacheConfig {
            maintenance_interval_secs: crate::config::MAX_INTERVAL_SECS,
            capacity_interval_secs: crate::config::MAX_INTERVAL_SECS,
            prefetch_interval_secs: crate::config::MAX_INTERVAL_SECS,
            ..Default::default()
        });
        cache.initialize();
        assert_eq!(cache.state(), CacheState::Running);
        cache.shutdown().await;
        assert_eq!(cache.state(), CacheState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_stops_and_clears() {
        let cache = cache_with(AdaptiveCacheConfig::default());
        cache.initialize();
        cache.set("a", json!(1), SetOptions::default());

        cache.shutdown().await;
        assert_eq!(cache.state(), CacheState::Stopped);
        assert!(cache.is_empty());
        assert!(cache.inner.tasks.lock().is_empty());

        // Second shutdown is a no-op
        cache.shutdown().await;
        assert_eq!(cache.state(), CacheState::Stopped);

        // Cannot be restarted
        cache.initialize();
        assert_eq!(cache.state(), CacheState::Stopped);
    }

    #[test]
    fn test_manual_maintenance_reports() {
        let cache = cache_with(AdaptiveCacheConfig::default());
        cache.set("a", json!(1), SetOptions::default());
        let mut rx = cache.subscribe();

        let report = cache.run_maintenance();
        assert_eq!(report.expired_count, 0);
        assert_eq!(report.total_entries, 1);
        assert_eq!(report.memory_usage, 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            CacheEvent::MaintenanceCompleted {
                expired_count: 0,
                total_entries: 1,
                memory_usage: 1
            }
        );
    }

    #[test]
    fn test_capacity_tuning_respects_adaptive_flag() {
        let cache = cache_with(AdaptiveCacheConfig {
            max_size: 100,
            min_size: 10,
            adaptive_size: false,
            ..Default::default()
        });
        cache.get("miss");
        let tick = cache.run_capacity_tuning();
        assert!(!tick.resized());
        assert_eq!(cache.max_size(), 100);
    }

    #[test]
    fn test_capacity_tuning_emits_adjustment() {
        let cache = cache_with(AdaptiveCacheConfig {
            max_size: 100,
            min_size: 10,
            ..Default::default()
        });
        let mut rx = cache.subscribe();
        cache.get("miss");
        let _ = rx.try_recv();

        cache.run_capacity_tuning();
        assert_eq!(
            rx.try_recv().unwrap(),
            CacheEvent::CapacityAdjusted { previous: 100, current: 110 }
        );
    }
}
