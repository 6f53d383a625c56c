//! Core operations: get, set, delete, clear.
//!
//! Each operation holds the cache lock only while touching [`CacheCore`];
//! encoding runs before the lock is taken, and events, counters and metrics
//! are published after it is released.
//!
//! [`CacheCore`]: super::store::CacheCore

use std::sync::atomic::Ordering;

use tracing::{debug, trace, warn};

use crate::entry::{CacheEntry, EncodeFallback};
use crate::metrics::LatencyTimer;
use crate::set_options::SetOptions;

use super::store::Lookup;
use super::{now, AdaptiveCache, CacheEvent, CacheValue};

impl<V: CacheValue> AdaptiveCache<V> {
    /// Get a value by key.
    ///
    /// A hit refreshes the entry's recency, frequency and freshness and
    /// nudges its linked keys. An expired entry is removed and reported as a
    /// miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let _timer = LatencyTimer::new("get");
        let lookup = self.inner.core.lock().lookup(key, now());

        match lookup {
            Lookup::Hit(value) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "hit");
                crate::metrics::record_operation("get", "hit");
                self.emit(CacheEvent::Hit { key: key.to_owned() });
                Some(value)
            }
            Lookup::Miss => {
                self.record_miss(key, "miss");
                None
            }
            Lookup::Expired { stored_size } => {
                debug!(key = %key, "entry expired on read");
                crate::metrics::record_eviction("expired", 1, stored_size);
                self.record_miss(key, "expired");
                None
            }
            Lookup::Unreadable(e) => {
                warn!(key = %key, error = %e, "dropping unreadable entry");
                self.record_miss(key, "unreadable");
                None
            }
        }
    }

    fn record_miss(&self, key: &str, status: &str) {
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_operation("get", status);
        self.emit(CacheEvent::Miss { key: key.to_owned() });
    }

    /// Store a value, evicting other entries if the cache is full.
    ///
    /// Returns `false` only when the value alone is larger than
    /// `max_memory`; nothing is stored or emitted in that case.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use adaptive_cache::{AdaptiveCache, SetOptions, Priority};
    /// # use serde_json::json;
    /// # use std::time::Duration;
    /// # fn example(cache: &AdaptiveCache) {
    /// let opts = SetOptions::default()
    ///     .with_ttl(Duration::from_secs(30))
    ///     .with_priority(Priority::High);
    /// assert!(cache.set("session:abc", json!({"user": 42}), opts));
    /// # }
    /// ```
    pub fn set(&self, key: &str, value: V, options: SetOptions) -> bool {
        let _timer = LatencyTimer::new("set");
        let config = &self.inner.config;

        let compress = options.allows_compression(config.compression_enabled);
        let (entry, fallback) = CacheEntry::encode(value, compress, config.compression_threshold_bytes);
        match &fallback {
            Some(EncodeFallback::Serialization(e)) => {
                warn!(key = %key, error = %e, "size estimate failed, using default");
            }
            Some(EncodeFallback::Compression(e)) => {
                debug!(key = %key, error = %e, "storing uncompressed");
            }
            None => {}
        }
        if let Some(fallback) = &fallback {
            crate::metrics::record_fallback(fallback.kind());
        }

        let stored_size = entry.stored_size();
        if stored_size > config.max_memory {
            debug!(key = %key, stored_size, max_memory = config.max_memory, "value exceeds memory limit");
            crate::metrics::record_operation("set", "rejected");
            return false;
        }

        let compressed = entry.is_compressed();
        if compressed {
            crate::metrics::record_compression(entry.original_size(), stored_size);
        }

        let ttl = options.effective_ttl(config.ttl());
        let outcome = {
            let mut rng = rand::thread_rng();
            self.inner
                .core
                .lock()
                .insert(key, entry, ttl, options.priority, now(), &mut rng)
        };

        for evicted in &outcome.evicted {
            self.inner.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %evicted.key, stored_size = evicted.stored_size, "evicted");
            crate::metrics::record_eviction("capacity", 1, evicted.stored_size);
            self.emit(CacheEvent::Eviction { key: evicted.key.clone() });
        }
        if outcome.links_created > 0 {
            trace!(key = %key, links = outcome.links_created, "affinity links created");
        }

        self.inner.sets.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_operation("set", "stored");
        self.emit(CacheEvent::Set {
            key: key.to_owned(),
            stored_size,
            compressed,
        });
        true
    }

    /// Remove a key. Returns whether it was cached.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.inner.core.lock().delete(key).is_some();
        if removed {
            crate::metrics::record_operation("delete", "removed");
            self.emit(CacheEvent::Delete { key: key.to_owned() });
        } else {
            crate::metrics::record_operation("delete", "absent");
        }
        removed
    }

    /// Remove every entry, link and access log. Counters are kept.
    pub fn clear(&self) {
        let cleared = {
            let mut core = self.inner.core.lock();
            let n = core.len();
            core.clear();
            n
        };
        debug!(cleared, "cache cleared");
        crate::metrics::record_operation("clear", "cleared");
        self.emit(CacheEvent::Cleared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptiveCacheConfig;
    use crate::entry::Priority;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn cache_with(config: AdaptiveCacheConfig) -> AdaptiveCache {
        AdaptiveCache::new(config).unwrap()
    }

    fn small_cache(max_size: usize) -> AdaptiveCache {
        cache_with(AdaptiveCacheConfig {
            max_size,
            min_size: 1,
            ..Default::default()
        })
    }

    #[test]
    fn test_set_get_roundtrip() {
        let cache = small_cache(10);
        let value = json!({"name": "Ada", "tags": ["a", "b"]});
        assert!(cache.set("user:1", value.clone(), SetOptions::default()));
        assert_eq!(cache.get("user:1"), Some(value));
    }

    #[test]
    fn test_get_missing() {
        let cache = small_cache(10);
        assert_eq!(cache.get("nope"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_delete() {
        let cache = small_cache(10);
        cache.set("a", json!(1), SetOptions::default());
        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache = small_cache(10);
        cache.set("a", json!(1), SetOptions::default());
        cache.get("a");
        cache.clear();

        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.memory_used, 0);
        assert_eq!(stats.pattern_count, 0);
    }

    #[test]
    fn test_sole_entry_evicted() {
        let cache = small_cache(1);
        cache.set("old", json!(1), SetOptions::default());
        cache.set("new", json!(2), SetOptions::default());

        assert!(!cache.contains("old"));
        assert!(cache.contains("new"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_oversized_value_rejected() {
        let cache = cache_with(AdaptiveCacheConfig {
            max_memory: 16,
            compression_enabled: false,
            ..Default::default()
        });
        let mut rx = cache.subscribe();

        assert!(!cache.set("big", json!("this string is far too long"), SetOptions::default()));
        assert!(!cache.contains("big"));
        assert_eq!(cache.stats().sets, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_events_emitted() {
        let cache = small_cache(1);
        let mut rx = cache.subscribe();

        cache.set("a", json!(1), SetOptions::default());
        cache.get("a");
        cache.get("b");
        cache.set("b", json!(2), SetOptions::default());
        cache.delete("b");
        cache.clear();

        let events: Vec<CacheEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                CacheEvent::Set { key: "a".into(), stored_size: 1, compressed: false },
                CacheEvent::Hit { key: "a".into() },
                CacheEvent::Miss { key: "b".into() },
                CacheEvent::Eviction { key: "a".into() },
                CacheEvent::Set { key: "b".into(), stored_size: 1, compressed: false },
                CacheEvent::Delete { key: "b".into() },
                CacheEvent::Cleared,
            ]
        );
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_large_value_compressed_roundtrip() {
        let cache = small_cache(10);
        let value = json!({"rows": vec!["repeated row content"; 300]});
        let mut rx = cache.subscribe();

        assert!(cache.set("report", value.clone(), SetOptions::default()));
        match rx.try_recv().unwrap() {
            CacheEvent::Set { compressed, .. } => assert!(compressed),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(cache.get("report"), Some(value));
    }

    #[test]
    fn test_per_call_compression_opt_out() {
        let cache = small_cache(10);
        let value = json!({"rows": vec!["repeated row content"; 300]});
        let mut rx = cache.subscribe();

        cache.set("report", value.clone(), SetOptions::default().with_compression(false));
        match rx.try_recv().unwrap() {
            CacheEvent::Set { compressed, .. } => assert!(!compressed),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(cache.get("report"), Some(value));
    }

    #[test]
    fn test_high_priority_survives() {
        let cache = small_cache(2);
        cache.set("keep", json!(1), SetOptions::default().with_priority(Priority::High));
        cache.set("drop", json!(2), SetOptions::default().with_priority(Priority::Low));
        cache.set("new", json!(3), SetOptions::default());

        assert!(cache.contains("keep"));
        assert!(!cache.contains("drop"));
    }

    #[test]
    fn test_custom_value_type() {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Session {
            user: u64,
        }

        let cache: AdaptiveCache<Session> = AdaptiveCache::new(AdaptiveCacheConfig::default()).unwrap();
        cache.set("s", Session { user: 7 }, SetOptions::default().with_ttl(Duration::from_secs(5)));
        assert_eq!(cache.get("s"), Some(Session { user: 7 }));
    }

    #[test]
    fn test_value_type_default_is_json() {
        let cache = small_cache(4);
        let value: Value = json!(null);
        cache.set("n", value.clone(), SetOptions::default());
        assert_eq!(cache.get("n"), Some(value));
    }
}
