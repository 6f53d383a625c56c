// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Lock-protected cache state.
//!
//! [`CacheCore`] owns every per-key structure (entries, metadata, freshness,
//! affinity links, access logs) plus the capacity controller, and keeps them
//! consistent with each other. It never reads the clock: callers pass `now`,
//! so the whole core can be driven deterministically in tests.
//!
//! The public [`super::AdaptiveCache`] wraps it in a single mutex and turns
//! the outcomes returned here into events, counters and metrics.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::affinity::{affinity_strength, AffinityTracker, PROPAGATION_FRACTION};
use crate::capacity::{CapacityController, CapacityTick};
use crate::compression::CompressionError;
use crate::config::AdaptiveCacheConfig;
use crate::entry::{CacheEntry, EntryMetadata, Priority};
use crate::eviction::{Candidate, CompositePolicy, VictimQueue};
use crate::freshness::FreshnessState;
use crate::patterns::{AccessKind, AccessPatternRecorder, PrefetchHint, PrefetchPredictor};

/// Everything held for one cached key.
#[derive(Debug)]
struct Slot<V> {
    entry: CacheEntry<V>,
    meta: EntryMetadata,
    freshness: FreshnessState,
}

/// Result of a lookup.
#[derive(Debug)]
pub(crate) enum Lookup<V> {
    Hit(V),
    Miss,
    /// Entry was past its expiry and has been removed
    Expired { stored_size: usize },
    /// Stored bytes could not be unpacked; entry removed
    Unreadable(CompressionError),
}

/// A key removed to make room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Evicted {
    pub key: String,
    pub stored_size: usize,
}

/// Result of an insert.
#[derive(Debug, Default)]
pub(crate) struct InsertOutcome {
    pub evicted: Vec<Evicted>,
    pub replaced: bool,
    pub links_created: usize,
}

/// Aggregates read under the lock for stats and health.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CoreSnapshot {
    pub entry_count: usize,
    pub memory_used: usize,
    pub max_size: usize,
    pub avg_freshness: f64,
    pub link_count: usize,
    pub pattern_count: usize,
    pub composite_weight: f64,
}

pub(crate) struct CacheCore<V> {
    slots: HashMap<String, Slot<V>>,
    affinity: AffinityTracker,
    patterns: AccessPatternRecorder,
    capacity: CapacityController,
    policy: CompositePolicy,
    predictor: PrefetchPredictor,
    composite_enabled: bool,
    max_size: usize,
    max_memory: usize,
    memory_used: usize,
    half_life: Duration,
}

impl<V> CacheCore<V> {
    pub fn new(config: &AdaptiveCacheConfig) -> Self {
        Self {
            slots: HashMap::new(),
            affinity: AffinityTracker::new(config.affinity_threshold),
            patterns: AccessPatternRecorder::new(),
            capacity: CapacityController::new(config.target_hit_rate, config.min_size, config.max_size_cap),
            policy: CompositePolicy::default(),
            predictor: PrefetchPredictor::default(),
            composite_enabled: config.composite_eviction_enabled,
            max_size: config.max_size,
            max_memory: config.max_memory,
            memory_used: 0,
            half_life: config.freshness_half_life(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    #[must_use]
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    pub fn affinity(&self) -> &AffinityTracker {
        &self.affinity
    }

    pub fn patterns(&self) -> &AccessPatternRecorder {
        &self.patterns
    }

    /// Freshness score of a cached key as of `now`.
    #[must_use]
    pub fn freshness_at(&self, key: &str, now: Instant) -> Option<f64> {
        self.slots
            .get(key)
            .map(|slot| slot.freshness.score_at(now, self.half_life))
    }

    /// Drop a key's entry and affinity links. Its access log survives.
    fn remove_slot(&mut self, key: &str) -> Option<usize> {
        let slot = self.slots.remove(key)?;
        self.memory_used = self.memory_used.saturating_sub(slot.entry.stored_size());
        self.affinity.remove(key);
        Some(slot.entry.stored_size())
    }

    /// Remove a key and everything recorded about it.
    pub fn delete(&mut self, key: &str) -> Option<usize> {
        self.patterns.remove(key);
        self.remove_slot(key)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.affinity.clear();
        self.patterns.clear();
        self.memory_used = 0;
    }

    /// Pull each linked key's freshness toward `key`'s.
    fn propagate(&mut self, key: &str, now: Instant) {
        let Some(source) = self.slots.get(key).map(|slot| slot.freshness.clone()) else {
            return;
        };
        let linked: Vec<String> = self.affinity.linked(key).map(str::to_owned).collect();
        for other in linked {
            if let Some(slot) = self.slots.get_mut(&other) {
                slot.freshness.decay(now, self.half_life);
                slot.freshness.pull_toward(&source, PROPAGATION_FRACTION);
            }
        }
    }

    fn candidates(&self, now: Instant) -> Vec<Candidate> {
        self.slots
            .iter()
            .map(|(key, slot)| {
                let cached_links = self
                    .affinity
                    .linked(key)
                    .filter(|other| self.slots.contains_key(*other))
                    .count();
                Candidate {
                    key: key.clone(),
                    age: slot.meta.age(now),
                    idle: slot.meta.idle(now),
                    ttl: slot.meta.ttl,
                    last_accessed: slot.meta.last_accessed,
                    access_count: slot.meta.access_count,
                    priority: slot.meta.priority,
                    freshness: slot.freshness.score_at(now, self.half_life),
                    affinity: affinity_strength(cached_links),
                    regularity: self.patterns.regularity(key),
                }
            })
            .collect()
    }

    fn victim_queue(&self, now: Instant) -> VictimQueue {
        let candidates = self.candidates(now);
        if self.composite_enabled {
            self.policy.victim_queue(&candidates, self.capacity.composite_weight())
        } else {
            VictimQueue::lru(&candidates)
        }
    }

    fn over_capacity(&self, required: usize) -> bool {
        self.slots.len() >= self.max_size
            || self.memory_used.saturating_add(required) > self.max_memory
    }

    /// Evict until one more entry of `required` bytes fits.
    ///
    /// Candidates are snapshotted once, on the first eviction.
    pub fn ensure_space<R: Rng + ?Sized>(&mut self, required: usize, now: Instant, rng: &mut R) -> Vec<Evicted> {
        let mut evicted = Vec::new();
        let mut queue: Option<VictimQueue> = None;

        while self.over_capacity(required) {
            let queue = queue.get_or_insert_with(|| self.victim_queue(now));
            let Some(victim) = queue.next_victim(rng) else {
                break;
            };
            if let Some(stored_size) = self.remove_slot(&victim) {
                self.capacity.record_eviction();
                evicted.push(Evicted { key: victim, stored_size });
            }
        }
        evicted
    }

    /// Store an encoded entry, evicting as needed.
    ///
    /// The caller rejects entries larger than `max_memory` beforehand.
    pub fn insert<R: Rng + ?Sized>(
        &mut self,
        key: &str,
        entry: CacheEntry<V>,
        ttl: Duration,
        priority: Priority,
        now: Instant,
        rng: &mut R,
    ) -> InsertOutcome {
        let stored_size = entry.stored_size();

        // Overwrite keeps the key's links and freshness rhythm
        let previous = self.slots.remove(key);
        if let Some(old) = &previous {
            self.memory_used = self.memory_used.saturating_sub(old.entry.stored_size());
        }

        let evicted = self.ensure_space(stored_size, now, rng);

        let links_created = if previous.is_none() {
            let existing = self.slots.keys().map(String::as_str);
            self.affinity.link_new_key(key, existing)
        } else {
            0
        };

        let freshness = match previous.as_ref() {
            Some(old) => {
                let mut freshness = old.freshness.clone();
                freshness.record_write(now);
                freshness
            }
            None => FreshnessState::new(now),
        };

        self.slots.insert(
            key.to_owned(),
            Slot {
                entry,
                meta: EntryMetadata::new(key.to_owned(), ttl, priority, stored_size, now),
                freshness,
            },
        );
        self.memory_used += stored_size;
        self.patterns.record(key, AccessKind::Set, now);

        InsertOutcome {
            evicted,
            replaced: previous.is_some(),
            links_created,
        }
    }

    /// Remove every entry past its expiry. Returns the removed keys.
    pub fn expire(&mut self, now: Instant) -> Vec<Evicted> {
        let expired: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.meta.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| {
                let stored_size = self.remove_slot(&key)?;
                self.patterns.record(&key, AccessKind::Expired, now);
                Some(Evicted { key, stored_size })
            })
            .collect()
    }

    pub fn decay_freshness(&mut self, now: Instant) {
        for slot in self.slots.values_mut() {
            slot.freshness.decay(now, self.half_life);
        }
    }

    /// Purge stale access events and logs of keys no longer cached.
    pub fn trim_patterns(&mut self, now: Instant) -> usize {
        let slots = &self.slots;
        self.patterns.trim(now, |key| slots.contains_key(key))
    }

    pub fn predict_prefetch(&self, now: Instant) -> Vec<PrefetchHint> {
        self.predictor
            .predict(&self.patterns, now, |key| self.slots.contains_key(key))
    }

    /// One capacity controller tick.
    pub fn tune_capacity(&mut self, hit_rate: f64, adjust_size: bool) -> CapacityTick {
        let tick = self.capacity.tick(hit_rate, self.max_size, adjust_size);
        self.max_size = tick.max_size;
        tick
    }

    #[must_use]
    pub fn composite_weight(&self) -> f64 {
        self.capacity.composite_weight()
    }

    #[must_use]
    pub fn snapshot(&self, now: Instant) -> CoreSnapshot {
        let avg_freshness = if self.slots.is_empty() {
            0.0
        } else {
            self.slots
                .values()
                .map(|slot| slot.freshness.score_at(now, self.half_life))
                .sum::<f64>()
                / self.slots.len() as f64
        };
        CoreSnapshot {
            entry_count: self.slots.len(),
            memory_used: self.memory_used,
            max_size: self.max_size,
            avg_freshness,
            link_count: self.affinity.link_count(),
            pattern_count: self.patterns.len(),
            composite_weight: self.capacity.composite_weight(),
        }
    }
}

impl<V> CacheCore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Look up a key, updating its metadata, freshness and links on a hit.
    pub fn lookup(&mut self, key: &str, now: Instant) -> Lookup<V> {
        let Some(slot) = self.slots.get_mut(key) else {
            self.patterns.record(key, AccessKind::Miss, now);
            return Lookup::Miss;
        };

        if slot.meta.is_expired(now) {
            let stored_size = slot.entry.stored_size();
            self.remove_slot(key);
            self.patterns.record(key, AccessKind::Expired, now);
            return Lookup::Expired { stored_size };
        }

        let value = match slot.entry.load() {
            Ok(value) => value,
            Err(e) => {
                self.remove_slot(key);
                self.patterns.record(key, AccessKind::Miss, now);
                return Lookup::Unreadable(e);
            }
        };

        slot.meta.record_access(now);
        slot.freshness.record_access(now, self.half_life);
        self.patterns.record(key, AccessKind::Hit, now);
        self.propagate(key, now);
        Lookup::Hit(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};

    fn config(max_size: usize) -> AdaptiveCacheConfig {
        AdaptiveCacheConfig {
            max_size,
            min_size: 1,
            ..Default::default()
        }
    }

    fn put(core: &mut CacheCore<Value>, key: &str, value: Value, now: Instant) -> InsertOutcome {
        let (entry, _) = CacheEntry::encode(value, false, 1024);
        let mut rng = SmallRng::seed_from_u64(42);
        core.insert(key, entry, Duration::from_secs(60), Priority::Normal, now, &mut rng)
    }

    #[test]
    fn test_insert_and_lookup() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(10));
        put(&mut core, "a", json!(1), now);

        assert!(matches!(core.lookup("a", now), Lookup::Hit(v) if v == json!(1)));
        assert!(matches!(core.lookup("b", now), Lookup::Miss));
        assert_eq!(core.len(), 1);
        assert_eq!(core.memory_used(), 1);
    }

    #[test]
    fn test_overwrite_replaces_and_reaccounts() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(10));
        put(&mut core, "a", json!("short"), now);
        let outcome = put(&mut core, "a", json!("a much longer value"), now);

        assert!(outcome.replaced);
        assert!(outcome.evicted.is_empty());
        assert_eq!(core.len(), 1);
        assert_eq!(core.memory_used(), json!("a much longer value").to_string().len());
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(2));
        put(&mut core, "a", json!(1), now);
        put(&mut core, "b", json!(2), now);
        let outcome = put(&mut core, "a", json!(3), now);

        assert!(outcome.evicted.is_empty());
        assert_eq!(core.len(), 2);
    }

    #[test]
    fn test_eviction_at_entry_limit() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(2));
        put(&mut core, "a", json!(1), now);
        put(&mut core, "b", json!(2), now);
        let outcome = put(&mut core, "c", json!(3), now);

        assert_eq!(outcome.evicted.len(), 1);
        assert_eq!(core.len(), 2);
        assert!(core.contains("c"));
    }

    #[test]
    fn test_eviction_for_memory() {
        let now = Instant::now();
        let mut core = CacheCore::new(&AdaptiveCacheConfig {
            max_size: 100,
            max_memory: 20,
            min_size: 1,
            ..Default::default()
        });
        put(&mut core, "a", json!("xxxxxxxx"), now); // 10 bytes
        put(&mut core, "b", json!("yyyyyyyy"), now); // 10 bytes
        let outcome = put(&mut core, "c", json!("zzzz"), now); // 6 bytes

        assert_eq!(outcome.evicted.len(), 1);
        assert!(core.memory_used() <= 20);
    }

    #[test]
    fn test_lru_mode_evicts_least_recent() {
        let now = Instant::now();
        let mut core: CacheCore<Value> = CacheCore::new(&AdaptiveCacheConfig {
            max_size: 2,
            min_size: 1,
            composite_eviction_enabled: false,
            ..Default::default()
        });
        put(&mut core, "a", json!(1), now);
        put(&mut core, "b", json!(2), now + Duration::from_secs(1));
        let _ = core.lookup("a", now + Duration::from_secs(2));

        let outcome = put(&mut core, "c", json!(3), now + Duration::from_secs(3));
        assert_eq!(outcome.evicted[0].key, "b");
    }

    #[test]
    fn test_expired_lookup_removes_entry() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(10));
        put(&mut core, "a", json!(1), now);

        let later = now + Duration::from_secs(61);
        assert!(matches!(core.lookup("a", later), Lookup::Expired { .. }));
        assert!(!core.contains("a"));
        assert_eq!(core.memory_used(), 0);
        let last = core.patterns().pattern("a").unwrap().events().last().unwrap().kind;
        assert_eq!(last, AccessKind::Expired);
    }

    #[test]
    fn test_affinity_linked_on_insert_and_unlinked_on_delete() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(10));
        put(&mut core, "user:42:profile", json!(1), now);
        let outcome = put(&mut core, "user:42:settings", json!(2), now);

        assert_eq!(outcome.links_created, 1);
        assert!(core.affinity().are_linked("user:42:profile", "user:42:settings"));

        core.delete("user:42:profile");
        assert!(!core.affinity().are_linked("user:42:settings", "user:42:profile"));
        assert!(core.patterns().pattern("user:42:profile").is_none());
    }

    #[test]
    fn test_hit_propagates_freshness_to_linked_keys() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(10));
        put(&mut core, "user:42:profile", json!(1), now);
        put(&mut core, "user:42:settings", json!(2), now);

        // Both decay for two half-lives, then only one is read
        let later = now + Duration::from_secs(600);
        let untouched = core.freshness_at("user:42:settings", later).unwrap();
        let _ = core.lookup("user:42:profile", later);

        let linked = core.freshness_at("user:42:settings", later).unwrap();
        assert!(linked > untouched, "{} should exceed {}", linked, untouched);
    }

    #[test]
    fn test_expire_and_trim() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(10));
        put(&mut core, "a", json!(1), now);
        let (entry, _) = CacheEntry::encode(json!(2), false, 1024);
        let mut rng = SmallRng::seed_from_u64(1);
        core.insert("b", entry, Duration::from_secs(3600), Priority::Normal, now, &mut rng);

        let later = now + Duration::from_secs(120);
        let expired = core.expire(later);
        assert_eq!(expired, vec![Evicted { key: "a".into(), stored_size: 1 }]);
        assert_eq!(core.len(), 1);

        assert_eq!(core.trim_patterns(later), 1);
        assert!(core.patterns().pattern("a").is_none());
        assert!(core.patterns().pattern("b").is_some());
    }

    #[test]
    fn test_tune_capacity_applies_new_size() {
        let mut core: CacheCore<Value> = CacheCore::new(&config(100));
        let tick = core.tune_capacity(0.0, true);
        assert_eq!(tick.previous_max_size, 100);
        assert_eq!(core.max_size(), 110);
    }

    #[test]
    fn test_snapshot_and_clear() {
        let now = Instant::now();
        let mut core = CacheCore::new(&config(10));
        put(&mut core, "a:1:x", json!(1), now);
        put(&mut core, "a:1:y", json!(2), now);

        let snap = core.snapshot(now);
        assert_eq!(snap.entry_count, 2);
        assert_eq!(snap.link_count, 1);
        assert_eq!(snap.pattern_count, 2);
        assert!((snap.avg_freshness - 1.0).abs() < 1e-9);

        core.clear();
        let snap = core.snapshot(now);
        assert_eq!(snap.entry_count, 0);
        assert_eq!(snap.memory_used, 0);
        assert_eq!(snap.link_count, 0);
        assert_eq!(snap.avg_freshness, 0.0);
    }
}
