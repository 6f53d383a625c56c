// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded per-key access logs.
//!
//! Each key keeps its last [`MAX_EVENTS`] events. Requests (hits, misses and
//! sets) feed the interval statistics; expiry events are kept for the record
//! but ignored when measuring cadence.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Events retained per key.
pub const MAX_EVENTS: usize = 50;

/// Age after which events are purged by maintenance.
pub const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Hit,
    Miss,
    Set,
    Expired,
}

impl AccessKind {
    /// Whether this event is a request for the key.
    #[must_use]
    pub fn is_access(self) -> bool {
        !matches!(self, Self::Expired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessEvent {
    pub at: Instant,
    pub kind: AccessKind,
}

/// Ordered, bounded event log for one key.
#[derive(Debug, Clone, Default)]
pub struct AccessPattern {
    events: VecDeque<AccessEvent>,
}

impl AccessPattern {
    pub fn record(&mut self, kind: AccessKind, at: Instant) {
        if self.events.len() == MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(AccessEvent { at, kind });
    }

    pub fn events(&self) -> impl Iterator<Item = &AccessEvent> {
        self.events.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn access_times(&self) -> impl Iterator<Item = Instant> + '_ {
        self.events.iter().filter(|e| e.kind.is_access()).map(|e| e.at)
    }

    /// Number of request events (expiries excluded).
    #[must_use]
    pub fn access_count(&self) -> usize {
        self.access_times().count()
    }

    #[must_use]
    pub fn last_access(&self) -> Option<Instant> {
        self.access_times().last()
    }

    fn intervals(&self) -> Vec<f64> {
        let times: Vec<Instant> = self.access_times().collect();
        times
            .windows(2)
            .map(|pair| pair[1].saturating_duration_since(pair[0]).as_secs_f64())
            .collect()
    }

    /// Mean time between requests; needs at least two requests.
    #[must_use]
    pub fn average_interval(&self) -> Option<Duration> {
        let intervals = self.intervals();
        if intervals.is_empty() {
            return None;
        }
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        Some(Duration::from_secs_f64(mean))
    }

    /// `1 − variance / mean²` of the request intervals, clamped to `[0, 1]`.
    ///
    /// Zero with fewer than two intervals or a zero mean.
    #[must_use]
    pub fn regularity(&self) -> f64 {
        let intervals = self.intervals();
        if intervals.len() < 2 {
            return 0.0;
        }
        let n = intervals.len() as f64;
        let mean = intervals.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return 0.0;
        }
        let variance = intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / n;
        (1.0 - variance / (mean * mean)).clamp(0.0, 1.0)
    }

    /// Drop events older than `max_age`. Returns how many were dropped.
    pub fn purge_older_than(&mut self, now: Instant, max_age: Duration) -> usize {
        let before = self.events.len();
        while let Some(front) = self.events.front() {
            if now.saturating_duration_since(front.at) > max_age {
                self.events.pop_front();
            } else {
                break;
            }
        }
        before - self.events.len()
    }
}

/// Access logs for every key seen recently, cached or not.
#[derive(Debug, Clone, Default)]
pub struct AccessPatternRecorder {
    patterns: HashMap<String, AccessPattern>,
}

impl AccessPatternRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str, kind: AccessKind, at: Instant) {
        match self.patterns.get_mut(key) {
            Some(pattern) => pattern.record(kind, at),
            None => {
                let mut pattern = AccessPattern::default();
                pattern.record(kind, at);
                self.patterns.insert(key.to_owned(), pattern);
            }
        }
    }

    #[must_use]
    pub fn pattern(&self, key: &str) -> Option<&AccessPattern> {
        self.patterns.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AccessPattern)> {
        self.patterns.iter().map(|(k, p)| (k.as_str(), p))
    }

    /// Regularity of a key's requests (0 when unknown).
    #[must_use]
    pub fn regularity(&self, key: &str) -> f64 {
        self.patterns.get(key).map_or(0.0, AccessPattern::regularity)
    }

    pub fn remove(&mut self, key: &str) {
        self.patterns.remove(key);
    }

    /// Purge events older than [`RETENTION`] and logs of keys rejected by
    /// `keep`. Returns the number of logs dropped.
    pub fn trim<F>(&mut self, now: Instant, keep: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let before = self.patterns.len();
        self.patterns.retain(|key, pattern| {
            pattern.purge_older_than(now, RETENTION);
            !pattern.is_empty() && keep(key)
        });
        before - self.patterns.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_at(base: Instant, offsets_secs: &[u64]) -> AccessPattern {
        let mut pattern = AccessPattern::default();
        for secs in offsets_secs {
            pattern.record(AccessKind::Hit, base + Duration::from_secs(*secs));
        }
        pattern
    }

    #[test]
    fn test_log_is_bounded() {
        let base = Instant::now();
        let mut pattern = AccessPattern::default();
        for i in 0..(MAX_EVENTS as u64 + 10) {
            pattern.record(AccessKind::Hit, base + Duration::from_secs(i));
        }
        assert_eq!(pattern.len(), MAX_EVENTS);
        // Oldest events were dropped
        let first = pattern.events().next().unwrap();
        assert_eq!(first.at, base + Duration::from_secs(10));
    }

    #[test]
    fn test_average_interval() {
        let base = Instant::now();
        let pattern = pattern_at(base, &[0, 10, 20, 30]);
        assert_eq!(pattern.average_interval(), Some(Duration::from_secs(10)));

        let single = pattern_at(base, &[0]);
        assert_eq!(single.average_interval(), None);
    }

    #[test]
    fn test_regular_pattern_scores_high() {
        let base = Instant::now();
        let pattern = pattern_at(base, &[0, 60, 120, 180, 240]);
        assert!((pattern.regularity() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_irregular_pattern_scores_low() {
        let base = Instant::now();
        let pattern = pattern_at(base, &[0, 1, 100, 101, 400]);
        assert!(pattern.regularity() < 0.4, "got {}", pattern.regularity());
    }

    #[test]
    fn test_expired_events_ignored_for_cadence() {
        let base = Instant::now();
        let mut pattern = pattern_at(base, &[0, 10, 20]);
        pattern.record(AccessKind::Expired, base + Duration::from_secs(21));

        assert_eq!(pattern.access_count(), 3);
        assert_eq!(pattern.last_access(), Some(base + Duration::from_secs(20)));
        assert_eq!(pattern.average_interval(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_purge_older_than() {
        let base = Instant::now();
        let mut pattern = pattern_at(base, &[0, 100, 200]);
        let dropped = pattern.purge_older_than(base + Duration::from_secs(250), Duration::from_secs(120));
        assert_eq!(dropped, 2);
        assert_eq!(pattern.len(), 1);
    }

    #[test]
    fn test_recorder_trim_drops_unkept_and_stale() {
        let base = Instant::now();
        let mut recorder = AccessPatternRecorder::new();
        recorder.record("cached", AccessKind::Set, base);
        recorder.record("gone", AccessKind::Set, base);
        recorder.record("stale", AccessKind::Set, base);

        let later = base + RETENTION + Duration::from_secs(1);
        recorder.record("cached", AccessKind::Hit, later);

        let dropped = recorder.trim(later, |key| key != "gone");
        assert_eq!(dropped, 2);
        assert!(recorder.pattern("cached").is_some());
        assert_eq!(recorder.pattern("cached").unwrap().len(), 1);
        assert!(recorder.pattern("gone").is_none());
        assert!(recorder.pattern("stale").is_none());
    }

    #[test]
    fn test_recorder_regularity_unknown_key() {
        let recorder = AccessPatternRecorder::new();
        assert_eq!(recorder.regularity("missing"), 0.0);
    }
}
