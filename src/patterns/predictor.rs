//! Prefetch prediction from recorded access cadence.
//!
//! A key is a prefetch candidate when it has a regular request history, is
//! due again (time since its last request has reached most of its average
//! interval), and is no longer cached.

use std::time::Instant;

use serde::Serialize;

use super::recorder::AccessPatternRecorder;

/// A predicted upcoming request for an uncached key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefetchHint {
    pub key: String,
    pub confidence: f64,
}

/// Scans access patterns for keys likely to be requested soon.
#[derive(Debug, Clone)]
pub struct PrefetchPredictor {
    /// Requests needed before a key is considered
    pub min_accesses: usize,
    /// Fraction of the average interval after which a key is due
    pub due_ratio: f64,
    /// Confidence a hint must exceed
    pub min_confidence: f64,
    /// Added to regularity to form confidence
    pub confidence_bonus: f64,
    /// Upper bound on confidence
    pub max_confidence: f64,
    /// Hints kept per scan
    pub max_hints: usize,
}

impl Default for PrefetchPredictor {
    fn default() -> Self {
        Self {
            min_accesses: 3,
            due_ratio: 0.8,
            min_confidence: 0.7,
            confidence_bonus: 0.3,
            max_confidence: 0.9,
            max_hints: 5,
        }
    }
}

impl PrefetchPredictor {
    /// Produce hints, highest confidence first.
    pub fn predict<F>(&self, recorder: &AccessPatternRecorder, now: Instant, is_cached: F) -> Vec<PrefetchHint>
    where
        F: Fn(&str) -> bool,
    {
        let mut hints: Vec<PrefetchHint> = recorder
            .iter()
            .filter(|(key, _)| !is_cached(key))
            .filter(|(_, pattern)| pattern.access_count() >= self.min_accesses)
            .filter_map(|(key, pattern)| {
                let average = pattern.average_interval()?;
                let last = pattern.last_access()?;
                let elapsed = now.saturating_duration_since(last);
                if elapsed.as_secs_f64() < self.due_ratio * average.as_secs_f64() {
                    return None;
                }
                let confidence = (pattern.regularity() + self.confidence_bonus).min(self.max_confidence);
                (confidence > self.min_confidence).then(|| PrefetchHint {
                    key: key.to_owned(),
                    confidence,
                })
            })
            .collect();

        hints.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        hints.truncate(self.max_hints);
        hints
    }
}
