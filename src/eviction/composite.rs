// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::entry::Priority;

/// Point-in-time view of one cached key for eviction scoring.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub key: String,
    pub age: Duration,
    pub idle: Duration,
    pub ttl: Duration,
    pub last_accessed: Instant,
    pub access_count: u64,
    pub priority: Priority,
    /// Decayed freshness score in `[0, 1]`
    pub freshness: f64,
    /// Affinity strength in `[0, 1]`
    pub affinity: f64,
    /// Access regularity in `[0, 1]`
    pub regularity: f64,
}

impl Candidate {
    /// Age as a fraction of the entry's TTL, capped at 1.
    #[must_use]
    pub fn age_norm(&self) -> f64 {
        ratio_of_ttl(self.age, self.ttl)
    }

    /// Idle time as a fraction of the entry's TTL, capped at 1.
    #[must_use]
    pub fn idle_norm(&self) -> f64 {
        ratio_of_ttl(self.idle, self.ttl)
    }

    /// Log-scaled access count relative to the busiest candidate.
    #[must_use]
    pub fn frequency_norm(&self, max_access_count: u64) -> f64 {
        if self.access_count == 0 || max_access_count == 0 {
            return 0.0;
        }
        let count = self.access_count.min(max_access_count) as f64;
        (1.0 + count).ln() / (1.0 + max_access_count as f64).ln()
    }
}

fn ratio_of_ttl(d: Duration, ttl: Duration) -> f64 {
    let ttl = ttl.as_secs_f64();
    if ttl <= 0.0 {
        return 1.0;
    }
    (d.as_secs_f64() / ttl).min(1.0)
}

/// Weights of the composite badness terms. Sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub age: f64,
    pub idle: f64,
    pub frequency: f64,
    pub freshness: f64,
    pub affinity: f64,
    pub regularity: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            age: 0.20,
            idle: 0.25,
            frequency: 0.20,
            freshness: 0.15,
            affinity: 0.10,
            regularity: 0.10,
        }
    }
}

/// Composite eviction policy.
///
/// Combines six badness terms, scales them by priority and inverts the result
/// so that `0.0` = evict first and `1.0` = keep.
#[derive(Debug, Clone)]
pub struct CompositePolicy {
    pub weights: ScoreWeights,
    /// Share of the candidate window drawn from at random
    pub candidate_fraction: f64,
    /// Upper bound on the window before the fraction applies
    pub candidate_window: usize,
}

impl Default for CompositePolicy {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            candidate_fraction: 0.3,
            candidate_window: 10,
        }
    }
}

impl CompositePolicy {
    /// Weighted badness in `[0, 1]` before the priority multiplier.
    #[must_use]
    pub fn badness(&self, c: &Candidate, max_access_count: u64) -> f64 {
        let w = &self.weights;
        w.age * c.age_norm()
            + w.idle * c.idle_norm()
            + w.frequency * (1.0 - c.frequency_norm(max_access_count))
            + w.freshness * (1.0 - c.freshness.clamp(0.0, 1.0))
            + w.affinity * (1.0 - c.affinity.clamp(0.0, 1.0))
            + w.regularity * (1.0 - c.regularity.clamp(0.0, 1.0))
    }

    /// Composite retention score (0.0 = evict first, 1.0 = keep).
    #[must_use]
    pub fn composite_score(&self, c: &Candidate, max_access_count: u64) -> f64 {
        let badness = c.priority.eviction_multiplier() * self.badness(c, max_access_count);
        (1.0 - badness).clamp(0.0, 1.0)
    }

    /// Recency/frequency-only retention score used for stability.
    #[must_use]
    pub fn simple_score(&self, c: &Candidate, max_access_count: u64) -> f64 {
        let badness = 0.5 * c.idle_norm() + 0.5 * (1.0 - c.frequency_norm(max_access_count));
        (1.0 - c.priority.eviction_multiplier() * badness).clamp(0.0, 1.0)
    }

    /// Blend of composite and simple scores; `composite_weight` in `[0, 1]`.
    #[must_use]
    pub fn calculate_score(&self, c: &Candidate, max_access_count: u64, composite_weight: f64) -> f64 {
        let w = composite_weight.clamp(0.0, 1.0);
        w * self.composite_score(c, max_access_count) + (1.0 - w) * self.simple_score(c, max_access_count)
    }

    /// Candidates drawn from when `remaining` keys are left.
    #[must_use]
    pub fn pool_size(&self, remaining: usize) -> usize {
        let window = remaining.min(self.candidate_window) as f64;
        ((self.candidate_fraction * window).floor() as usize)
            .max(1)
            .min(remaining)
    }

    /// Rank candidates by score, lowest first.
    #[must_use]
    pub fn rank(&self, candidates: &[Candidate], composite_weight: f64) -> Vec<(String, f64)> {
        let max_access_count = candidates.iter().map(|c| c.access_count).max().unwrap_or(0);
        let mut scored: Vec<_> = candidates
            .iter()
            .map(|c| (c.key.clone(), self.calculate_score(c, max_access_count, composite_weight)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    /// Ranked victim queue over a snapshot.
    #[must_use]
    pub fn victim_queue(&self, candidates: &[Candidate], composite_weight: f64) -> VictimQueue {
        let ranked = self.rank(candidates, composite_weight)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        VictimQueue {
            ranked,
            policy: Some(self.clone()),
        }
    }
}

/// Victims ranked from one snapshot, drained one at a time.
#[derive(Debug, Clone)]
pub struct VictimQueue {
    ranked: Vec<String>,
    /// `None` = strict order (LRU)
    policy: Option<CompositePolicy>,
}

impl VictimQueue {
    /// Strict least-recently-used order.
    #[must_use]
    pub fn lru(candidates: &[Candidate]) -> Self {
        let mut ordered: Vec<&Candidate> = candidates.iter().collect();
        ordered.sort_by_key(|c| c.last_accessed);
        Self {
            ranked: ordered.into_iter().map(|c| c.key.clone()).collect(),
            policy: None,
        }
    }

    /// Next victim, or `None` once the snapshot is exhausted.
    pub fn next_victim<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.ranked.is_empty() {
            return None;
        }
        let index = match &self.policy {
            Some(policy) => rng.gen_range(0..policy.pool_size(self.ranked.len())),
            None => 0,
        };
        Some(self.ranked.remove(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}
