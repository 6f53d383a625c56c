//! Per-key freshness signal.
//!
//! A decaying stability score in `[0, 1]`: it is reset to 1 on write, nudged
//! up on every hit, and decays exponentially with the configured half-life
//! while the key is untouched. `phase` cycles through `[0, 1)` as the key is
//! accessed, and `amplitude` tracks how intense recent activity has been;
//! busier keys recover freshness faster on each hit.

use std::time::{Duration, Instant};

/// Score added per hit before the amplitude bonus.
pub const ACCESS_BOOST: f64 = 0.1;

/// Phase advance per hit.
const PHASE_STEP: f64 = 0.1;

/// Amplitude gained per hit.
const AMPLITUDE_STEP: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessState {
    pub score: f64,
    pub phase: f64,
    pub amplitude: f64,
    pub last_update: Instant,
}

impl FreshnessState {
    /// State for a freshly written key.
    pub fn new(now: Instant) -> Self {
        Self {
            score: 1.0,
            phase: 0.0,
            amplitude: 0.0,
            last_update: now,
        }
    }

    /// Decay factor for `elapsed` given a half-life.
    #[must_use]
    pub fn decay_factor(elapsed: Duration, half_life: Duration) -> f64 {
        let half_life = half_life.as_secs_f64();
        if half_life <= 0.0 {
            return 0.0;
        }
        (-std::f64::consts::LN_2 * elapsed.as_secs_f64() / half_life).exp()
    }

    /// Apply decay for the time since the last update.
    pub fn decay(&mut self, now: Instant, half_life: Duration) {
        let elapsed = now.saturating_duration_since(self.last_update);
        let factor = Self::decay_factor(elapsed, half_life);
        self.score *= factor;
        self.amplitude *= factor;
        self.last_update = now;
    }

    /// Score as of `now` without mutating.
    #[must_use]
    pub fn score_at(&self, now: Instant, half_life: Duration) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_update);
        self.score * Self::decay_factor(elapsed, half_life)
    }

    /// Decay, then boost for a hit.
    pub fn record_access(&mut self, now: Instant, half_life: Duration) {
        self.decay(now, half_life);
        let boost = ACCESS_BOOST * (1.0 + self.amplitude);
        self.score = (self.score + boost).min(1.0);
        self.amplitude = (self.amplitude + AMPLITUDE_STEP).min(1.0);
        self.phase = (self.phase + PHASE_STEP).fract();
    }

    /// Full refresh on overwrite; keeps phase and amplitude.
    pub fn record_write(&mut self, now: Instant) {
        self.score = 1.0;
        self.last_update = now;
    }

    /// Move this state `fraction` of the way toward `source`.
    pub fn pull_toward(&mut self, source: &FreshnessState, fraction: f64) {
        self.score = (self.score + fraction * (source.score - self.score)).clamp(0.0, 1.0);
        self.phase = (self.phase + fraction * (source.phase - self.phase)).clamp(0.0, 1.0);
    }
}
