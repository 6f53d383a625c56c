//! Capacity controller.
//!
//! Observes the cache's hit rate and eviction pressure once per tick and
//! adjusts two knobs:
//!
//! ```text
//! avg(last 10 hit-rate samples) < target          and max_size < cap  → grow 10%
//! avg(last 10 hit-rate samples) > target + 0.1    and max_size > min  → shrink 10%
//!
//! evictions since last tick > 100  → composite weight += step
//! evictions since last tick < 10   → composite weight -= step
//! ```
//!
//! The composite weight blends the composite eviction score with the simple
//! recency/frequency score (see [`crate::eviction::CompositePolicy`]).

use std::collections::VecDeque;

/// Hit-rate samples kept in the rolling window.
pub const HIT_RATE_WINDOW: usize = 10;

/// Evictions per tick above which the composite scorer gains weight.
pub const HIGH_EVICTION_RATE: u64 = 100;

/// Evictions per tick below which the simple scorer gains weight.
pub const LOW_EVICTION_RATE: u64 = 10;

/// Margin above target before the cache shrinks.
const SHRINK_MARGIN: f64 = 0.1;

/// Blend between composite and simple eviction scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyMix {
    pub composite_weight: f64,
    pub step: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for StrategyMix {
    fn default() -> Self {
        Self {
            composite_weight: 0.7,
            step: 0.1,
            min_weight: 0.2,
            max_weight: 1.0,
        }
    }
}

impl StrategyMix {
    pub fn favour_composite(&mut self) {
        self.composite_weight = (self.composite_weight + self.step).min(self.max_weight);
    }

    pub fn favour_stability(&mut self) {
        self.composite_weight = (self.composite_weight - self.step).max(self.min_weight);
    }
}

/// Outcome of one controller tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityTick {
    pub average_hit_rate: f64,
    pub previous_max_size: usize,
    pub max_size: usize,
    /// Evictions counted since the previous tick
    pub evictions: u64,
    pub composite_weight: f64,
}

impl CapacityTick {
    #[must_use]
    pub fn resized(&self) -> bool {
        self.previous_max_size != self.max_size
    }
}

/// Rolling hit-rate and eviction-rate observer.
#[derive(Debug, Clone)]
pub struct CapacityController {
    target_hit_rate: f64,
    min_size: usize,
    max_size_cap: usize,
    samples: VecDeque<f64>,
    evictions_since_tick: u64,
    mix: StrategyMix,
}

impl CapacityController {
    pub fn new(target_hit_rate: f64, min_size: usize, max_size_cap: usize) -> Self {
        Self {
            target_hit_rate,
            min_size,
            max_size_cap,
            samples: VecDeque::with_capacity(HIT_RATE_WINDOW),
            evictions_since_tick: 0,
            mix: StrategyMix::default(),
        }
    }

    pub fn record_eviction(&mut self) {
        self.evictions_since_tick += 1;
    }

    #[must_use]
    pub fn evictions_since_tick(&self) -> u64 {
        self.evictions_since_tick
    }

    #[must_use]
    pub fn composite_weight(&self) -> f64 {
        self.mix.composite_weight
    }

    #[must_use]
    pub fn mix(&self) -> StrategyMix {
        self.mix
    }

    /// Mean of the samples in the window (0 when empty).
    #[must_use]
    pub fn average_hit_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Next size after growing 10%, never past the cap.
    #[must_use]
    pub fn grown(&self, current: usize) -> usize {
        let step = current.div_ceil(10).max(1);
        current.saturating_add(step).min(self.max_size_cap)
    }

    /// Next size after shrinking 10%, never below the floor.
    #[must_use]
    pub fn shrunk(&self, current: usize) -> usize {
        current.saturating_sub(current / 10).max(self.min_size)
    }

    /// Sample `hit_rate`, retune, and reset the eviction counter.
    ///
    /// `max_size` is left alone when `adjust_size` is false.
    pub fn tick(&mut self, hit_rate: f64, max_size: usize, adjust_size: bool) -> CapacityTick {
        if self.samples.len() == HIT_RATE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(hit_rate.clamp(0.0, 1.0));
        let average = self.average_hit_rate();

        let mut next = max_size;
        if adjust_size {
            if average < self.target_hit_rate && max_size < self.max_size_cap {
                next = self.grown(max_size);
            } else if average > self.target_hit_rate + SHRINK_MARGIN && max_size > self.min_size {
                next = self.shrunk(max_size);
            }
        }

        let evictions = std::mem::take(&mut self.evictions_since_tick);
        if evictions > HIGH_EVICTION_RATE {
            self.mix.favour_composite();
        } else if evictions < LOW_EVICTION_RATE {
            self.mix.favour_stability();
        }

        CapacityTick {
            average_hit_rate: average,
            previous_max_size: max_size,
            max_size: next,
            evictions,
            composite_weight: self.mix.composite_weight,
        }
    }
}
