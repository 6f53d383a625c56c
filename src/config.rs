//! Configuration for the adaptive cache.
//!
//! # Example
//!
//! ```
//! use adaptive_cache::AdaptiveCacheConfig;
//!
//! // Minimal config (uses defaults)
//! let config = AdaptiveCacheConfig::default();
//! assert_eq!(config.max_size, 10_000);
//! assert!(config.validate().is_ok());
//!
//! // Small cache without the background capacity controller
//! let config = AdaptiveCacheConfig {
//!     max_size: 100,
//!     max_memory: 1024 * 1024, // 1 MB
//!     adaptive_size: false,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::entry::MAX_TTL;

/// Longest accepted background task period (one week).
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Invalid configuration, reported when the cache is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_size must be greater than zero")]
    ZeroMaxSize,
    #[error("max_memory must be greater than zero")]
    ZeroMaxMemory,
    #[error("ttl_secs must be greater than zero")]
    ZeroTtl,
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("min_size ({min}) exceeds max_size_cap ({cap})")]
    InvertedBounds { min: usize, cap: usize },
    #[error("{name} must be within (0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("{name} must be at most {max} seconds, got {secs}")]
    TooLong { name: &'static str, secs: u64, max: u64 },
    #[error("event_channel_capacity must be greater than zero")]
    ZeroEventCapacity,
}

/// Configuration for the adaptive cache.
///
/// All fields have defaults, so a config can be deserialized from a partial
/// document or built with struct-update syntax.
#[derive(Debug, Clone, Deserialize)]
pub struct AdaptiveCacheConfig {
    /// Maximum number of entries (starting value when `adaptive_size` is on)
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Maximum stored bytes across all entries (default: 100 MB)
    #[serde(default = "default_max_memory")]
    pub max_memory: usize,

    /// Default per-entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Compress values larger than `compression_threshold_bytes`
    #[serde(default = "default_true")]
    pub compression_enabled: bool,
    #[serde(default = "default_compression_threshold_bytes")]
    pub compression_threshold_bytes: usize,

    /// Run the capacity controller
    #[serde(default = "default_true")]
    pub adaptive_size: bool,

    /// Run the prefetch predictor
    #[serde(default = "default_true")]
    pub prefetch_enabled: bool,

    /// Composite scoring (false = plain LRU)
    #[serde(default = "default_true")]
    pub composite_eviction_enabled: bool,

    /// Capacity controller bounds for `max_size`
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    #[serde(default = "default_max_size_cap")]
    pub max_size_cap: usize,

    /// Hit rate the capacity controller steers toward
    #[serde(default = "default_target_hit_rate")]
    pub target_hit_rate: f64,

    /// Background task intervals
    #[serde(default = "default_capacity_interval_secs")]
    pub capacity_interval_secs: u64,
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
    #[serde(default = "default_prefetch_interval_secs")]
    pub prefetch_interval_secs: u64,

    /// Time for an untouched freshness score to halve
    #[serde(default = "default_freshness_half_life_secs")]
    pub freshness_half_life_secs: u64,

    /// Identifier similarity above which keys are linked
    #[serde(default = "default_affinity_threshold")]
    pub affinity_threshold: f64,

    /// Buffered events per subscriber before lagging
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_max_size() -> usize { 10_000 }
fn default_max_memory() -> usize { 100 * 1024 * 1024 } // 100 MB
fn default_ttl_secs() -> u64 { 3600 }
fn default_true() -> bool { true }
fn default_compression_threshold_bytes() -> usize { 1024 }
fn default_min_size() -> usize { 1000 }
fn default_max_size_cap() -> usize { 50_000 }
fn default_target_hit_rate() -> f64 { 0.8 }
fn default_capacity_interval_secs() -> u64 { 120 }
fn default_maintenance_interval_secs() -> u64 { 300 }
fn default_prefetch_interval_secs() -> u64 { 30 }
fn default_freshness_half_life_secs() -> u64 { 300 }
fn default_affinity_threshold() -> f64 { 0.7 }
fn default_event_channel_capacity() -> usize { 1024 }

impl Default for AdaptiveCacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            max_memory: default_max_memory(),
            ttl_secs: default_ttl_secs(),
            compression_enabled: true,
            compression_threshold_bytes: default_compression_threshold_bytes(),
            adaptive_size: true,
            prefetch_enabled: true,
            composite_eviction_enabled: true,
            min_size: default_min_size(),
            max_size_cap: default_max_size_cap(),
            target_hit_rate: default_target_hit_rate(),
            capacity_interval_secs: default_capacity_interval_secs(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
            prefetch_interval_secs: default_prefetch_interval_secs(),
            freshness_half_life_secs: default_freshness_half_life_secs(),
            affinity_threshold: default_affinity_threshold(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl AdaptiveCacheConfig {
    /// Check every field that would leave the cache unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        if self.max_memory == 0 {
            return Err(ConfigError::ZeroMaxMemory);
        }
        if self.ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if self.ttl_secs > MAX_TTL.as_secs() {
            return Err(ConfigError::TooLong {
                name: "ttl_secs",
                secs: self.ttl_secs,
                max: MAX_TTL.as_secs(),
            });
        }
        for (name, secs) in [
            ("capacity_interval_secs", self.capacity_interval_secs),
            ("maintenance_interval_secs", self.maintenance_interval_secs),
            ("prefetch_interval_secs", self.prefetch_interval_secs),
            ("freshness_half_life_secs", self.freshness_half_life_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        for (name, secs) in [
            ("capacity_interval_secs", self.capacity_interval_secs),
            ("maintenance_interval_secs", self.maintenance_interval_secs),
            ("prefetch_interval_secs", self.prefetch_interval_secs),
        ] {
            if secs > MAX_INTERVAL_SECS {
                return Err(ConfigError::TooLong { name, secs, max: MAX_INTERVAL_SECS });
            }
        }
        if self.min_size > self.max_size_cap {
            return Err(ConfigError::InvertedBounds {
                min: self.min_size,
                cap: self.max_size_cap,
            });
        }
        for (name, value) in [
            ("target_hit_rate", self.target_hit_rate),
            ("affinity_threshold", self.affinity_threshold),
        ] {
            // NaN fails both comparisons
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        Ok(())
    }

    /// Default entry lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub fn capacity_interval(&self) -> Duration {
        Duration::from_secs(self.capacity_interval_secs)
    }

    #[must_use]
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    #[must_use]
    pub fn prefetch_interval(&self) -> Duration {
        Duration::from_secs(self.prefetch_interval_secs)
    }

    #[must_use]
    pub fn freshness_half_life(&self) -> Duration {
        Duration::from_secs(self.freshness_half_life_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AdaptiveCacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_size, 1000);
        assert_eq!(config.max_size_cap, 50_000);
        assert_eq!(config.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: AdaptiveCacheConfig =
            serde_json::from_str(r#"{"max_size": 64, "compression_enabled": false}"#).unwrap();
        assert_eq!(config.max_size, 64);
        assert!(!config.compression_enabled);
        assert_eq!(config.max_memory, 100 * 1024 * 1024);
        assert!(config.composite_eviction_enabled);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = AdaptiveCacheConfig { max_size: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxSize));

        let config = AdaptiveCacheConfig { max_memory: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxMemory));
    }

    #[test]
    fn test_rejects_zero_ttl_and_intervals() {
        let config = AdaptiveCacheConfig { ttl_secs: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTtl));

        let config = AdaptiveCacheConfig { prefetch_interval_secs: 0, ..Default::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval("prefetch_interval_secs"))
        );
    }

    #[test]
    fn test_validate_rejects_huge_interval() {
        let config = AdaptiveCacheConfig { maintenance_interval_secs: u64::MAX, ..Default::default() };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooLong {
                name: "maintenance_interval_secs",
                secs: u64::MAX,
                max: MAX_INTERVAL_SECS,
            })
        );

        let config = AdaptiveCacheConfig { prefetch_interval_secs: MAX_INTERVAL_SECS, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_ttl() {
        let config = AdaptiveCacheConfig { ttl_secs: u64::MAX, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLong { name: "ttl_secs", .. })
        ));

        let config = AdaptiveCacheConfig { ttl_secs: MAX_TTL.as_secs(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = AdaptiveCacheConfig {
            min_size: 500,
            max_size_cap: 100,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedBounds { min: 500, cap: 100 })
        );
    }

    #[test]
    fn test_rejects_out_of_range_ratios() {
        let config = AdaptiveCacheConfig { target_hit_rate: 1.5, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "target_hit_rate", .. })
        ));

        let config = AdaptiveCacheConfig { affinity_threshold: f64::NAN, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "affinity_threshold", .. })
        ));
    }
}
