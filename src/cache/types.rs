//! Public types for the adaptive cache.

use serde::Serialize;

use crate::pressure::PressureLevel;

/// Cache lifecycle state.
///
/// Use [`super::AdaptiveCache::state()`] to check the current state or
/// [`super::AdaptiveCache::state_receiver()`] to watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheState {
    /// Constructed, background tasks not started
    Created,
    /// Background tasks running
    Running,
    /// Stopping background tasks
    ShuttingDown,
    /// Tasks stopped and store cleared
    Stopped,
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Notification published on the cache's event channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Hit { key: String },
    Miss { key: String },
    Set { key: String, stored_size: usize, compressed: bool },
    Delete { key: String },
    /// Removed to make room for a new entry
    Eviction { key: String },
    MaintenanceCompleted {
        expired_count: usize,
        total_entries: usize,
        memory_usage: usize,
    },
    /// An uncached key is likely to be requested soon
    PrefetchRequest { key: String, confidence: f64 },
    Cleared,
    CapacityAdjusted { previous: usize, current: usize },
}

/// Summary of one maintenance pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub expired_count: usize,
    pub total_entries: usize,
    pub memory_usage: usize,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0 before the first lookup
    pub hit_rate: f64,
    pub sets: u64,
    pub evictions: u64,
    pub entry_count: usize,
    /// Stored bytes across all entries
    pub memory_used: usize,
    pub max_size: usize,
    /// Mean freshness score (0 when empty)
    pub avg_freshness: f64,
    /// Distinct affinity links
    pub link_count: usize,
    /// Keys with a recorded access log
    pub pattern_count: usize,
    /// Lookups and writes per second since construction
    pub ops_per_second: f64,
    /// Weight of the composite scorer in the eviction mix
    pub composite_weight: f64,
}

/// Health snapshot for readiness probes.
///
/// # Example
///
/// ```rust,ignore
/// let health = cache.health();
/// if !health.healthy {
///     tracing::warn!(pressure = %health.pressure, "cache under pressure");
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    /// Both utilizations below 0.9
    pub healthy: bool,
    pub memory_utilization: f64,
    pub size_utilization: f64,
    pub hit_rate: f64,
    /// Level for the higher of the two utilizations
    pub pressure: PressureLevel,
}
