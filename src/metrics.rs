// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the adaptive cache.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding process is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `adaptive_cache_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for sizes
//!
//! # Labels
//! - `operation`: get, set, delete, clear
//! - `status`: hit, miss, stored, rejected, removed, absent
//! - `reason`: capacity, expired
//! - `kind`: serialization, compression

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a cache operation outcome
pub fn record_operation(operation: &str, status: &str) {
    counter!(
        "adaptive_cache_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "adaptive_cache_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record entries removed to make room or because they expired
pub fn record_eviction(reason: &str, count: usize, bytes: usize) {
    counter!(
        "adaptive_cache_evictions_total",
        "reason" => reason.to_string()
    )
    .increment(count as u64);
    counter!(
        "adaptive_cache_evicted_bytes_total",
        "reason" => reason.to_string()
    )
    .increment(bytes as u64);
}

/// Record a local recovery while encoding a value
pub fn record_fallback(kind: &str) {
    counter!(
        "adaptive_cache_fallbacks_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record stored size against serialized size for a compressed value
pub fn record_compression(original_bytes: usize, stored_bytes: usize) {
    counter!("adaptive_cache_compressed_values_total").increment(1);
    histogram!("adaptive_cache_compression_saved_bytes")
        .record(original_bytes.saturating_sub(stored_bytes) as f64);
}

/// Set current entry count
pub fn set_entries(count: usize) {
    gauge!("adaptive_cache_entries").set(count as f64);
}

/// Set current stored bytes
pub fn set_memory_bytes(bytes: usize) {
    gauge!("adaptive_cache_memory_bytes").set(bytes as f64);
}

/// Set current entry limit
pub fn set_max_size(max_size: usize) {
    gauge!("adaptive_cache_max_size").set(max_size as f64);
}

/// Set cumulative hit rate (0.0 - 1.0)
pub fn set_hit_rate(hit_rate: f64) {
    gauge!("adaptive_cache_hit_rate").set(hit_rate);
}

/// Set composite scorer weight in the strategy mix (0.0 - 1.0)
pub fn set_composite_weight(weight: f64) {
    gauge!("adaptive_cache_composite_weight").set(weight);
}

/// Set affinity link count
pub fn set_affinity_links(count: usize) {
    gauge!("adaptive_cache_affinity_links").set(count as f64);
}

/// Set pressure level (0 = Normal, 1 = Elevated, 2 = High, 3 = Critical)
pub fn set_pressure_level(level: u8) {
    gauge!("adaptive_cache_pressure_level").set(level as f64);
}

/// Record lifecycle state transition
pub fn set_cache_state(state: &str) {
    gauge!(
        "adaptive_cache_state",
        "state" => state.to_string()
    )
    .set(1.0);
}

/// Record a capacity controller tick
pub fn record_capacity_tick(resized: bool) {
    let outcome = if resized { "resized" } else { "unchanged" };
    counter!(
        "adaptive_cache_capacity_ticks_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a maintenance run
pub fn record_maintenance(expired: usize, duration: Duration) {
    counter!("adaptive_cache_maintenance_runs_total").increment(1);
    counter!("adaptive_cache_maintenance_expired_total").increment(expired as u64);
    histogram!("adaptive_cache_maintenance_seconds").record(duration.as_secs_f64());
}

/// Record prefetch hints emitted by one scan
pub fn record_prefetch_hints(count: usize) {
    counter!("adaptive_cache_prefetch_hints_total").increment(count as u64);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
