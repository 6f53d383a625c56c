//! # Adaptive Cache
//!
//! A bounded in-memory key-value cache that decides what to keep with a
//! multi-factor eviction score and retunes its own capacity from observed
//! hit rate and eviction pressure.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     AdaptiveCache API                       │
//! │  • get / set / delete / clear                              │
//! │  • stats, health, event stream                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                     (single mutex per cache)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Entry Store                          │
//! │  • Values (raw or zstd-packed) + metadata                  │
//! │  • Freshness signal, affinity links, access logs           │
//! │  • Composite-score eviction (LRU fallback)                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                    (periodic tokio tasks)
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Background Tasks                        │
//! │  • Maintenance: expiry, freshness decay, log trimming      │
//! │  • Capacity controller: resize + scoring mix               │
//! │  • Prefetch predictor: hints for due, uncached keys        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adaptive_cache::{AdaptiveCache, AdaptiveCacheConfig, CacheEvent, SetOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AdaptiveCacheConfig {
//!         max_size: 1_000,
//!         ..Default::default()
//!     };
//!     let cache: AdaptiveCache = AdaptiveCache::new(config).expect("valid config");
//!     let mut events = cache.subscribe();
//!
//!     // Start maintenance, capacity and prefetch tasks
//!     cache.initialize();
//!
//!     cache.set("user:42:profile", json!({"name": "Ada"}), SetOptions::default());
//!     cache.set("user:42:settings", json!({"theme": "dark"}), SetOptions::default());
//!
//!     if let Some(profile) = cache.get("user:42:profile") {
//!         println!("Found: {}", profile);
//!     }
//!
//!     while let Ok(event) = events.try_recv() {
//!         if let CacheEvent::Eviction { key } = event {
//!             println!("evicted {}", key);
//!         }
//!     }
//!
//!     cache.shutdown().await;
//! }
//! ```
//!
//! ## Features
//!
//! - **Composite Eviction**: age, idle time, frequency, freshness, affinity
//!   and access regularity, scaled by priority
//! - **Affinity Links**: keys with similar identifiers share freshness
//! - **Adaptive Capacity**: entry limit follows the hit rate within bounds
//! - **Compression**: large values packed with zstd (`compression` feature)
//! - **Prefetch Hints**: regular, due, uncached keys announced as events
//!
//! ## Configuration
//!
//! See [`AdaptiveCacheConfig`] for all configuration options.
//!
//! ## Modules
//!
//! - [`cache`]: The main [`AdaptiveCache`] orchestrating all components
//! - [`eviction`]: Composite scoring and victim selection
//! - [`capacity`]: Hit-rate driven capacity controller
//! - [`affinity`]: Related-key links
//! - [`freshness`]: Decaying per-key freshness signal
//! - [`patterns`]: Access logs and prefetch prediction
//! - [`pressure`]: Utilization pressure levels

pub mod affinity;
pub mod cache;
pub mod capacity;
pub mod compression;
pub mod config;
pub mod entry;
pub mod eviction;
pub mod freshness;
pub mod metrics;
pub mod patterns;
pub mod pressure;
pub mod set_options;

pub use cache::{
    AdaptiveCache, CacheEvent, CacheHealth, CacheState, CacheStats, CacheValue, MaintenanceReport,
};
pub use capacity::{CapacityController, CapacityTick, StrategyMix};
pub use config::{AdaptiveCacheConfig, ConfigError};
pub use entry::{CacheEntry, EntryMetadata, Priority, DEFAULT_SIZE_ESTIMATE, MAX_TTL};
pub use eviction::{CompositePolicy, ScoreWeights};
pub use patterns::PrefetchHint;
pub use pressure::PressureLevel;
pub use set_options::SetOptions;
pub use metrics::LatencyTimer;
