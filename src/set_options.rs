//! Per-call options for [`AdaptiveCache::set`](crate::AdaptiveCache::set).
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use adaptive_cache::{SetOptions, Priority};
//!
//! // Defaults: config TTL, compression per config, normal priority
//! let opts = SetOptions::default();
//! assert!(opts.ttl.is_none());
//!
//! // Short-lived, never compressed, protected from eviction
//! let opts = SetOptions::default()
//!     .with_ttl(Duration::from_secs(30))
//!     .with_compression(false)
//!     .with_priority(Priority::High);
//! assert_eq!(opts.priority, Priority::High);
//! ```

use std::time::Duration;

use crate::entry::Priority;

/// Options for a single `set` call.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Entry lifetime. `None` (or zero) uses the configured default TTL.
    pub ttl: Option<Duration>,

    /// Per-call compression switch. `None` follows the config; `Some(false)`
    /// disables compression for this value. `Some(true)` cannot enable it
    /// when the config turns compression off.
    pub compress: Option<bool>,

    /// Retention priority used by the eviction scorer.
    pub priority: Priority,
}

impl SetOptions {
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// TTL to apply given the configured default.
    #[must_use]
    pub fn effective_ttl(&self, default_ttl: Duration) -> Duration {
        match self.ttl {
            Some(ttl) if !ttl.is_zero() => ttl,
            _ => default_ttl,
        }
    }

    /// Whether this value may be compressed given the config switch.
    #[must_use]
    pub fn allows_compression(&self, config_enabled: bool) -> bool {
        config_enabled && self.compress.unwrap_or(true)
    }
}
