//! Cache entry data structures.
//!
//! A [`CacheEntry`] owns the stored representation of one value (raw or
//! zstd-packed) and its size accounting. [`EntryMetadata`] carries the
//! per-key bookkeeping the eviction scorer reads: timestamps, access count,
//! TTL and priority.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::compression::{self, CompressionError};

/// Size charged for a value whose serialized size cannot be measured.
pub const DEFAULT_SIZE_ESTIMATE: usize = 1024;

/// Longest lifetime an entry can have (100 years). Larger TTLs are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Retention priority of an entry.
///
/// # Example
///
/// ```
/// use adaptive_cache::Priority;
///
/// assert_eq!(Priority::default(), Priority::Normal);
/// assert!(Priority::High.eviction_multiplier() < Priority::Low.eviction_multiplier());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Scales the eviction badness of an entry (smaller = better protected).
    #[must_use]
    pub fn eviction_multiplier(self) -> f64 {
        match self {
            Self::High => 0.5,
            Self::Normal => 1.0,
            Self::Low => 1.5,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Stored representation of a value.
#[derive(Debug, Clone)]
pub enum StoredValue<V> {
    Raw(V),
    Compressed(Vec<u8>),
}

/// Local recovery taken while encoding a value.
#[derive(Debug)]
pub enum EncodeFallback {
    /// Serialization failed; size charged as [`DEFAULT_SIZE_ESTIMATE`]
    Serialization(serde_json::Error),
    /// Compression failed or saved too little; stored raw
    Compression(CompressionError),
}

impl EncodeFallback {
    /// Metric label for this fallback.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Compression(_) => "compression",
        }
    }
}

/// A cached value with its size accounting.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: StoredValue<V>,
    original_size: usize,
    stored_size: usize,
}

impl<V> CacheEntry<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Encode a value for storage.
    ///
    /// Values whose serialized size exceeds `threshold` are compressed when
    /// `compress` is set. Never fails: problems are reported as an
    /// [`EncodeFallback`] alongside a usable entry.
    pub fn encode(value: V, compress: bool, threshold: usize) -> (Self, Option<EncodeFallback>) {
        let payload = match serde_json::to_vec(&value) {
            Ok(payload) => payload,
            Err(e) => {
                let entry = Self {
                    value: StoredValue::Raw(value),
                    original_size: DEFAULT_SIZE_ESTIMATE,
                    stored_size: DEFAULT_SIZE_ESTIMATE,
                };
                return (entry, Some(EncodeFallback::Serialization(e)));
            }
        };

        let original_size = payload.len();
        if !compress || original_size <= threshold {
            return (Self::raw(value, original_size), None);
        }

        match compression::compress_payload(&payload) {
            Ok((packed, stats)) => {
                let entry = Self {
                    value: StoredValue::Compressed(packed),
                    original_size,
                    stored_size: stats.compressed_bytes,
                };
                (entry, None)
            }
            Err(e) => (
                Self::raw(value, original_size),
                Some(EncodeFallback::Compression(e)),
            ),
        }
    }

    fn raw(value: V, size: usize) -> Self {
        Self {
            value: StoredValue::Raw(value),
            original_size: size,
            stored_size: size,
        }
    }

    /// Materialize the value, unpacking it if needed.
    pub fn load(&self) -> Result<V, CompressionError> {
        match &self.value {
            StoredValue::Raw(value) => Ok(value.clone()),
            StoredValue::Compressed(bytes) => compression::decompress_value(bytes, self.original_size),
        }
    }
}

impl<V> CacheEntry<V> {
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        matches!(self.value, StoredValue::Compressed(_))
    }

    /// Serialized size before compression
    #[must_use]
    pub fn original_size(&self) -> usize {
        self.original_size
    }

    /// Bytes charged against `max_memory`
    #[must_use]
    pub fn stored_size(&self) -> usize {
        self.stored_size
    }

    #[must_use]
    pub fn stored(&self) -> &StoredValue<V> {
        &self.value
    }
}

/// Per-key bookkeeping read by the eviction scorer.
#[derive(Debug, Clone)]
pub struct EntryMetadata {
    pub key: String,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
    pub ttl: Duration,
    pub priority: Priority,
    /// Always `created_at + ttl`
    pub expires_at: Instant,
    /// Mirrors the entry's stored size
    pub stored_size: usize,
}

impl EntryMetadata {
    /// `ttl` is clamped to [`MAX_TTL`], and further if `now + ttl` would not
    /// be representable, so `expires_at == created_at + ttl` always holds.
    pub fn new(key: String, ttl: Duration, priority: Priority, stored_size: usize, now: Instant) -> Self {
        let (ttl, expires_at) = expiry(now, ttl.min(MAX_TTL));
        Self {
            key,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            ttl,
            priority,
            expires_at,
            stored_size,
        }
    }

    pub fn record_access(&mut self, now: Instant) {
        self.last_accessed = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    /// True once `now` is strictly past `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    #[must_use]
    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed)
    }
}

/// Latest representable `now + ttl`, halving `ttl` until it fits.
fn expiry(now: Instant, mut ttl: Duration) -> (Duration, Instant) {
    loop {
        if let Some(at) = now.checked_add(ttl) {
            return (ttl, at);
        }
        ttl /= 2;
    }
}
