// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Value compression for large cache entries.
//!
//! Values above the configured threshold are serialized to JSON and packed
//! with zstd. The packed form is only kept when it saves at least
//! [`MIN_SAVINGS`] of the serialized size; otherwise the caller stores the raw
//! value and records a compression fallback.
//!
//! # Feature Flag
//!
//! zstd is behind the default `compression` feature. Without it every attempt
//! returns [`CompressionError::Unavailable`] and values are stored raw.
//!
//! # Example
//!
//! ```rust,ignore
//! use adaptive_cache::compression::{compress_payload, decompress_value};
//! use serde_json::{json, Value};
//!
//! let payload = serde_json::to_vec(&json!({"rows": vec!["row"; 500]}))?;
//! let (packed, stats) = compress_payload(&payload)?;
//! assert!(stats.savings > 0.1);
//! let value: Value = decompress_value(&packed, payload.len())?;
//! ```

use serde::de::DeserializeOwned;

/// Zstd magic bytes (little-endian): 0xFD2FB528
#[cfg(feature = "compression")]
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default compression level (3 is a good balance of speed/ratio)
#[cfg(feature = "compression")]
const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Smallest saving (fraction of the serialized size) worth storing compressed.
pub const MIN_SAVINGS: f64 = 0.1;

/// Compression error types
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// Failed to compress data
    #[error("compression failed: {0}")]
    CompressFailed(String),

    /// Failed to decompress data
    #[error("decompression failed: {0}")]
    DecompressFailed(String),

    /// Compressed form is not meaningfully smaller
    #[error("compression saved {savings:.3} of the payload, below the minimum")]
    NotWorthwhile { savings: f64 },

    /// Crate built without the `compression` feature
    #[error("compression support not compiled in")]
    Unavailable,

    /// Failed to decode the decompressed JSON
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compression statistics for a single payload.
#[derive(Debug, Clone, Copy)]
pub struct CompressionStats {
    /// Original size in bytes
    pub original_bytes: usize,
    /// Compressed size in bytes
    pub compressed_bytes: usize,
    /// Compression ratio (original / compressed)
    pub ratio: f64,
    /// Space saved as a fraction (0.0 - 1.0)
    pub savings: f64,
}

impl CompressionStats {
    /// Calculate stats from original and compressed sizes.
    #[must_use]
    pub fn new(original_bytes: usize, compressed_bytes: usize) -> Self {
        let ratio = if compressed_bytes > 0 {
            original_bytes as f64 / compressed_bytes as f64
        } else {
            0.0
        };
        let savings = if original_bytes > 0 {
            1.0 - (compressed_bytes as f64 / original_bytes as f64)
        } else {
            0.0
        };
        Self {
            original_bytes,
            compressed_bytes,
            ratio,
            savings,
        }
    }
}

/// Check if data is zstd-compressed by checking magic bytes.
#[cfg(feature = "compression")]
#[inline]
#[must_use]
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZSTD_MAGIC
}

/// Compress a serialized payload, rejecting results that save too little.
#[cfg(feature = "compression")]
pub fn compress_payload(payload: &[u8]) -> Result<(Vec<u8>, CompressionStats), CompressionError> {
    let packed = zstd::encode_all(payload, DEFAULT_COMPRESSION_LEVEL)
        .map_err(|e| CompressionError::CompressFailed(e.to_string()))?;

    let stats = CompressionStats::new(payload.len(), packed.len());
    if stats.savings < MIN_SAVINGS {
        return Err(CompressionError::NotWorthwhile { savings: stats.savings });
    }
    Ok((packed, stats))
}

/// Unpack a payload produced by [`compress_payload`] and decode it.
///
/// The unpacked form may be at most `max_bytes` long; larger frames fail
/// with [`CompressionError::DecompressFailed`]. Plain JSON (no zstd magic)
/// is decoded directly.
#[cfg(feature = "compression")]
pub fn decompress_value<V: DeserializeOwned>(data: &[u8], max_bytes: usize) -> Result<V, CompressionError> {
    if is_compressed(data) {
        let unpacked = zstd::bulk::decompress(data, max_bytes)
            .map_err(|e| CompressionError::DecompressFailed(e.to_string()))?;
        serde_json::from_slice(&unpacked).map_err(CompressionError::from)
    } else {
        serde_json::from_slice(data).map_err(CompressionError::from)
    }
}

// ============================================================================
// Stub implementations when compression feature is disabled
// ============================================================================

/// Check if data is compressed (always false without feature).
#[cfg(not(feature = "compression"))]
#[inline]
#[must_use]
pub fn is_compressed(_data: &[u8]) -> bool {
    false
}

#[cfg(not(feature = "compression"))]
pub fn compress_payload(_payload: &[u8]) -> Result<(Vec<u8>, CompressionStats), CompressionError> {
    Err(CompressionError::Unavailable)
}

#[cfg(not(feature = "compression"))]
pub fn decompress_value<V: DeserializeOwned>(data: &[u8], _max_bytes: usize) -> Result<V, CompressionError> {
    serde_json::from_slice(data).map_err(CompressionError::from)
}
