// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Utilization pressure classification.
//!
//! # Example
//!
//! ```
//! use adaptive_cache::PressureLevel;
//!
//! let level = PressureLevel::from_utilization(0.5);
//! assert_eq!(level, PressureLevel::Normal);
//! assert!(level.is_healthy());
//!
//! let level = PressureLevel::from_utilization(0.92);
//! assert_eq!(level, PressureLevel::Critical);
//! assert!(!level.is_healthy());
//! ```

use serde::Serialize;

/// Pressure level derived from the higher of size and memory utilization.
///
/// - **Normal** (< 70%)
/// - **Elevated** (70-80%): evictions becoming frequent
/// - **High** (80-90%): most sets evict
/// - **Critical** (≥ 90%): reported unhealthy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureLevel {
    Normal = 0,
    Elevated = 1,
    High = 2,
    Critical = 3,
}

impl PressureLevel {
    /// Classify a utilization ratio (0.0 → 1.0).
    #[must_use]
    pub fn from_utilization(utilization: f64) -> Self {
        match utilization {
            u if u < 0.70 => Self::Normal,
            u if u < 0.80 => Self::Elevated,
            u if u < 0.90 => Self::High,
            _ => Self::Critical,
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        *self < Self::Critical
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Normal => "Normal operation",
            Self::Elevated => "Elevated - evictions increasing",
            Self::High => "High - most writes evict",
            Self::Critical => "Critical - cache near its limits",
        }
    }
}

impl std::fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization_thresholds() {
        assert_eq!(PressureLevel::from_utilization(0.0), PressureLevel::Normal);
        assert_eq!(PressureLevel::from_utilization(0.69), PressureLevel::Normal);
        assert_eq!(PressureLevel::from_utilization(0.70), PressureLevel::Elevated);
        assert_eq!(PressureLevel::from_utilization(0.79), PressureLevel::Elevated);
        assert_eq!(PressureLevel::from_utilization(0.80), PressureLevel::High);
        assert_eq!(PressureLevel::from_utilization(0.89), PressureLevel::High);
        assert_eq!(PressureLevel::from_utilization(0.90), PressureLevel::Critical);
        assert_eq!(PressureLevel::from_utilization(1.0), PressureLevel::Critical);
    }

    #[test]
    fn test_healthy_below_critical() {
        assert!(PressureLevel::Normal.is_healthy());
        assert!(PressureLevel::Elevated.is_healthy());
        assert!(PressureLevel::High.is_healthy());
        assert!(!PressureLevel::Critical.is_healthy());
    }

    #[test]
    fn test_level_ordering() {
        assert!(PressureLevel::Normal < PressureLevel::Elevated);
        assert!(PressureLevel::Elevated < PressureLevel::High);
        assert!(PressureLevel::High < PressureLevel::Critical);
    }
}
