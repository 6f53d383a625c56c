//! Eviction scoring for the adaptive cache.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Eviction Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  composite.rs   - Core scoring algorithm                     │
//! │  └─ Candidate: point-in-time snapshot of one cached key      │
//! │  └─ CompositePolicy: age + idle + frequency + freshness      │
//! │                      + affinity + regularity → score         │
//! │  └─ VictimQueue: ranked snapshot drained by ensure_space     │
//! │                  (composite pool or strict LRU order)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scores are in `[0, 1]`; lower scores are evicted first. Victims are drawn
//! at random from the few lowest-scored candidates so that a burst of
//! similarly scored keys is not evicted in lockstep.
//!
//! The cache builds [`Candidate`]s from its metadata, freshness, affinity and
//! pattern maps once per `ensure_space` call and drains a [`VictimQueue`]
//! until the new entry fits.

pub mod composite;

pub use composite::{Candidate, CompositePolicy, ScoreWeights, VictimQueue};
