//! Access pattern tracking and prefetch prediction.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Patterns Module                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  recorder.rs   - bounded per-key event log                   │
//! │  └─ AccessPattern: interval + regularity statistics          │
//! │  └─ AccessPatternRecorder: key → pattern, 24h retention      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  predictor.rs  - periodic scan for likely re-requests        │
//! │  └─ PrefetchPredictor: due + regular + uncached → hint       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod recorder;
pub mod predictor;

pub use recorder::{AccessEvent, AccessKind, AccessPattern, AccessPatternRecorder};
pub use predictor::{PrefetchHint, PrefetchPredictor};
