//! Adaptive quality
//!
//! High-definition decode is scarce: at most `high_quality_capacity` streams
//! hold a slot at once. A stream qualifies once its largest view exceeds the
//! HD threshold scaled by the hysteresis factor; when the pool is full, a larger stream may
//! displace the holder with the smallest share of the viewport.
//!
//! ```text
//!  size observer ──► record_resize ──► (debounce) ──► flush_pending
//!                                                        │
//!                      calculate_optimal_quality ◄───────┘
//!                                │
//!                     HighQualityPool::admit ──► Granted / Evicted / Denied
//!                                │
//!                       on_quality_change(QualityChange)
//! ```

pub mod config;
pub mod manager;
pub mod slots;

pub use config::QualityConfig;
pub use manager::{QualityCallback, QualityChange, QualityChangeReason, VideoQualityManager};
pub use slots::{Admission, HighQualityPool};
