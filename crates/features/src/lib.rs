//! Session analysis for the gap-fill pipeline.
//!
//! This crate handles:
//! - Grouping candles into exchange-local sessions
//! - Anchor resolution (RTH open, RTH close) with calendar walk-back
//! - Gap-fill evaluation with a tolerance band
//! - Fill-rate summary statistics

pub mod session;
pub mod gap_fill;
pub mod summary;

pub use session::SessionCalendar;
pub use gap_fill::{GapFillEvaluator, GapFillReport};
pub use summary::GapFillSummary;
