//! Gap-fill summary statistics.
//!
//! Aggregates a list of gap records into fill counts and rates.

use gapfill_core::{GapDirection, GapRecord};
use serde::Serialize;

/// Aggregate fill statistics over a set of sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapFillSummary {
    /// Sessions evaluated.
    pub total_sessions: u32,
    /// Sessions opening above the previous close.
    pub up_gaps: u32,
    /// Sessions opening below the previous close.
    pub down_gaps: u32,
    /// Sessions opening exactly at the previous close.
    pub flat_gaps: u32,
    /// Sessions reaching the half-gap level.
    pub half_filled: u32,
    /// Sessions reaching the previous close.
    pub full_filled: u32,
    /// Half fills / sessions (0-1).
    pub half_fill_rate: f64,
    /// Full fills / sessions (0-1).
    pub full_fill_rate: f64,
    /// Full fill rate among up gaps.
    pub up_full_fill_rate: f64,
    /// Full fill rate among down gaps.
    pub down_full_fill_rate: f64,
    /// Mean absolute gap in price units.
    pub avg_abs_gap: f64,
    /// Largest up gap (0 if none).
    pub largest_up_gap: f64,
    /// Largest down gap, negative (0 if none).
    pub largest_down_gap: f64,
    /// Longest run of consecutive sessions without a full fill.
    pub max_consecutive_unfilled: u32,
}

fn rate(count: u32, total: u32) -> f64 {
    if total > 0 {
        f64::from(count) / f64::from(total)
    } else {
        0.0
    }
}

impl GapFillSummary {
    /// Summarize records. Empty input gives the default summary.
    pub fn from_records(records: &[GapRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut summary = Self::default();
        let mut up_full = 0u32;
        let mut down_full = 0u32;
        let mut abs_gap_sum = 0.0;
        let mut current_unfilled = 0u32;

        for record in records {
            summary.total_sessions += 1;
            abs_gap_sum += record.gap.abs();

            match record.direction() {
                GapDirection::Up => {
                    summary.up_gaps += 1;
                    summary.largest_up_gap = summary.largest_up_gap.max(record.gap);
                    if record.full_gap_filled {
                        up_full += 1;
                    }
                }
                GapDirection::Down => {
                    summary.down_gaps += 1;
                    summary.largest_down_gap = summary.largest_down_gap.min(record.gap);
                    if record.full_gap_filled {
                        down_full += 1;
                    }
                }
                GapDirection::Flat => summary.flat_gaps += 1,
            }

            if record.half_gap_filled {
                summary.half_filled += 1;
            }
            if record.full_gap_filled {
                summary.full_filled += 1;
                current_unfilled = 0;
            } else {
                current_unfilled += 1;
                summary.max_consecutive_unfilled =
                    summary.max_consecutive_unfilled.max(current_unfilled);
            }
        }

        summary.half_fill_rate = rate(summary.half_filled, summary.total_sessions);
        summary.full_fill_rate = rate(summary.full_filled, summary.total_sessions);
        summary.up_full_fill_rate = rate(up_full, summary.up_gaps);
        summary.down_full_fill_rate = rate(down_full, summary.down_gaps);
        summary.avg_abs_gap = abs_gap_sum / f64::from(summary.total_sessions);

        summary
    }
}
