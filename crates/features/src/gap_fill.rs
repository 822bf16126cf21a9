//! Gap-fill evaluation.
//!
//! For every date with a resolvable previous close and an RTH open anchor,
//! measures the opening gap and whether the RTH range came back to the
//! half-gap level and to the previous close.
//!
//! Reachability uses one predicate for both gap directions: a target `T` is
//! filled when `day_low - tol <= T <= day_high + tol`.
//!
//! Prices are compared on a half-cent grid. Half-gap levels of odd-cent gaps
//! land on half cents, and float sums like `5850.03 + 0.11` must still meet
//! `5850.64 - 0.5` exactly.

use chrono::NaiveDate;
use gapfill_core::config::{GapFillConfig, SessionConfig};
use gapfill_core::{round2, Candle, Config, GapRecord, SkipReason};
use tracing::{debug, info};

use crate::session::SessionCalendar;

/// Price in half-cent units.
#[inline]
fn half_cents(price: f64) -> i64 {
    (price * 200.0).round() as i64
}

/// Whether `target` lies inside the day's range widened by `tolerance`.
///
/// Inclusive at both edges. Operands are snapped to half cents first.
#[inline]
pub fn reaches(target: f64, day_low: f64, day_high: f64, tolerance: f64) -> bool {
    let t = half_cents(target);
    let tol = half_cents(tolerance);
    half_cents(day_low) - tol <= t && t <= half_cents(day_high) + tol
}

/// Build the gap record for one session from its anchors and RTH range.
pub fn compute_gap_record(
    date: NaiveDate,
    prev_close: f64,
    session_open: f64,
    day_low: f64,
    day_high: f64,
    tolerance: f64,
) -> GapRecord {
    let gap = round2(session_open - prev_close);

    let (half_gap_filled, full_gap_filled) = if gap == 0.0 {
        (true, true)
    } else {
        let half_gap_price = prev_close + gap / 2.0;
        (
            reaches(half_gap_price, day_low, day_high, tolerance),
            reaches(prev_close, day_low, day_high, tolerance),
        )
    };

    GapRecord {
        date,
        prev_close: round2(prev_close),
        open_0930: round2(session_open),
        gap,
        half_gap_filled,
        full_gap_filled,
    }
}

/// Output of an evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct GapFillReport {
    /// Records in ascending date order.
    pub records: Vec<GapRecord>,
    /// Dates that produced no record, with the reason.
    pub skipped: Vec<(NaiveDate, SkipReason)>,
}

impl GapFillReport {
    /// Number of dates skipped for a given reason.
    pub fn skipped_count(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|(_, r)| *r == reason).count()
    }
}

/// Gap-fill evaluator.
#[derive(Debug, Clone)]
pub struct GapFillEvaluator {
    session: SessionConfig,
    tolerance: f64,
}

impl GapFillEvaluator {
    /// Create an evaluator.
    pub fn new(session: SessionConfig, gap_fill: GapFillConfig) -> Self {
        Self {
            session,
            tolerance: gap_fill.tolerance,
        }
    }

    /// Create an evaluator from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.session.clone(), config.gap_fill.clone())
    }

    /// Evaluate a normalized candle series.
    ///
    /// Never fails: an empty series or one without anchors yields an empty report.
    pub fn evaluate(&self, candles: &[Candle]) -> GapFillReport {
        let calendar = SessionCalendar::build(candles, &self.session);
        let mut report = GapFillReport::default();
        if calendar.is_empty() {
            debug!("no sessions to evaluate");
            return report;
        }

        for session in calendar.sessions() {
            let date = session.date;

            let Some((prev_date, prev_close)) = calendar.prev_close_before(date) else {
                debug!(%date, reason = %SkipReason::MissingPrevClose, "skipping session");
                report.skipped.push((date, SkipReason::MissingPrevClose));
                continue;
            };
            let Some(session_open) = session.session_open else {
                debug!(%date, reason = %SkipReason::MissingOpenAnchor, "skipping session");
                report.skipped.push((date, SkipReason::MissingOpenAnchor));
                continue;
            };
            let (Some(day_low), Some(day_high)) = (session.day_low, session.day_high) else {
                debug!(%date, reason = %SkipReason::EmptyRthWindow, "skipping session");
                report.skipped.push((date, SkipReason::EmptyRthWindow));
                continue;
            };

            let record = compute_gap_record(
                date,
                prev_close,
                session_open,
                day_low,
                day_high,
                self.tolerance,
            );
            debug!(
                %date,
                %prev_date,
                gap = record.gap,
                half = record.half_gap_filled,
                full = record.full_gap_filled,
                "evaluated session"
            );
            report.records.push(record);
        }

        info!(
            sessions = calendar.len(),
            records = report.records.len(),
            skipped = report.skipped.len(),
            "gap-fill evaluation complete"
        );
        report
    }
}
