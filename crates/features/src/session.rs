//! Session calendar.
//!
//! Groups a candle series by exchange-local date and resolves the two daily
//! anchors (RTH open and RTH close) plus the RTH high/low range.
//!
//! Anchor rule, used for both boundaries: the bar starting exactly on the
//! boundary wins; otherwise the latest bar on the same date that starts no
//! more than `anchor_fallback` before the boundary (the bar ending on it).
//! The close anchor always takes that bar's close. The open anchor takes the
//! exact bar's open, or the fallback bar's close, which is the price at the
//! boundary.

use chrono::{Duration, NaiveDate, NaiveTime};
use gapfill_core::config::SessionConfig;
use gapfill_core::{Candle, Session};
use std::collections::BTreeMap;

/// Which bar anchored a boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Anchor<'a> {
    /// Bar starts on the boundary.
    Exact(&'a Candle),
    /// Bar ends on the boundary.
    Preceding(&'a Candle),
}

impl Anchor<'_> {
    fn open_price(self) -> f64 {
        match self {
            Anchor::Exact(c) => c.open,
            Anchor::Preceding(c) => c.close,
        }
    }

    fn close_price(self) -> f64 {
        match self {
            Anchor::Exact(c) | Anchor::Preceding(c) => c.close,
        }
    }
}

/// Find the anchor bar for `boundary` among one day's bars (sorted ascending).
fn resolve_anchor<'a>(
    day: &[&'a Candle],
    boundary: NaiveTime,
    fallback: Duration,
) -> Option<Anchor<'a>> {
    if let Some(c) = day.iter().find(|c| c.time() == boundary) {
        return Some(Anchor::Exact(*c));
    }
    if fallback <= Duration::zero() {
        return None;
    }
    day.iter()
        .rev()
        .find(|c| {
            let t = c.time();
            t < boundary && boundary.signed_duration_since(t) <= fallback
        })
        .map(|c| Anchor::Preceding(*c))
}

fn build_session(date: NaiveDate, day: &[&Candle], config: &SessionConfig) -> Session {
    let fallback = config.anchor_fallback();
    let session_open = resolve_anchor(day, config.rth_start, fallback).map(Anchor::open_price);
    let session_close = resolve_anchor(day, config.rth_end, fallback).map(Anchor::close_price);

    let mut day_low: Option<f64> = None;
    let mut day_high: Option<f64> = None;
    for c in day.iter().filter(|c| config.in_rth(c.time())) {
        day_low = Some(day_low.map_or(c.low, |l| l.min(c.low)));
        day_high = Some(day_high.map_or(c.high, |h| h.max(c.high)));
    }

    Session {
        date,
        session_open,
        session_close,
        day_low,
        day_high,
        candle_count: day.len(),
    }
}

/// Sessions keyed by local calendar date.
#[derive(Debug, Clone, Default)]
pub struct SessionCalendar {
    sessions: BTreeMap<NaiveDate, Session>,
}

impl SessionCalendar {
    /// Group candles into sessions. Input order does not matter.
    pub fn build(candles: &[Candle], config: &SessionConfig) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<&Candle>> = BTreeMap::new();
        for candle in candles {
            by_date.entry(candle.date()).or_default().push(candle);
        }

        let sessions = by_date
            .into_iter()
            .map(|(date, mut day)| {
                day.sort_by_key(|c| c.timestamp);
                (date, build_session(date, &day, config))
            })
            .collect();

        Self { sessions }
    }

    /// Sessions in ascending date order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Session for a date.
    pub fn get(&self, date: NaiveDate) -> Option<&Session> {
        self.sessions.get(&date)
    }

    /// Earliest date in the calendar.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.sessions.keys().next().copied()
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the calendar has no dates.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Close anchor of the most recent earlier date that has one.
    ///
    /// Dates without a close anchor (weekends, holidays, partial data) are
    /// walked over. Returns `None` once the walk runs past the first date.
    pub fn prev_close_before(&self, date: NaiveDate) -> Option<(NaiveDate, f64)> {
        self.sessions
            .range(..date)
            .rev()
            .find_map(|(d, s)| s.session_close.map(|close| (*d, close)))
    }
}
