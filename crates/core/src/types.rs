//! Core data types for the gap-fill pipeline.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Timestamp format used for exported candles (`2025-05-20T09:30:00-0400`).
pub const CANDLE_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Round a price to cents.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Timestamp of a raw observation, as delivered by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTimeRepr")]
pub enum RawTimestamp {
    /// No zone information.
    Naive(NaiveDateTime),
    /// Carries its own offset.
    Zoned(DateTime<FixedOffset>),
}

impl RawTimestamp {
    /// Build a zoned timestamp from Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| RawTimestamp::Zoned(dt.fixed_offset()))
    }

    /// Convert to an instant in `tz`.
    ///
    /// Naive timestamps are taken to be UTC; zoned ones are converted, never reinterpreted.
    pub fn to_zone(&self, tz: &Tz) -> DateTime<Tz> {
        match self {
            RawTimestamp::Naive(naive) => Utc.from_utc_datetime(naive).with_timezone(tz),
            RawTimestamp::Zoned(dt) => dt.with_timezone(tz),
        }
    }
}

impl FromStr for RawTimestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(RawTimestamp::Zoned(dt));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S%:z"] {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(RawTimestamp::Zoned(dt));
            }
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(RawTimestamp::Naive(naive));
            }
        }
        Err(Error::data(format!("unrecognized timestamp '{s}'")))
    }
}

/// Wire forms accepted for a raw timestamp.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeRepr {
    Epoch(i64),
    Text(String),
}

impl TryFrom<RawTimeRepr> for RawTimestamp {
    type Error = String;

    fn try_from(repr: RawTimeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            RawTimeRepr::Epoch(secs) => RawTimestamp::from_epoch_secs(secs)
                .ok_or_else(|| format!("epoch seconds out of range: {secs}")),
            RawTimeRepr::Text(s) => s.parse().map_err(|_| format!("unrecognized timestamp '{s}'")),
        }
    }
}

/// One observation as supplied by the retrieval layer, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCandle {
    #[serde(alias = "datetime", alias = "Datetime", alias = "time")]
    pub timestamp: RawTimestamp,
    #[serde(default, alias = "Open")]
    pub open: Option<f64>,
    #[serde(default, alias = "High")]
    pub high: Option<f64>,
    #[serde(default, alias = "Low")]
    pub low: Option<f64>,
    #[serde(default, alias = "Close")]
    pub close: Option<f64>,
    #[serde(default, alias = "Volume")]
    pub volume: Option<f64>,
}

impl RawCandle {
    /// Extract `[open, high, low, close]`, rejecting missing or non-finite values.
    pub fn prices(&self, index: usize) -> Result<[f64; 4]> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        let mut out = [0.0; 4];
        for (slot, (name, value)) in out.iter_mut().zip(fields) {
            match value {
                Some(v) if v.is_finite() => *slot = v,
                Some(v) => return Err(Error::malformed(index, format!("{name} is {v}"))),
                None => return Err(Error::malformed(index, format!("{name} is missing"))),
            }
        }
        Ok(out)
    }

    /// Volume as a non-negative integer; missing, NaN or negative become 0.
    pub fn volume_units(&self) -> u64 {
        match self.volume {
            Some(v) if v.is_finite() && v > 0.0 => v.trunc() as u64,
            _ => 0,
        }
    }
}

fn serialize_local_ts<S>(ts: &DateTime<Tz>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&ts.format(CANDLE_TS_FORMAT))
}

/// A normalized intraday candle in exchange-local time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    /// Bar start, exchange-local.
    #[serde(rename = "datetime", serialize_with = "serialize_local_ts")]
    pub timestamp: DateTime<Tz>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    /// Local calendar date of the bar start.
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Local wall-clock time of the bar start.
    #[inline]
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }
}

/// One trading day, keyed by local calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub date: NaiveDate,
    /// Price at the RTH start boundary.
    pub session_open: Option<f64>,
    /// Price at the RTH end boundary.
    pub session_close: Option<f64>,
    /// Lowest low inside the RTH window.
    pub day_low: Option<f64>,
    /// Highest high inside the RTH window.
    pub day_high: Option<f64>,
    /// Candles on this date, RTH or not.
    pub candle_count: usize,
}

/// Gap-fill outcome for one eligible session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapRecord {
    pub date: NaiveDate,
    pub prev_close: f64,
    pub open_0930: f64,
    /// `open_0930 - prev_close`, rounded to cents.
    pub gap: f64,
    pub half_gap_filled: bool,
    pub full_gap_filled: bool,
}

impl GapRecord {
    /// Midpoint between the previous close and the session open.
    #[inline]
    pub fn half_gap_price(&self) -> f64 {
        self.prev_close + self.gap / 2.0
    }

    /// Direction of the gap.
    pub fn direction(&self) -> GapDirection {
        if self.gap > 0.0 {
            GapDirection::Up
        } else if self.gap < 0.0 {
            GapDirection::Down
        } else {
            GapDirection::Flat
        }
    }
}

/// Gap direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapDirection {
    Up,
    Down,
    Flat,
}

/// Why a date produced no gap record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// No bar anchors the RTH start on this date.
    MissingOpenAnchor,
    /// No earlier date in the series has a close anchor.
    MissingPrevClose,
    /// No bars fall inside the RTH window.
    EmptyRthWindow,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingOpenAnchor => "missing open anchor",
            SkipReason::MissingPrevClose => "missing previous close",
            SkipReason::EmptyRthWindow => "empty RTH window",
        };
        f.write_str(s)
    }
}
