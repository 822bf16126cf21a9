//! Series normalization.
//!
//! Turns raw feed observations into a canonical candle series: exchange-local
//! timestamps, ascending, one candle per instant, prices rounded to cents and
//! integer volume.
//!
//! Records missing a price field are dropped and counted, never fatal on
//! their own. A series where nothing survives is an [`Error::EmptyInput`].

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use gapfill_core::{round2, Candle, Config, Error, RawCandle, Result};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Statistics about a normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationStats {
    /// Raw observations received.
    pub total_records: usize,
    /// Observations dropped for missing or non-finite prices.
    pub dropped_malformed: usize,
    /// Observations that overwrote an earlier one at the same instant.
    pub duplicates_replaced: usize,
    /// Candles in the output.
    pub output_candles: usize,
}

impl NormalizationStats {
    /// Fraction of raw records that were dropped.
    pub fn dropped_frac(&self) -> f64 {
        if self.total_records > 0 {
            self.dropped_malformed as f64 / self.total_records as f64
        } else {
            0.0
        }
    }
}

/// Normalized output with its statistics.
#[derive(Debug, Clone)]
pub struct NormalizedSeries {
    pub candles: Vec<Candle>,
    pub stats: NormalizationStats,
}

/// Normalizer from raw observations to exchange-local candles.
#[derive(Debug, Clone)]
pub struct SeriesNormalizer {
    /// Exchange-local zone.
    tz: Tz,
}

impl SeriesNormalizer {
    /// Create a normalizer for the given exchange zone.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Create a normalizer from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.session.timezone)
    }

    /// Normalize a raw series.
    pub fn normalize(&self, raw: &[RawCandle]) -> Result<NormalizedSeries> {
        if raw.is_empty() {
            return Err(Error::empty_input("raw series has no observations"));
        }

        let mut stats = NormalizationStats {
            total_records: raw.len(),
            ..Default::default()
        };

        // Keyed by UTC instant so DST repeats stay distinct.
        let mut by_instant: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();

        for (index, record) in raw.iter().enumerate() {
            let [open, high, low, close] = match record.prices(index) {
                Ok(prices) => prices,
                Err(e) => {
                    warn!(error = %e, "dropping malformed record");
                    stats.dropped_malformed += 1;
                    continue;
                }
            };

            let timestamp = record.timestamp.to_zone(&self.tz);
            let candle = Candle {
                timestamp,
                open: round2(open),
                high: round2(high),
                low: round2(low),
                close: round2(close),
                volume: record.volume_units(),
            };

            if by_instant.insert(timestamp.with_timezone(&Utc), candle).is_some() {
                debug!(%timestamp, "duplicate timestamp, keeping later record");
                stats.duplicates_replaced += 1;
            }
        }

        if by_instant.is_empty() {
            return Err(Error::empty_input(format!(
                "all {} observations were malformed",
                stats.total_records
            )));
        }

        let candles: Vec<Candle> = by_instant.into_values().collect();
        stats.output_candles = candles.len();

        info!(
            total = stats.total_records,
            dropped = stats.dropped_malformed,
            duplicates = stats.duplicates_replaced,
            candles = stats.output_candles,
            "normalized series"
        );

        Ok(NormalizedSeries { candles, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveTime};
    use chrono_tz::America::New_York;
    use gapfill_core::RawTimestamp;

    fn raw(ts: &str, close: f64, volume: Option<f64>) -> RawCandle {
        RawCandle {
            timestamp: ts.parse().unwrap(),
            open: Some(close),
            high: Some(close + 1.0),
            low: Some(close - 1.0),
            close: Some(close),
            volume,
        }
    }

    #[test]
    fn test_empty_input() {
        let normalizer = SeriesNormalizer::new(New_York);
        assert!(matches!(normalizer.normalize(&[]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_sorted_and_converted() {
        let normalizer = SeriesNormalizer::new(New_York);
        let series = normalizer
            .normalize(&[
                raw("2025-05-20T14:00:00+00:00", 5850.0, Some(10.0)),
                raw("2025-05-20T13:30:00+00:00", 5845.0, Some(12.0)),
            ])
            .unwrap();

        assert_eq!(series.candles.len(), 2);
        assert_eq!(series.candles[0].time(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(series.candles[1].time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(series.candles[0].date(), NaiveDate::from_ymd_opt(2025, 5, 20).unwrap());
        assert_eq!(series.candles[0].timestamp.timezone(), New_York);
    }

    #[test]
    fn test_naive_assumed_utc() {
        let normalizer = SeriesNormalizer::new(New_York);
        let series = normalizer
            .normalize(&[raw("2025-05-20 13:30:00", 5845.0, None)])
            .unwrap();
        assert_eq!(series.candles[0].time(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn test_last_write_wins() {
        let normalizer = SeriesNormalizer::new(New_York);
        let series = normalizer
            .normalize(&[
                raw("2025-05-20T09:30:00-0400", 5845.0, Some(1.0)),
                raw("2025-05-20T14:00:00+00:00", 5850.0, Some(1.0)),
                // Same instant as the first, expressed in UTC.
                raw("2025-05-20T13:30:00+00:00", 5846.0, Some(2.0)),
            ])
            .unwrap();

        assert_eq!(series.candles.len(), 2);
        assert_relative_eq!(series.candles[0].close, 5846.0);
        assert_eq!(series.candles[0].volume, 2);
        assert_eq!(series.stats.duplicates_replaced, 1);
    }

    #[test]
    fn test_rounding_and_volume() {
        let normalizer = SeriesNormalizer::new(New_York);
        let record = RawCandle {
            timestamp: "2025-05-20T09:30:00-0400".parse().unwrap(),
            open: Some(5845.004),
            high: Some(5860.126),
            low: Some(5839.994),
            close: Some(5850.0),
            volume: Some(1530.7),
        };
        let series = normalizer.normalize(&[record]).unwrap();
        let c = &series.candles[0];
        assert_eq!(c.open, 5845.0);
        assert_eq!(c.high, 5860.13);
        assert_eq!(c.low, 5839.99);
        assert_eq!(c.volume, 1530);
    }

    #[test]
    fn test_malformed_dropped() {
        let normalizer = SeriesNormalizer::new(New_York);
        let mut bad = raw("2025-05-20T10:00:00-0400", 5850.0, None);
        bad.low = None;
        let series = normalizer
            .normalize(&[raw("2025-05-20T09:30:00-0400", 5845.0, None), bad])
            .unwrap();
        assert_eq!(series.candles.len(), 1);
        assert_eq!(series.stats.dropped_malformed, 1);
        assert_relative_eq!(series.stats.dropped_frac(), 0.5);
    }

    #[test]
    fn test_all_malformed_is_empty_input() {
        let normalizer = SeriesNormalizer::new(New_York);
        let mut bad = raw("2025-05-20T10:00:00-0400", 5850.0, None);
        bad.close = Some(f64::NAN);
        assert!(matches!(normalizer.normalize(&[bad]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_idempotent() {
        let normalizer = SeriesNormalizer::new(New_York);
        let input = vec![
            raw("2025-05-20T13:30:00+00:00", 5845.0, Some(3.0)),
            RawCandle {
                timestamp: RawTimestamp::from_epoch_secs(1_747_749_600).unwrap(),
                open: Some(5850.0),
                high: Some(5851.0),
                low: Some(5849.0),
                close: Some(5850.5),
                volume: Some(4.0),
            },
        ];
        let a = serde_json::to_string(&normalizer.normalize(&input).unwrap().candles).unwrap();
        let b = serde_json::to_string(&normalizer.normalize(&input).unwrap().candles).unwrap();
        assert_eq!(a, b);
    }
}
