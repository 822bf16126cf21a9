//! Configuration structures for the gap-fill pipeline.

use crate::error::{Error, Result};
use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for a gap-fill run.
///
/// Every section has defaults, so a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instrument and history window.
    pub instrument: InstrumentConfig,
    /// Exchange session boundaries.
    pub session: SessionConfig,
    /// Fill evaluation parameters.
    pub gap_fill: GapFillConfig,
    /// Market-data feed settings.
    pub feed: FeedConfig,
    /// Output artifact locations.
    pub output: OutputConfig,
}

impl Config {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.instrument.symbol.trim().is_empty() {
            return Err(Error::config("instrument.symbol must not be empty"));
        }
        if self.session.rth_start >= self.session.rth_end {
            return Err(Error::config(format!(
                "session.rth_start ({}) must be before session.rth_end ({})",
                self.session.rth_start, self.session.rth_end
            )));
        }
        if !self.gap_fill.tolerance.is_finite() || self.gap_fill.tolerance < 0.0 {
            return Err(Error::config(format!(
                "gap_fill.tolerance must be a non-negative number, got {}",
                self.gap_fill.tolerance
            )));
        }
        if self.session.min_history_days < 2 {
            return Err(Error::config("session.min_history_days must be at least 2"));
        }
        if self.instrument.period_days < self.session.min_history_days {
            return Err(Error::config(format!(
                "instrument.period_days ({}) is shorter than session.min_history_days ({})",
                self.instrument.period_days, self.session.min_history_days
            )));
        }
        if self.feed.timeout_secs == 0 {
            return Err(Error::config("feed.timeout_secs must be positive"));
        }
        Ok(())
    }
}

/// Instrument-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Ticker symbol (e.g., "ES=F").
    pub symbol: String,
    /// Candle interval as understood by the feed (e.g., "30m").
    pub interval: String,
    /// History window in calendar days.
    pub period_days: u32,
}

impl InstrumentConfig {
    /// History window in the feed's range notation.
    pub fn range(&self) -> String {
        format!("{}d", self.period_days)
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "ES=F".to_string(),
            interval: "30m".to_string(),
            period_days: 60,
        }
    }
}

/// Exchange session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Exchange-local time zone.
    pub timezone: Tz,
    /// Regular-trading-hours start (local).
    pub rth_start: NaiveTime,
    /// Regular-trading-hours end (local).
    pub rth_end: NaiveTime,
    /// How far before a boundary a bar may start and still anchor it (minutes).
    /// Zero requires a bar starting exactly on the boundary.
    pub anchor_fallback_minutes: u32,
    /// Smallest history window that guarantees one eligible session.
    pub min_history_days: u32,
}

impl SessionConfig {
    /// Anchor fallback as a duration.
    pub fn anchor_fallback(&self) -> Duration {
        Duration::minutes(i64::from(self.anchor_fallback_minutes))
    }

    /// Whether a local time falls inside the RTH window `[start, end)`.
    #[inline]
    pub fn in_rth(&self, time: NaiveTime) -> bool {
        time >= self.rth_start && time < self.rth_end
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            rth_start: hm(9, 30),
            rth_end: hm(16, 0),
            anchor_fallback_minutes: 30,
            // Friday close, Monday holiday, Tuesday open.
            min_history_days: 5,
        }
    }
}

/// Gap-fill evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFillConfig {
    /// Band added outward from the day's low/high, in price units.
    pub tolerance: f64,
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self { tolerance: 0.50 }
    }
}

/// Market-data feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Chart API base URL.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent header sent with each request.
    pub user_agent: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the artifacts are written to.
    pub dir: PathBuf,
    /// Normalized candle file name.
    pub candles_file: String,
    /// Gap record file name.
    pub gapfills_file: String,
    /// Quote snapshot file name.
    pub snapshot_file: String,
    /// Tickers included in the quote snapshot.
    pub snapshot_tickers: Vec<String>,
}

impl OutputConfig {
    /// Full path of the candle artifact.
    pub fn candles_path(&self) -> PathBuf {
        self.dir.join(&self.candles_file)
    }

    /// Full path of the gap record artifact.
    pub fn gapfills_path(&self) -> PathBuf {
        self.dir.join(&self.gapfills_file)
    }

    /// Full path of the snapshot artifact.
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(&self.snapshot_file)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            candles_file: "es_30m.json".to_string(),
            gapfills_file: "es_gapfills.json".to_string(),
            snapshot_file: "metrics.json".to_string(),
            snapshot_tickers: vec!["AAPL".to_string(), "MSFT".to_string(), "SPY".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.instrument.symbol, "ES=F");
        assert_eq!(config.session.rth_start, hm(9, 30));
        assert_eq!(config.session.rth_end, hm(16, 0));
        assert_eq!(config.gap_fill.tolerance, 0.50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[instrument]
symbol = "NQ=F"

[gap_fill]
tolerance = 1.25
"#,
        )
        .unwrap();
        assert_eq!(config.instrument.symbol, "NQ=F");
        assert_eq!(config.instrument.interval, "30m");
        assert_eq!(config.gap_fill.tolerance, 1.25);
        assert_eq!(config.session.timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn test_toml_session_times_and_zone() {
        let config = Config::from_toml_str(
            r#"
[session]
timezone = "Europe/London"
rth_start = "08:00:00"
rth_end = "16:30:00"
"#,
        )
        .unwrap();
        assert_eq!(config.session.timezone, chrono_tz::Europe::London);
        assert_eq!(config.session.rth_end, hm(16, 30));
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = Config::from_toml_str(include_str!("../../../config/gapfill.toml")).unwrap();
        assert_eq!(config.instrument.range(), "60d");
        assert_eq!(config.session.anchor_fallback(), Duration::minutes(30));
        assert_eq!(config.output.snapshot_tickers.len(), 3);
    }

    #[test]
    fn test_unknown_zone_rejected() {
        let err = Config::from_toml_str("[session]\ntimezone = \"Mars/Olympus\"\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_inverted_rth_rejected() {
        let mut config = Config::default();
        config.session.rth_start = hm(16, 0);
        config.session.rth_end = hm(9, 30);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let mut config = Config::default();
        config.gap_fill.tolerance = -0.01;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_short_history_rejected() {
        let mut config = Config::default();
        config.instrument.period_days = 3;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rth_window_is_half_open() {
        let session = SessionConfig::default();
        assert!(session.in_rth(hm(9, 30)));
        assert!(session.in_rth(hm(15, 30)));
        assert!(!session.in_rth(hm(16, 0)));
        assert!(!session.in_rth(hm(9, 0)));
    }

    #[test]
    fn test_output_paths() {
        let mut output = OutputConfig::default();
        output.dir = PathBuf::from("site/data");
        assert_eq!(output.gapfills_path(), PathBuf::from("site/data/es_gapfills.json"));
    }
}
