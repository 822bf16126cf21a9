//! Yahoo Finance chart retrieval.
//!
//! Thin client over the v8 chart endpoint. Response mapping is done by pure
//! functions so it can be exercised without a network.

use chrono::{DateTime, Utc};
use gapfill_core::config::FeedConfig;
use gapfill_core::{Error, RawCandle, RawTimestamp, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Chart API response envelope.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    trailing_pe: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteArrays>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteArrays {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Point-in-time quote summary for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSnapshot {
    pub price: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    /// Not every chart payload carries it.
    pub pe_ratio: Option<f64>,
    /// Capture time, `YYYY-MM-DDTHH:MM:SS` UTC.
    pub time: String,
}

fn first_result(body: &str) -> Result<ChartResult> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = response.chart.error {
        return Err(Error::feed(format!(
            "{}: {}",
            err.code.unwrap_or_else(|| "error".to_string()),
            err.description.unwrap_or_default()
        )));
    }

    response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| Error::feed("chart response has no result"))
}

/// Map a chart response body to raw observations.
///
/// Every timestamp yields one record; null price slots are kept as `None`
/// so the normalizer's malformed-record policy decides what happens to them.
pub fn parse_chart(body: &str) -> Result<Vec<RawCandle>> {
    let result = first_result(body)?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let pick = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut out = Vec::with_capacity(result.timestamp.len());
    for (i, &secs) in result.timestamp.iter().enumerate() {
        let timestamp = RawTimestamp::from_epoch_secs(secs)
            .ok_or_else(|| Error::feed(format!("timestamp out of range: {secs}")))?;
        out.push(RawCandle {
            timestamp,
            open: pick(&quote.open, i),
            high: pick(&quote.high, i),
            low: pick(&quote.low, i),
            close: pick(&quote.close, i),
            volume: pick(&quote.volume, i),
        });
    }

    debug!(
        symbol = result.meta.symbol.as_deref().unwrap_or("?"),
        records = out.len(),
        "parsed chart"
    );
    Ok(out)
}

/// Map a chart response body to a quote snapshot.
pub fn parse_snapshot(body: &str, as_of: DateTime<Utc>) -> Result<QuoteSnapshot> {
    let meta = first_result(body)?.meta;
    Ok(QuoteSnapshot {
        price: meta.regular_market_price,
        day_high: meta.regular_market_day_high,
        day_low: meta.regular_market_day_low,
        pe_ratio: meta.trailing_pe,
        time: as_of.format("%Y-%m-%dT%H:%M:%S").to_string(),
    })
}

/// Yahoo Finance chart client.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    /// Create a client from feed configuration.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::feed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Chart endpoint URL for a symbol.
    pub fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }

    async fn get_chart(&self, symbol: &str, query: &[(&str, &str)]) -> Result<String> {
        let resp = self
            .client
            .get(self.chart_url(symbol))
            .query(query)
            .send()
            .await
            .map_err(|e| Error::feed(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::feed(e.to_string()))?;
        if !status.is_success() {
            // The body usually carries a chart.error with a better message.
            return match first_result(&body) {
                Err(e @ Error::Feed(_)) => Err(e),
                _ => Err(Error::feed(format!("HTTP {status} for {symbol}"))),
            };
        }
        Ok(body)
    }

    /// Fetch intraday history, e.g. `range = "60d"`, `interval = "30m"`.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<RawCandle>> {
        info!(symbol, range, interval, "fetching history");
        let body = self
            .get_chart(symbol, &[("range", range), ("interval", interval)])
            .await?;
        parse_chart(&body)
    }

    /// Fetch a quote snapshot for one ticker.
    pub async fn fetch_snapshot(&self, symbol: &str) -> Result<QuoteSnapshot> {
        info!(symbol, "fetching snapshot");
        let body = self
            .get_chart(symbol, &[("range", "1d"), ("interval", "1d")])
            .await?;
        parse_snapshot(&body, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "symbol": "ES=F",
                    "regularMarketPrice": 5855.25,
                    "regularMarketDayHigh": 5860.0,
                    "regularMarketDayLow": 5840.0
                },
                "timestamp": [1747747800, 1747749600, 1747751400],
                "indicators": {
                    "quote": [{
                        "open":   [5845.0, 5850.0, null],
                        "high":   [5851.0, 5860.0, null],
                        "low":    [5840.0, 5848.0, null],
                        "close":  [5850.0, 5855.25, null],
                        "volume": [1200, null, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart() {
        let records = parse_chart(CHART).unwrap();
        assert_eq!(records.len(), 3);

        let first = records[0].timestamp.to_zone(&New_York);
        assert_eq!(first, New_York.with_ymd_and_hms(2025, 5, 20, 9, 30, 0).unwrap());
        assert_eq!(records[0].open, Some(5845.0));
        assert_eq!(records[0].volume_units(), 1200);
        assert_eq!(records[1].volume, None);
        assert!(records[2].prices(2).is_err());
    }

    #[test]
    fn test_first_result_is_used() {
        let body = r#"{"chart": {"result": [
            {"meta": {"symbol": "ES=F", "regularMarketPrice": 5855.25}, "indicators": {"quote": [{}]}},
            {"meta": {"symbol": "NQ=F", "regularMarketPrice": 21000.0}, "indicators": {"quote": [{}]}}
        ], "error": null}}"#;
        let as_of = Utc.with_ymd_and_hms(2025, 5, 20, 20, 0, 0).unwrap();
        assert_eq!(parse_snapshot(body, as_of).unwrap().price, Some(5855.25));
    }

    #[test]
    fn test_parse_chart_error() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(body).unwrap_err();
        assert!(matches!(err, Error::Feed(ref msg) if msg.contains("delisted")));
    }

    #[test]
    fn test_parse_chart_without_timestamps() {
        let body = r#"{"chart": {"result": [{"meta": {}, "indicators": {"quote": [{}]}}], "error": null}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_snapshot() {
        let as_of = Utc.with_ymd_and_hms(2025, 5, 20, 20, 0, 0).unwrap();
        let snap = parse_snapshot(CHART, as_of).unwrap();
        assert_eq!(snap.price, Some(5855.25));
        assert_eq!(snap.day_low, Some(5840.0));
        assert_eq!(snap.pe_ratio, None);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["dayHigh"], 5860.0);
        assert_eq!(json["time"], "2025-05-20T20:00:00");
        assert!(json["peRatio"].is_null());
    }

    #[test]
    fn test_chart_url() {
        let mut config = FeedConfig::default();
        config.base_url = "http://localhost:8080/".to_string();
        let client = YahooClient::new(&config).unwrap();
        assert_eq!(client.chart_url("ES=F"), "http://localhost:8080/v8/finance/chart/ES=F");
    }
}
