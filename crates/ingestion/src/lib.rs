//! Data ingestion and normalization for the gap-fill pipeline.
//!
//! This crate handles:
//! - Chart retrieval from Yahoo Finance
//! - Time-zone conversion to exchange-local time
//! - Duplicate collapsing and rounding (series normalization)

pub mod normalizer;
pub mod yahoo;

pub use normalizer::{NormalizationStats, NormalizedSeries, SeriesNormalizer};
pub use yahoo::{QuoteSnapshot, YahooClient};
