//! Normalize → evaluate → publish.

use anyhow::Result;
use gapfill_core::config::OutputConfig;
use gapfill_core::{Candle, Config, RawCandle};
use gapfill_features::{GapFillEvaluator, GapFillReport, GapFillSummary};
use gapfill_ingestion::{NormalizationStats, SeriesNormalizer};
use tracing::info;

use crate::export::write_json;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub candles: Vec<Candle>,
    pub stats: NormalizationStats,
    pub report: GapFillReport,
    pub summary: GapFillSummary,
}

/// Run the pure part of the pipeline over a raw series.
pub fn process(raw: &[RawCandle], config: &Config) -> gapfill_core::Result<PipelineOutput> {
    let series = SeriesNormalizer::from_config(config).normalize(raw)?;
    let report = GapFillEvaluator::from_config(config).evaluate(&series.candles);
    let summary = GapFillSummary::from_records(&report.records);

    info!(
        sessions = summary.total_sessions,
        half_fill_rate = summary.half_fill_rate,
        full_fill_rate = summary.full_fill_rate,
        avg_abs_gap = summary.avg_abs_gap,
        "gap-fill summary"
    );

    Ok(PipelineOutput {
        candles: series.candles,
        stats: series.stats,
        report,
        summary,
    })
}

/// Write the candle and gap record artifacts.
pub fn publish(output: &PipelineOutput, config: &OutputConfig) -> Result<()> {
    write_json(&config.candles_path(), &output.candles)?;
    write_json(&config.gapfills_path(), &output.report.records)?;
    Ok(())
}
