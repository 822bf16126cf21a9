//! `gapfill`: scheduled batch job.
//!
//! Downloads intraday candles for one futures contract, derives the daily
//! RTH gap-fill statistics and writes both as JSON for a static page.
//!
//! Usage:
//!   gapfill [--config gapfill.toml] run [--input raw.json] [--out-dir site/data]
//!   gapfill snapshot [--out site/data/metrics.json]

mod export;
mod pipeline;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gapfill_core::Config;
use gapfill_ingestion::YahooClient;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gapfill")]
#[command(about = "Publish intraday candles and RTH gap-fill statistics as JSON")]
struct Cli {
    /// TOML config file; defaults apply to anything it omits
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the instrument symbol
    #[arg(long, env = "GAPFILL_SYMBOL", global = true)]
    symbol: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch history, compute gap fills, write both artifacts
    Run {
        /// Read raw observations from a JSON file instead of the feed
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Write a price snapshot for the configured tickers
    Snapshot {
        /// Output file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(symbol) = &cli.symbol {
        config.instrument.symbol = symbol.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(mut config: Config, input: Option<PathBuf>, out_dir: Option<PathBuf>) -> Result<()> {
    if let Some(dir) = out_dir {
        config.output.dir = dir;
    }

    let raw = match input {
        Some(path) => export::read_raw(&path)?,
        None => {
            let client = YahooClient::new(&config.feed)?;
            client
                .fetch_history(
                    &config.instrument.symbol,
                    &config.instrument.range(),
                    &config.instrument.interval,
                )
                .await
                .with_context(|| format!("failed to fetch {}", config.instrument.symbol))?
        }
    };

    let output = pipeline::process(&raw, &config)?;
    pipeline::publish(&output, &config.output)?;
    info!(
        candles = output.candles.len(),
        dropped = output.stats.dropped_malformed,
        records = output.report.records.len(),
        skipped = output.report.skipped.len(),
        "run complete"
    );

    println!(
        "Wrote {} and {}",
        config.output.candles_path().display(),
        config.output.gapfills_path().display()
    );
    Ok(())
}

async fn snapshot(config: Config, out: Option<PathBuf>) -> Result<()> {
    let client = YahooClient::new(&config.feed)?;
    let mut data = BTreeMap::new();
    for ticker in &config.output.snapshot_tickers {
        let snap = client
            .fetch_snapshot(ticker)
            .await
            .with_context(|| format!("failed to fetch snapshot for {ticker}"))?;
        data.insert(ticker.clone(), snap);
    }

    let path = out.unwrap_or_else(|| config.output.snapshot_path());
    export::write_json(&path, &data)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    info!(symbol = %config.instrument.symbol, "gapfill starting");

    match cli.command {
        None => run(config, None, None).await,
        Some(Command::Run { input, out_dir }) => run(config, input, out_dir).await,
        Some(Command::Snapshot { out }) => snapshot(config, out).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_args() {
        let cli = Cli::parse_from(["gapfill", "run", "--input", "raw.json", "--out-dir", "out"]);
        match cli.command {
            Some(Command::Run { input, out_dir }) => {
                assert_eq!(input, Some(PathBuf::from("raw.json")));
                assert_eq!(out_dir, Some(PathBuf::from("out")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_symbol_override() {
        let cli = Cli::parse_from(["gapfill", "--symbol", "NQ=F", "snapshot"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.instrument.symbol, "NQ=F");
    }

    #[test]
    fn test_bad_config_path() {
        let cli = Cli::parse_from(["gapfill", "--config", "/nonexistent/gapfill.toml"]);
        assert!(load_config(&cli).is_err());
    }

    #[tokio::test]
    async fn test_run_from_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.json");
        std::fs::write(
            &input,
            r#"[
                {"datetime": "2025-05-19T15:30:00-0400", "open": 5848, "high": 5851, "low": 5847, "close": 5850, "volume": 10},
                {"datetime": "2025-05-20T13:30:00+00:00", "open": 5845, "high": 5860, "low": 5840, "close": 5855, "volume": 12}
            ]"#,
        )
        .unwrap();

        let out_dir = dir.path().join("out");
        run(Config::default(), Some(input), Some(out_dir.clone()))
            .await
            .unwrap();

        let gaps: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out_dir.join("es_gapfills.json")).unwrap())
                .unwrap();
        assert_eq!(gaps[0]["prev_close"], 5850.0);
        assert_eq!(gaps[0]["gap"], -5.0);
        assert_eq!(gaps[0]["full_gap_filled"], true);
    }
}
