//! Command line interface for the Market Scenario Generator
//!
//! Wires a price provider to the simulation engine and prints the resulting
//! report as JSON:
//! - Load price histories from a directory of `<symbol>.json` files
//! - Run a single-asset or portfolio scenario
//! - Emit the full report, or just the risk statistics

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scengen_core::{AssetClass, ModelKind, SimulationConfig, SimulationOutcome, SimulationRequest};
use scengen_data::{JsonFileProvider, PriceProvider};
use scengen_sim::ScenarioEngine;

/// Market scenario generator
#[derive(Parser, Debug)]
#[clap(name = "scengen", version, about, long_about = None)]
struct Args {
    /// Ticker symbols; several symbols run a correlated portfolio
    #[clap(short, long, required = true, num_args = 1..)]
    symbols: Vec<String>,

    /// Directory holding <symbol>.json price files
    #[clap(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Historical lookback window in years
    #[clap(short = 'y', long, default_value = "3")]
    lookback_years: u32,

    /// Simulation horizon in trading days
    #[clap(long, default_value = "252")]
    horizon: usize,

    /// Number of Monte Carlo paths
    #[clap(short = 'p', long, default_value = "1000")]
    paths: usize,

    /// Return model: gaussian, gmm, or ewma
    #[clap(short, long, default_value = "gaussian")]
    model: String,

    /// Portfolio weights, comma separated; equal weighting when omitted
    #[clap(short, long, value_delimiter = ',')]
    weights: Option<Vec<f64>>,

    /// Seed for the request-scoped random generator
    #[clap(long, default_value = "42")]
    seed: u64,

    /// Asset class for outlier filtering: equity or crypto
    #[clap(short, long, default_value = "equity")]
    asset_class: String,

    /// Path to an engine configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Print only the risk statistics
    #[clap(long)]
    risk_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)
            .with_context(|| format!("failed to load config from {path:?}"))?,
        None => SimulationConfig::default(),
    };

    let request = SimulationRequest {
        symbols: args.symbols.clone(),
        lookback_years: args.lookback_years,
        horizon_days: args.horizon,
        num_paths: args.paths,
        model: ModelKind::from_str(&args.model)?,
        weights: args.weights.clone(),
        seed: Some(args.seed),
        asset_class: parse_asset_class(&args.asset_class)?,
    };
    request.validate()?;

    let provider = JsonFileProvider::new(&args.data_dir);
    let mut series = Vec::with_capacity(request.symbols.len());
    for symbol in &request.symbols {
        let fetched = provider
            .fetch(symbol, request.lookback_years)
            .await
            .with_context(|| format!("failed to load prices for {symbol}"))?;
        info!(symbol = %symbol, observations = fetched.len(), "loaded price history");
        series.push(fetched);
    }

    let engine = ScenarioEngine::new(config);
    let outcome = engine.run(&request, &series)?;

    let rendered = if args.risk_only {
        match &outcome {
            SimulationOutcome::Single(report) => serde_json::to_string_pretty(&report.risk)?,
            SimulationOutcome::Portfolio(report) => serde_json::to_string_pretty(&report.risk)?,
        }
    } else {
        serde_json::to_string_pretty(&outcome)?
    };
    println!("{rendered}");

    Ok(())
}

fn parse_asset_class(value: &str) -> Result<AssetClass> {
    match value {
        "equity" => Ok(AssetClass::Equity),
        "crypto" => Ok(AssetClass::Crypto),
        other => anyhow::bail!("unknown asset class: {other} (expected equity or crypto)"),
    }
}
