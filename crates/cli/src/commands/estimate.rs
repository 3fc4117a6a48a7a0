//! One-shot cost estimate from a snapshot file.

use algo_cost_core::ConfigLoader;
use algo_cost_estimator::{CostAggregator, CostEstimate, CostModels, EstimateFormatter, FeeCalculator};
use algo_cost_feed::parse_snapshot;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the estimate command.
#[derive(Args, Debug, Clone)]
pub struct EstimateArgs {
    /// Snapshot file in feed wire format
    pub snapshot: PathBuf,

    /// Order size in USD (defaults to the config file)
    #[arg(short, long)]
    pub quantity: Option<f64>,

    /// Volatility as a fraction, e.g. 0.01 (defaults to the config file)
    #[arg(short, long)]
    pub volatility: Option<f64>,

    /// Fee tier name (defaults to the config file)
    #[arg(short, long)]
    pub fee_tier: Option<String>,

    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: PathBuf,

    /// Print the estimate as JSON
    #[arg(long)]
    pub json: bool,
}

/// Runs the estimate command.
///
/// # Errors
/// Returns an error if the config or snapshot cannot be read, or the order
/// parameters are invalid.
pub fn run_estimate(args: EstimateArgs) -> Result<()> {
    let estimate = estimate_from_args(&args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        print!("{}", EstimateFormatter::format(&estimate));
    }
    Ok(())
}

fn estimate_from_args(args: &EstimateArgs) -> Result<CostEstimate> {
    let config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let text = std::fs::read_to_string(&args.snapshot)
        .with_context(|| format!("reading {}", args.snapshot.display()))?;
    let snapshot = parse_snapshot(&text)
        .with_context(|| format!("parsing {}", args.snapshot.display()))?;

    let mut params = config.order.clone();
    if let Some(quantity) = args.quantity {
        params.quantity = quantity;
    }
    if let Some(volatility) = args.volatility {
        params.volatility = volatility;
    }
    if let Some(tier) = &args.fee_tier {
        params.fee_tier.clone_from(tier);
    }

    let (_params_tx, params_rx) = watch::channel(params.clone());
    let aggregator = CostAggregator::new(
        Arc::new(CostModels::new()),
        FeeCalculator::with_schedule(config.fees),
        params_rx,
    );

    Ok(aggregator.estimate(&snapshot, &params)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_snapshot(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("algo-cost-{name}-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{
                "timestamp": "2025-05-04T10:39:13Z",
                "exchange": "okx",
                "symbol": "BTC-USDT-SWAP",
                "asks": [["100.5", "2"], ["101", "3"]],
                "bids": [["100", "2"], ["99.5", "3"]]
            }"#,
        )
        .unwrap();
        path
    }

    fn args(snapshot: PathBuf) -> EstimateArgs {
        EstimateArgs {
            snapshot,
            quantity: Some(500.0),
            volatility: Some(0.01),
            fee_tier: Some("Tier 2".to_string()),
            config: PathBuf::from("does-not-exist/Config.toml"),
            json: false,
        }
    }

    #[test]
    fn test_estimate_from_file() {
        let path = write_snapshot("estimate");
        let estimate = estimate_from_args(&args(path.clone())).unwrap();
        let _ = std::fs::remove_file(path);

        assert_eq!(estimate.symbol, "BTC-USDT-SWAP");
        assert_eq!(estimate.fee_tier, "Tier 2");
        assert!((estimate.fees - 0.4).abs() < 1e-12);
        assert!((estimate.maker_pct + estimate.taker_pct - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_tier_is_error() {
        let path = write_snapshot("tier");
        let mut bad = args(path.clone());
        bad.fee_tier = Some("Tier 9".to_string());

        let err = estimate_from_args(&bad).unwrap_err();
        let _ = std::fs::remove_file(path);
        assert!(err.to_string().contains("Tier 9"));
    }
}
