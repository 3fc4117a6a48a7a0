//! Streaming cost estimation.
//!
//! Connects to the order book feed, registers the cost aggregator as a
//! subscriber, and prints every new estimate until Ctrl+C. Order
//! parameters edited in the config file take effect on the next snapshot.

use super::samples::load_jsonl;
use algo_cost_core::{AppConfig, ConfigLoader, ConfigWatcher, OrderParams};
use algo_cost_estimator::{CostAggregator, CostEstimate, CostModels, EstimateFormatter, FeeCalculator};
use algo_cost_feed::{StreamConfig, StreamingClient};
use algo_cost_models::{ExecutionSample, SlippageSample};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: PathBuf,

    /// Feed URL, overriding the config file
    #[arg(long, env = "ALGO_COST_FEED_URL")]
    pub url: Option<String>,

    /// JSON Lines file of slippage observations to train on
    #[arg(long)]
    pub slippage_samples: Option<PathBuf>,

    /// JSON Lines file of maker/taker observations to train on
    #[arg(long)]
    pub execution_samples: Option<PathBuf>,

    /// Print estimates as JSON lines instead of a panel
    #[arg(long)]
    pub json: bool,

    /// Do not reload order parameters when the config file changes
    #[arg(long)]
    pub no_watch: bool,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long)]
    pub log_file: Option<String>,
}

/// Runs the streaming estimator until Ctrl+C.
///
/// # Errors
/// Returns an error if the config or training files cannot be loaded or
/// the first connection to the feed fails.
pub async fn run_stream(args: RunArgs) -> Result<()> {
    let mut config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(url) = &args.url {
        config.feed.url.clone_from(url);
    }

    info!(
        url = %config.feed.url,
        quantity = config.order.quantity,
        volatility = config.order.volatility,
        fee_tier = %config.order.fee_tier,
        "Starting cost estimator"
    );

    let models = Arc::new(CostModels::new());
    train_models(&models, &args)?;

    let (params_tx, params_rx) = watch::channel(config.order.clone());
    let aggregator = Arc::new(CostAggregator::new(
        Arc::clone(&models),
        FeeCalculator::with_schedule(config.fees.clone()),
        params_rx,
    ));

    let (config_watcher, config_rx) = ConfigWatcher::new(config.clone());
    if args.no_watch {
        drop(config_watcher);
    } else {
        let path = args.config.clone();
        tokio::spawn(async move {
            if let Err(e) = config_watcher.watch(path).await {
                warn!(error = %e, "Config watcher stopped");
            }
        });
    }
    let forwarder = tokio::spawn(forward_order_params(config_rx, params_tx));

    let client = StreamingClient::new(StreamConfig::from(&config.feed));
    client.register(aggregator.clone());
    client.connect().await.context("connecting to order book feed")?;

    let printer = tokio::spawn(print_estimates(aggregator.results(), args.json));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");

    client.close().await;
    forwarder.abort();
    printer.abort();

    let stats = client.stats();
    info!(
        frames = stats.frames_received,
        snapshots = stats.snapshots_dispatched,
        invalid = stats.validation_failures,
        dropped = stats.deliveries_dropped,
        reconnections = stats.reconnections,
        "Feed statistics"
    );

    Ok(())
}

fn train_models(models: &CostModels, args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.slippage_samples {
        let samples: Vec<SlippageSample> = load_jsonl(path)?;
        info!(path = %path.display(), samples = samples.len(), "Training slippage model");
        if !models.slippage.train(&samples) {
            warn!("Slippage model left untrained, using heuristic");
        }
    }

    if let Some(path) = &args.execution_samples {
        let samples: Vec<ExecutionSample> = load_jsonl(path)?;
        info!(path = %path.display(), samples = samples.len(), "Training maker/taker model");
        if !models.maker_taker.train(&samples) {
            warn!("Maker/taker model left untrained, using heuristic");
        }
    }

    Ok(())
}

/// Copies order parameter changes from reloaded configs into the
/// aggregator's parameter channel.
async fn forward_order_params(
    mut config_rx: watch::Receiver<AppConfig>,
    params_tx: watch::Sender<OrderParams>,
) {
    while config_rx.changed().await.is_ok() {
        let order = config_rx.borrow_and_update().order.clone();
        let changed = params_tx.send_if_modified(|current| {
            if *current == order {
                false
            } else {
                *current = order;
                true
            }
        });
        if changed {
            let params = params_tx.borrow();
            info!(
                quantity = params.quantity,
                volatility = params.volatility,
                fee_tier = %params.fee_tier,
                "Order parameters updated"
            );
        }
    }
}

async fn print_estimates(mut results: watch::Receiver<Option<Arc<CostEstimate>>>, json: bool) {
    while results.changed().await.is_ok() {
        let Some(estimate) = results.borrow_and_update().clone() else {
            continue;
        };

        if json {
            match serde_json::to_string(estimate.as_ref()) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to serialize estimate"),
            }
        } else {
            print!("{}", EstimateFormatter::format(&estimate));
        }
    }
}
