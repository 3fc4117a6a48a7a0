//! Combines the cost models and fees into one estimate per snapshot.

use crate::fees::FeeCalculator;
use algo_cost_core::{OrderParams, OrderParamsError, Snapshot, SnapshotSubscriber};
use algo_cost_models::{
    BookFeatures, MakerTakerModel, MakerTakerSplit, MarketImpactModel, SlippageModel,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Errors that prevent an estimate from being produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimateError {
    /// Order parameters failed validation.
    #[error("invalid order parameters: {0}")]
    InvalidParams(#[from] OrderParamsError),

    /// Fee tier is not in the tier table.
    #[error("unknown fee tier: {0}")]
    UnknownFeeTier(String),

    /// Fee could not be computed in decimal arithmetic.
    #[error("fee arithmetic overflow")]
    FeeArithmetic,
}

/// One transaction-cost estimate for the order parameters in force when a
/// snapshot arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Snapshot timestamp
    pub timestamp: DateTime<Utc>,
    /// Exchange of the snapshot
    pub exchange: String,
    /// Symbol of the snapshot
    pub symbol: String,
    /// Order size in quote currency
    pub quantity: f64,
    /// Volatility used for the impact model
    pub volatility: f64,
    /// Fee tier used
    pub fee_tier: String,
    /// Mid price of the book
    pub mid_price: f64,
    /// Spread as a percentage of mid
    pub spread_pct: f64,
    /// Expected slippage, percent
    pub slippage_pct: f64,
    /// Expected market impact, percent
    pub impact_pct: f64,
    /// Exchange fee in quote currency
    pub fees: f64,
    /// `(slippage_pct + impact_pct) * quantity / 100 + fees`
    pub net_cost: f64,
    /// Chance of maker execution, percent
    pub maker_pct: f64,
    /// Chance of taker execution, percent
    pub taker_pct: f64,
    /// Wall time spent producing this estimate
    pub processing_time_ms: f64,
}

/// The three cost models, shared between the aggregator and training code.
#[derive(Debug, Default)]
pub struct CostModels {
    /// Market impact model
    pub impact: MarketImpactModel,
    /// Slippage model
    pub slippage: SlippageModel,
    /// Maker/taker model
    pub maker_taker: MakerTakerModel,
}

impl CostModels {
    /// Creates untrained models.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-snapshot cost estimator.
///
/// Reads the current [`OrderParams`] from a watch channel on every
/// snapshot and publishes each estimate on its own watch channel. Model
/// state is only read here, never trained.
pub struct CostAggregator {
    models: Arc<CostModels>,
    fees: FeeCalculator,
    params: watch::Receiver<OrderParams>,
    results_tx: watch::Sender<Option<Arc<CostEstimate>>>,
}

impl CostAggregator {
    /// Creates an aggregator reading order parameters from `params`.
    #[must_use]
    pub fn new(
        models: Arc<CostModels>,
        fees: FeeCalculator,
        params: watch::Receiver<OrderParams>,
    ) -> Self {
        let (results_tx, _) = watch::channel(None);
        Self {
            models,
            fees,
            params,
            results_tx,
        }
    }

    /// Estimates costs for `params` against `snapshot`.
    ///
    /// A book the models cannot use degrades to their safe defaults (no
    /// slippage, no impact, 50/50 split) instead of failing.
    ///
    /// # Errors
    /// Returns [`EstimateError`] for invalid parameters or an unknown fee tier.
    pub fn estimate(
        &self,
        snapshot: &Snapshot,
        params: &OrderParams,
    ) -> Result<CostEstimate, EstimateError> {
        let started = Instant::now();

        params.validate()?;
        let fees = self.fees.calculate_fee_f64(params.quantity, &params.fee_tier)?;

        let (mid_price, spread_pct, slippage_pct, impact_pct, split) =
            match BookFeatures::extract(snapshot, params.quantity) {
                Ok(features) => (
                    features.mid_price,
                    features.spread_pct,
                    self.models.slippage.calculate_from_features(&features),
                    self.models
                        .impact
                        .calculate_from_features(&features, params.volatility),
                    self.models.maker_taker.calculate_from_features(&features),
                ),
                Err(e) => {
                    warn!(error = %e, symbol = %snapshot.symbol, "Unusable book, using model defaults");
                    (
                        snapshot.mid_price().unwrap_or(0.0),
                        0.0,
                        0.0,
                        0.0,
                        MakerTakerSplit::NEUTRAL,
                    )
                }
            };

        let net_cost = (slippage_pct + impact_pct) * params.quantity / 100.0 + fees;

        Ok(CostEstimate {
            timestamp: snapshot.timestamp,
            exchange: snapshot.exchange.clone(),
            symbol: snapshot.symbol.clone(),
            quantity: params.quantity,
            volatility: params.volatility,
            fee_tier: params.fee_tier.clone(),
            mid_price,
            spread_pct,
            slippage_pct,
            impact_pct,
            fees,
            net_cost,
            maker_pct: split.maker_pct,
            taker_pct: split.taker_pct,
            processing_time_ms: started.elapsed().as_secs_f64() * 1_000.0,
        })
    }

    /// Estimates costs with the order parameters currently in force.
    ///
    /// # Errors
    /// Same as [`CostAggregator::estimate`].
    pub fn estimate_current(&self, snapshot: &Snapshot) -> Result<CostEstimate, EstimateError> {
        let params = self.params.borrow().clone();
        self.estimate(snapshot, &params)
    }

    /// Receiver of the latest estimate. `None` until the first one.
    #[must_use]
    pub fn results(&self) -> watch::Receiver<Option<Arc<CostEstimate>>> {
        self.results_tx.subscribe()
    }

    /// Latest estimate, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<CostEstimate>> {
        self.results_tx.borrow().clone()
    }

    /// The models this aggregator reads.
    #[must_use]
    pub fn models(&self) -> &Arc<CostModels> {
        &self.models
    }
}

#[async_trait]
impl SnapshotSubscriber for CostAggregator {
    async fn on_snapshot(&self, snapshot: Arc<Snapshot>) -> Result<()> {
        let estimate = self.estimate_current(&snapshot)?;
        debug!(
            symbol = %estimate.symbol,
            net_cost = estimate.net_cost,
            elapsed_ms = estimate.processing_time_ms,
            "Cost estimate"
        );
        self.results_tx.send_replace(Some(Arc::new(estimate)));
        Ok(())
    }

    fn name(&self) -> &str {
        "cost-aggregator"
    }
}
