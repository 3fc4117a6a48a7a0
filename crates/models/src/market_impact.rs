//! Almgren-Chriss style market impact estimate.
//!
//! ```text
//! eta    = 0.1 * mean(ask_i - bid_i) / mean(level quantity)   temporary
//! gamma  = 0.05 / sqrt(price_levels)                          permanent
//! lambda = 0.1 * (1 + volatility)                             risk aversion
//! T      = 300 * (1 + log10(quantity) / 3 + 2 * volatility)   seconds
//!
//! impact     = eta * q / T + gamma * q + lambda * volatility * sqrt(T)
//! impact_pct = impact / q * 100
//! ```
//!
//! The model is stateless. Degenerate input yields `0.0` from
//! [`MarketImpactModel::calculate`]; [`MarketImpactModel::estimate`] reports
//! the reason instead.

use crate::error::DomainError;
use crate::features::BookFeatures;
use algo_cost_core::Snapshot;
use tracing::warn;

const TEMPORARY_SCALE: f64 = 0.1;
const PERMANENT_SCALE: f64 = 0.05;
const RISK_AVERSION_BASE: f64 = 0.1;
const BASE_HORIZON_SECS: f64 = 300.0;

/// Components of one impact estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactBreakdown {
    /// Temporary impact coefficient
    pub eta: f64,
    /// Permanent impact coefficient
    pub gamma: f64,
    /// Risk aversion
    pub lambda: f64,
    /// Execution horizon in seconds
    pub horizon_secs: f64,
    /// `eta * q / T`
    pub temporary: f64,
    /// `gamma * q`
    pub permanent: f64,
    /// `lambda * volatility * sqrt(T)`
    pub risk: f64,
    /// Total impact as a percentage of quantity
    pub impact_pct: f64,
}

/// Market impact model.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketImpactModel;

impl MarketImpactModel {
    /// Creates the model.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Impact in percent, or `0.0` if the book or inputs are degenerate.
    #[must_use]
    pub fn calculate(&self, snapshot: &Snapshot, quantity: f64, volatility: f64) -> f64 {
        match BookFeatures::extract(snapshot, quantity) {
            Ok(features) => self.calculate_from_features(&features, volatility),
            Err(e) => {
                warn!(error = %e, quantity, "Market impact unavailable, using 0");
                0.0
            }
        }
    }

    /// Impact in percent from pre-extracted features, `0.0` on domain error.
    #[must_use]
    pub fn calculate_from_features(&self, features: &BookFeatures, volatility: f64) -> f64 {
        match self.estimate(features, volatility) {
            Ok(breakdown) => breakdown.impact_pct,
            Err(e) => {
                warn!(error = %e, quantity = features.quantity, volatility, "Market impact unavailable, using 0");
                0.0
            }
        }
    }

    /// Full impact breakdown.
    ///
    /// # Errors
    /// - [`DomainError::Volatility`] if volatility is outside [0, 1]
    /// - [`DomainError::Horizon`] if the horizon is not positive, which
    ///   happens for very small quantities
    /// - [`DomainError::NonFinite`] if any term is NaN or infinite
    pub fn estimate(
        &self,
        features: &BookFeatures,
        volatility: f64,
    ) -> Result<ImpactBreakdown, DomainError> {
        if !(0.0..=1.0).contains(&volatility) {
            return Err(DomainError::Volatility(volatility));
        }
        let q = features.quantity;
        if !(q.is_finite() && q > 0.0) {
            return Err(DomainError::NonPositiveQuantity(q));
        }

        let eta = TEMPORARY_SCALE * features.mean_level_spread / features.mean_level_quantity;
        let gamma = PERMANENT_SCALE / (features.price_levels as f64).sqrt();
        let lambda = RISK_AVERSION_BASE * (1.0 + volatility);

        let horizon_secs =
            BASE_HORIZON_SECS * (1.0 + features.log_quantity / 3.0 + volatility * 2.0);
        if horizon_secs.is_nan() || horizon_secs <= 0.0 {
            return Err(DomainError::Horizon(horizon_secs));
        }

        let temporary = eta * q / horizon_secs;
        let permanent = gamma * q;
        let risk = lambda * volatility * horizon_secs.sqrt();
        let impact_pct = (temporary + permanent + risk) / q * 100.0;

        if !impact_pct.is_finite() {
            return Err(DomainError::NonFinite("market impact"));
        }

        Ok(ImpactBreakdown {
            eta,
            gamma,
            lambda,
            horizon_secs,
            temporary,
            permanent,
            risk,
            impact_pct,
        })
    }
}
