//! User-chosen parameters of the hypothetical order being costed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest order size accepted, in quote currency.
pub const MIN_ORDER_QUANTITY: f64 = 0.01;

/// Largest order size accepted, in quote currency.
pub const MAX_ORDER_QUANTITY: f64 = 1_000_000.0;

/// Invalid order parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderParamsError {
    /// Quantity outside the accepted range.
    #[error("quantity {0} outside [0.01, 1000000]")]
    Quantity(f64),

    /// Volatility outside [0, 1].
    #[error("volatility {0} outside [0, 1]")]
    Volatility(f64),

    /// Empty fee tier name.
    #[error("fee tier must not be empty")]
    EmptyFeeTier,
}

/// Order parameters read by the cost aggregator on every snapshot.
///
/// These are edited externally (config file or presentation layer) and are
/// read-only from the estimator's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderParams {
    /// Order size in quote currency (USD)
    pub quantity: f64,
    /// Market volatility as a fraction (0.01 = 1%)
    pub volatility: f64,
    /// Fee tier name, looked up in the fee schedule
    pub fee_tier: String,
}

impl Default for OrderParams {
    fn default() -> Self {
        Self {
            quantity: 100.0,
            volatility: 0.01,
            fee_tier: "Tier 1".to_string(),
        }
    }
}

impl OrderParams {
    /// Creates order parameters without validation.
    #[must_use]
    pub fn new(quantity: f64, volatility: f64, fee_tier: impl Into<String>) -> Self {
        Self {
            quantity,
            volatility,
            fee_tier: fee_tier.into(),
        }
    }

    /// Checks quantity range, volatility range, and tier name.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), OrderParamsError> {
        if !(MIN_ORDER_QUANTITY..=MAX_ORDER_QUANTITY).contains(&self.quantity) {
            return Err(OrderParamsError::Quantity(self.quantity));
        }
        if !(0.0..=1.0).contains(&self.volatility) {
            return Err(OrderParamsError::Volatility(self.volatility));
        }
        if self.fee_tier.trim().is_empty() {
            return Err(OrderParamsError::EmptyFeeTier);
        }
        Ok(())
    }
}
