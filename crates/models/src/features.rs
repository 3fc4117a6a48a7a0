//! Feature extraction from an order book snapshot.
//!
//! Pure functions: a snapshot and an order quantity in, numbers out. The
//! result is computed once per snapshot and shared by all three models.

use crate::error::DomainError;
use algo_cost_core::{PriceLevel, Snapshot};

/// Number of features in the slippage vector.
pub const SLIPPAGE_FEATURES: usize = 5;

/// Number of features in the maker/taker vector.
pub const MAKER_TAKER_FEATURES: usize = 6;

/// Numeric description of a book relative to an order quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookFeatures {
    /// `(best_ask + best_bid) / 2`
    pub mid_price: f64,
    /// `best_ask - best_bid`, negative for a crossed book
    pub spread: f64,
    /// Spread as a percentage of mid
    pub spread_pct: f64,
    /// Sum of `price * quantity` over asks
    pub ask_depth: f64,
    /// Sum of `price * quantity` over bids
    pub bid_depth: f64,
    /// `ask_depth + bid_depth`
    pub total_depth: f64,
    /// `(ask_depth - bid_depth) / total_depth`
    pub depth_imbalance: f64,
    /// Number of ask levels
    pub price_levels: usize,
    /// Order quantity the features were computed for
    pub quantity: f64,
    /// `quantity / total_depth`
    pub quantity_ratio: f64,
    /// Book pressure, `(ask_depth - bid_depth) / (ask_depth + bid_depth)`
    pub pressure: f64,
    /// `log10(quantity)`
    pub log_quantity: f64,
    /// Mean of `ask_i - bid_i` over levels present on both sides
    pub mean_level_spread: f64,
    /// Mean resting quantity over all levels
    pub mean_level_quantity: f64,
}

impl BookFeatures {
    /// Extracts features for an order of `quantity`.
    ///
    /// # Errors
    /// - [`DomainError::EmptyBook`] if either side has no levels
    /// - [`DomainError::NonPositiveQuantity`] if `quantity` is not positive
    /// - [`DomainError::ZeroDepth`] if the book carries no notional
    pub fn extract(snapshot: &Snapshot, quantity: f64) -> Result<Self, DomainError> {
        let (Some(best_ask), Some(best_bid)) = (snapshot.best_ask(), snapshot.best_bid()) else {
            return Err(DomainError::EmptyBook);
        };
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(DomainError::NonPositiveQuantity(quantity));
        }

        let mid_price = (best_ask.price + best_bid.price) / 2.0;
        if !(mid_price.is_finite() && mid_price > 0.0) {
            return Err(DomainError::NonFinite("mid price"));
        }
        let spread = best_ask.price - best_bid.price;

        let ask_depth = depth(&snapshot.asks);
        let bid_depth = depth(&snapshot.bids);
        let total_depth = ask_depth + bid_depth;
        if total_depth == 0.0 {
            return Err(DomainError::ZeroDepth);
        }
        if !total_depth.is_finite() {
            return Err(DomainError::NonFinite("total depth"));
        }

        let depth_imbalance = (ask_depth - bid_depth) / total_depth;

        let paired = snapshot.asks.len().min(snapshot.bids.len());
        let mean_level_spread = snapshot
            .asks
            .iter()
            .zip(&snapshot.bids)
            .map(|(ask, bid)| ask.price - bid.price)
            .sum::<f64>()
            / paired as f64;

        let level_count = snapshot.asks.len() + snapshot.bids.len();
        let mean_level_quantity = snapshot
            .asks
            .iter()
            .chain(&snapshot.bids)
            .map(|level| level.quantity)
            .sum::<f64>()
            / level_count as f64;

        Ok(Self {
            mid_price,
            spread,
            spread_pct: spread / mid_price * 100.0,
            ask_depth,
            bid_depth,
            total_depth,
            depth_imbalance,
            price_levels: snapshot.asks.len(),
            quantity,
            quantity_ratio: quantity / total_depth,
            pressure: (ask_depth - bid_depth) / (ask_depth + bid_depth),
            log_quantity: quantity.log10(),
            mean_level_spread,
            mean_level_quantity,
        })
    }

    /// `[spread_pct, |depth_imbalance|, price_levels, quantity_ratio, log_quantity]`
    #[must_use]
    pub fn slippage_vector(&self) -> [f64; SLIPPAGE_FEATURES] {
        [
            self.spread_pct,
            self.depth_imbalance.abs(),
            self.price_levels as f64,
            self.quantity_ratio,
            self.log_quantity,
        ]
    }

    /// `[spread_pct, depth_imbalance, price_levels, quantity_ratio, pressure, log_quantity]`
    #[must_use]
    pub fn maker_taker_vector(&self) -> [f64; MAKER_TAKER_FEATURES] {
        [
            self.spread_pct,
            self.depth_imbalance,
            self.price_levels as f64,
            self.quantity_ratio,
            self.pressure,
            self.log_quantity,
        ]
    }
}

fn depth(levels: &[PriceLevel]) -> f64 {
    levels.iter().map(PriceLevel::notional).sum()
}
