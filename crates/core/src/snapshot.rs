//! Validated order book snapshot.
//!
//! A [`Snapshot`] is one point-in-time, fully-replaced view of an order book.
//! It is built exactly once per inbound feed message and never mutated
//! afterwards; each update is independent and no history is kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side of the book a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookSide {
    /// Sell orders, sorted ascending by price.
    Ask,
    /// Buy orders, sorted descending by price.
    Bid,
}

impl std::fmt::Display for BookSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ask => write!(f, "asks"),
            Self::Bid => write!(f, "bids"),
        }
    }
}

/// Errors raised while validating a snapshot.
///
/// Every variant is a per-message failure: the feed drops the message and
/// keeps reading.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SnapshotError {
    /// Frame is not a JSON object.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A required field is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field has the wrong shape.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Timestamp could not be parsed as ISO-8601.
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    /// A price or quantity could not be read as a number.
    #[error("invalid number {value:?} in {side}")]
    InvalidNumber {
        /// Side the level belongs to
        side: BookSide,
        /// Raw wire value
        value: String,
    },

    /// One side of the book has no levels.
    #[error("{0} are empty")]
    EmptySide(BookSide),

    /// A price or quantity is zero, negative, or not finite.
    #[error("non-positive or non-finite level in {side} at index {index}: price={price}, quantity={quantity}")]
    InvalidLevel {
        /// Side the level belongs to
        side: BookSide,
        /// Level index
        index: usize,
        /// Level price
        price: f64,
        /// Level quantity
        quantity: f64,
    },

    /// Levels are not in the required price order.
    #[error("{side} out of order at index {index}")]
    Unsorted {
        /// Side the level belongs to
        side: BookSide,
        /// First offending index
        index: usize,
    },
}

/// A single price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price
    pub price: f64,
    /// Resting quantity at this price
    pub quantity: f64,
}

impl PriceLevel {
    /// Creates a new price level.
    #[must_use]
    pub const fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }

    /// Notional value of the level (`price * quantity`).
    #[must_use]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

impl From<(f64, f64)> for PriceLevel {
    fn from((price, quantity): (f64, f64)) -> Self {
        Self { price, quantity }
    }
}

/// One validated order book update.
///
/// Invariants established by [`Snapshot::new`]:
/// - `asks` strictly ascending by price (best ask first)
/// - `bids` strictly descending by price (best bid first)
/// - both sides non-empty, all prices and quantities finite and > 0
///
/// A crossed book (best bid above best ask) is valid input and is passed
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Exchange timestamp of the update
    pub timestamp: DateTime<Utc>,
    /// Exchange name (e.g., "okx")
    pub exchange: String,
    /// Instrument symbol (e.g., "BTC-USDT-SWAP")
    pub symbol: String,
    /// Ask levels, best first
    pub asks: Vec<PriceLevel>,
    /// Bid levels, best first
    pub bids: Vec<PriceLevel>,
}

impl Snapshot {
    /// Creates a validated snapshot.
    ///
    /// # Errors
    /// Returns [`SnapshotError`] if any book invariant is violated.
    pub fn new(
        timestamp: DateTime<Utc>,
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        asks: Vec<PriceLevel>,
        bids: Vec<PriceLevel>,
    ) -> Result<Self, SnapshotError> {
        validate_side(&asks, BookSide::Ask)?;
        validate_side(&bids, BookSide::Bid)?;

        Ok(Self {
            timestamp,
            exchange: exchange.into(),
            symbol: symbol.into(),
            asks,
            bids,
        })
    }

    /// Returns the best (lowest) ask level.
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Returns the best (highest) bid level.
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Returns the mid price, if both sides have liquidity.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some((ask.price + bid.price) / 2.0),
            _ => None,
        }
    }

    /// Returns `best_ask - best_bid`. Negative for a crossed book.
    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Returns true if the best bid is above the best ask.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        self.spread().is_some_and(|s| s < 0.0)
    }

    /// Number of ask levels.
    #[must_use]
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Number of bid levels.
    #[must_use]
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }
}

fn validate_side(levels: &[PriceLevel], side: BookSide) -> Result<(), SnapshotError> {
    if levels.is_empty() {
        return Err(SnapshotError::EmptySide(side));
    }

    for (index, level) in levels.iter().enumerate() {
        let valid = level.price.is_finite()
            && level.quantity.is_finite()
            && level.price > 0.0
            && level.quantity > 0.0;
        if !valid {
            return Err(SnapshotError::InvalidLevel {
                side,
                index,
                price: level.price,
                quantity: level.quantity,
            });
        }
    }

    let out_of_order = levels.windows(2).position(|pair| match side {
        BookSide::Ask => pair[1].price <= pair[0].price,
        BookSide::Bid => pair[1].price >= pair[0].price,
    });
    if let Some(index) = out_of_order {
        return Err(SnapshotError::Unsorted {
            side,
            index: index + 1,
        });
    }

    Ok(())
}
