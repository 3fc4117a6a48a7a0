//! Transaction-cost estimation over streamed order book snapshots.
//!
//! [`CostAggregator`] subscribes to the feed, runs the cost models once per
//! snapshot with the order parameters currently in force, adds exchange
//! fees, and publishes a [`CostEstimate`].

pub mod aggregator;
pub mod fees;
pub mod formatter;

pub use aggregator::{CostAggregator, CostEstimate, CostModels, EstimateError};
pub use fees::FeeCalculator;
pub use formatter::EstimateFormatter;
