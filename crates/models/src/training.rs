//! Historical observations used to fit the trainable models.

use crate::maker_taker::ExecutionType;
use algo_cost_core::Snapshot;
use serde::{Deserialize, Serialize};

/// Observed slippage for an order placed against a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippageSample {
    /// Book at order time
    pub snapshot: Snapshot,
    /// Order size in quote currency
    pub quantity: f64,
    /// Realised slippage in percent
    pub actual_slippage: f64,
}

/// Observed execution type for an order placed against a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSample {
    /// Book at order time
    pub snapshot: Snapshot,
    /// Order size in quote currency
    pub quantity: f64,
    /// Whether the order rested or crossed
    pub execution: ExecutionType,
}
