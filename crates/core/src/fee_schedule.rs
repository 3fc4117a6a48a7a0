//! Static exchange fee tier table.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tier 1 taker rate (0.10%).
pub const TIER_1_RATE: Decimal = dec!(0.001);

/// Tier 2 taker rate (0.08%).
pub const TIER_2_RATE: Decimal = dec!(0.0008);

/// Tier 3 taker rate (0.06%).
pub const TIER_3_RATE: Decimal = dec!(0.0006);

/// Mapping from tier name to fee rate (as decimal, e.g., 0.001 for 0.1%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeSchedule {
    tiers: BTreeMap<String, Decimal>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::from_tiers([
            ("Tier 1", TIER_1_RATE),
            ("Tier 2", TIER_2_RATE),
            ("Tier 3", TIER_3_RATE),
        ])
    }
}

impl FeeSchedule {
    /// Builds a schedule from `(name, rate)` pairs.
    pub fn from_tiers<I, S>(tiers: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        Self {
            tiers: tiers.into_iter().map(|(n, r)| (n.into(), r)).collect(),
        }
    }

    /// Returns the rate for a tier.
    #[must_use]
    pub fn rate(&self, tier: &str) -> Option<Decimal> {
        self.tiers.get(tier).copied()
    }

    /// Tier names in sorted order.
    pub fn tier_names(&self) -> impl Iterator<Item = &str> {
        self.tiers.keys().map(String::as_str)
    }

    /// Number of tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Returns true if no tiers are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}
