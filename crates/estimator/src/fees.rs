//! Exchange fee calculation over a tier table.

use crate::aggregator::EstimateError;
use algo_cost_core::FeeSchedule;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Calculator for trading fees by tier.
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
}

impl FeeCalculator {
    /// Creates a calculator over the default tier table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calculator over a custom tier table.
    #[must_use]
    pub fn with_schedule(schedule: FeeSchedule) -> Self {
        Self { schedule }
    }

    /// Returns the tier table.
    #[must_use]
    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    /// Rate for a tier.
    ///
    /// # Errors
    /// Returns [`EstimateError::UnknownFeeTier`] if the tier is not in the table.
    pub fn rate(&self, tier: &str) -> Result<Decimal, EstimateError> {
        self.schedule
            .rate(tier)
            .ok_or_else(|| EstimateError::UnknownFeeTier(tier.to_string()))
    }

    /// Fee for an order of `quantity` (quote currency) at `tier`.
    ///
    /// The fee is a flat percentage of the order value.
    ///
    /// # Errors
    /// Returns [`EstimateError::UnknownFeeTier`] for an unknown tier and
    /// [`EstimateError::FeeArithmetic`] if the quantity is not representable.
    pub fn calculate_fee(&self, quantity: f64, tier: &str) -> Result<Decimal, EstimateError> {
        let rate = self.rate(tier)?;
        let quantity = Decimal::from_f64(quantity).ok_or(EstimateError::FeeArithmetic)?;
        quantity
            .checked_mul(rate)
            .ok_or(EstimateError::FeeArithmetic)
    }

    /// [`FeeCalculator::calculate_fee`] as `f64`.
    ///
    /// # Errors
    /// Same as [`FeeCalculator::calculate_fee`].
    pub fn calculate_fee_f64(&self, quantity: f64, tier: &str) -> Result<f64, EstimateError> {
        self.calculate_fee(quantity, tier)?
            .to_f64()
            .ok_or(EstimateError::FeeArithmetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_tier_fees() {
        let calc = FeeCalculator::new();

        assert_eq!(calc.calculate_fee(500.0, "Tier 1").unwrap(), dec!(0.5));
        assert_eq!(calc.calculate_fee(500.0, "Tier 2").unwrap(), dec!(0.4));
        assert_eq!(calc.calculate_fee(500.0, "Tier 3").unwrap(), dec!(0.3));
        assert!((calc.calculate_fee_f64(100.0, "Tier 1").unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_tier() {
        let calc = FeeCalculator::new();
        assert_eq!(
            calc.calculate_fee(500.0, "VIP 9"),
            Err(EstimateError::UnknownFeeTier("VIP 9".to_string()))
        );
    }

    #[test]
    fn test_custom_schedule() {
        let calc = FeeCalculator::with_schedule(FeeSchedule::from_tiers([("Maker", dec!(0.0002))]));

        assert_eq!(calc.rate("Maker").unwrap(), dec!(0.0002));
        assert_eq!(calc.calculate_fee(10_000.0, "Maker").unwrap(), dec!(2));
        assert!(calc.rate("Tier 1").is_err());
    }

    #[test]
    fn test_non_finite_quantity() {
        let calc = FeeCalculator::new();
        assert_eq!(
            calc.calculate_fee(f64::NAN, "Tier 1"),
            Err(EstimateError::FeeArithmetic)
        );
    }
}
