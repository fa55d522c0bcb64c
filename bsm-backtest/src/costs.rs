//! Transaction cost model.
//!
//! Linear in traded notional: cost = |shares| * price * rate.
//! Default rate: 0.1% of notional.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Proportional transaction cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionCostModel {
    /// Cost as a fraction of traded notional.
    pub rate: f64,
}

impl Default for TransactionCostModel {
    fn default() -> Self {
        Self { rate: 0.001 }
    }
}

impl TransactionCostModel {
    /// Create a cost model, rejecting negative or non-finite rates.
    pub fn new(rate: f64) -> Result<Self> {
        let model = Self { rate };
        model.validate()?;
        Ok(model)
    }

    /// Create a zero-cost model.
    pub fn zero() -> Self {
        Self { rate: 0.0 }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate.is_finite() && self.rate >= 0.0 {
            Ok(())
        } else {
            Err(SimError::invalid(format!(
                "transaction cost rate must be non-negative, got {}",
                self.rate
            )))
        }
    }

    /// Cost of trading `quantity` units (sign ignored) at `price`.
    pub fn cost(&self, quantity: f64, price: f64) -> f64 {
        quantity.abs() * price * self.rate
    }

    /// Cost of a round trip (entry + exit at the same price).
    pub fn round_trip(&self, quantity: f64, price: f64) -> f64 {
        2.0 * self.cost(quantity, price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate() {
        assert_eq!(TransactionCostModel::default().rate, 0.001);
    }

    #[test]
    fn test_cost_calculation() {
        let model = TransactionCostModel::new(0.001).unwrap();
        // 200 shares at $50 = $10,000 notional -> $10
        assert!((model.cost(200.0, 50.0) - 10.0).abs() < 1e-9);
        // Sign of the quantity does not matter
        assert_eq!(model.cost(-200.0, 50.0), model.cost(200.0, 50.0));
    }

    #[test]
    fn test_round_trip() {
        let model = TransactionCostModel::new(0.002).unwrap();
        assert!((model.round_trip(100.0, 10.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_cost() {
        let model = TransactionCostModel::zero();
        assert_eq!(model.cost(1_000.0, 123.45), 0.0);
    }

    #[test]
    fn test_negative_rate_rejected() {
        assert!(TransactionCostModel::new(-0.001).is_err());
        assert!(TransactionCostModel::new(f64::NAN).is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let model: TransactionCostModel = serde_json::from_str("0.0025").unwrap();
        assert_eq!(model.rate, 0.0025);
    }
}
