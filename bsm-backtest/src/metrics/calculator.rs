//! Return and risk-adjusted return calculations.
//!
//! Two Sharpe-style figures are provided:
//! - `legacy_ratio`: mean and standard deviation of the portfolio *values*
//!   (not returns), relative to a base capital. Statistically nonstandard,
//!   kept because historical reports were produced with it.
//! - `sharpe_ratio`: mean over standard deviation of period returns,
//!   risk-free rate zero.
//!
//! Both are annualized by sqrt(252) and fail with `UndefinedMetric` rather
//! than returning NaN or infinity on zero variance.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Trading periods per year used for annualization.
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Summary statistics of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Mean and population standard deviation.
    pub fn sample_stats(values: &[f64]) -> Result<SampleStats> {
        if values.is_empty() {
            return Err(SimError::empty("statistics need at least one value"));
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Ok(SampleStats {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// Fractional change from `base` to `final_value`.
    pub fn total_return(final_value: f64, base: f64) -> Result<f64> {
        if base <= 0.0 || !base.is_finite() {
            return Err(SimError::undefined(format!(
                "total return needs a positive base, got {base}"
            )));
        }
        Ok((final_value - base) / base)
    }

    /// Simple period-over-period returns.
    pub fn period_returns(values: &[f64]) -> Vec<f64> {
        values.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
    }

    /// Value-based ratio: (mean(values) - base) / std(values) * sqrt(252).
    pub fn legacy_ratio(values: &[f64], base: f64) -> Result<f64> {
        let stats = Self::sample_stats(values)?;
        if stats.std_dev == 0.0 {
            return Err(SimError::undefined(
                "legacy ratio: portfolio values have zero variance",
            ));
        }
        Ok((stats.mean - base) / stats.std_dev * PERIODS_PER_YEAR.sqrt())
    }

    /// Returns-based Sharpe ratio (risk-free rate = 0), annualized.
    pub fn sharpe_ratio(values: &[f64]) -> Result<f64> {
        if values.len() < 2 {
            return Err(SimError::undefined(
                "sharpe ratio needs at least two values",
            ));
        }
        if values.iter().any(|v| *v == 0.0) {
            return Err(SimError::undefined(
                "sharpe ratio: returns from a zero value are undefined",
            ));
        }
        let returns = Self::period_returns(values);
        let stats = Self::sample_stats(&returns)?;
        if stats.std_dev == 0.0 {
            return Err(SimError::undefined("sharpe ratio: returns have zero variance"));
        }
        Ok(stats.mean / stats.std_dev * PERIODS_PER_YEAR.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stats() {
        let stats = MetricsCalculator::sample_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0])
            .unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
    }

    #[test]
    fn test_total_return() {
        let r = MetricsCalculator::total_return(110_000.0, 100_000.0).unwrap();
        assert!((r - 0.1).abs() < 1e-12);
        assert!(matches!(
            MetricsCalculator::total_return(5.0, 0.0),
            Err(SimError::UndefinedMetric(_))
        ));
    }

    #[test]
    fn test_legacy_ratio() {
        // mean 101, population std 1 -> (101 - 100) / 1 * sqrt(252)
        let r = MetricsCalculator::legacy_ratio(&[100.0, 102.0], 100.0).unwrap();
        assert!((r - 252.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_legacy_ratio_zero_variance() {
        let result = MetricsCalculator::legacy_ratio(&[100.0, 100.0, 100.0], 100.0);
        assert!(matches!(result, Err(SimError::UndefinedMetric(_))));
    }

    #[test]
    fn test_sharpe_ratio() {
        let values = [100.0, 101.0, 100.5, 102.0, 103.0];
        let sharpe = MetricsCalculator::sharpe_ratio(&values).unwrap();
        assert!(sharpe > 0.0);
    }

    #[test]
    fn test_sharpe_ratio_undefined() {
        assert!(MetricsCalculator::sharpe_ratio(&[100.0]).is_err());
        assert!(MetricsCalculator::sharpe_ratio(&[100.0, 100.0, 100.0]).is_err());
        assert!(MetricsCalculator::sharpe_ratio(&[0.0, 1.0]).is_err());
    }
}
