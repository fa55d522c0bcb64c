//! Core data types for pricing and simulation.
//!
//! Option terms, market inputs, Greeks and the historical price series the
//! backtester replays.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_positive, Result, SimError};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl FromStr for OptionType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "c" | "call" => Ok(Self::Call),
            "p" | "put" => Ok(Self::Put),
            other => Err(SimError::invalid(format!(
                "option type must be 'call' or 'put', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Greeks for an option contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

impl Greeks {
    /// All sensitivities zero (the expiry convention).
    pub const ZERO: Greeks = Greeks {
        delta: 0.0,
        gamma: 0.0,
        theta: 0.0,
        vega: 0.0,
        rho: 0.0,
    };
}

/// Terms of a European option, fixed for a valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Strike price.
    pub strike: f64,
    /// Time to maturity in years.
    pub maturity: f64,
    /// Call or put.
    pub kind: OptionType,
}

impl OptionContract {
    pub fn new(strike: f64, maturity: f64, kind: OptionType) -> Result<Self> {
        ensure_positive("strike", strike)?;
        ensure_finite("maturity", maturity)?;
        if maturity < 0.0 {
            return Err(SimError::invalid(format!(
                "maturity must be non-negative, got {maturity}"
            )));
        }
        Ok(Self {
            strike,
            maturity,
            kind,
        })
    }
}

/// Market inputs supplied at each valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub spot: f64,
    pub rate: f64,
    pub volatility: f64,
}

impl MarketState {
    pub fn new(spot: f64, rate: f64, volatility: f64) -> Self {
        Self {
            spot,
            rate,
            volatility,
        }
    }
}

/// A single daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Chronologically ordered closes for one underlying.
///
/// Guaranteed non-empty, with strictly increasing dates and positive prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        if bars.is_empty() {
            return Err(SimError::empty("price series has no bars"));
        }

        for (i, bar) in bars.iter().enumerate() {
            if !(bar.close.is_finite() && bar.close > 0.0) {
                return Err(SimError::invalid(format!(
                    "close on {} must be positive, got {}",
                    bar.date, bar.close
                )));
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(SimError::invalid(format!(
                    "dates must be strictly increasing: {} follows {}",
                    bar.date,
                    bars[i - 1].date
                )));
            }
        }

        Ok(Self { bars })
    }

    /// Build a series of consecutive calendar days starting at `start`.
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Result<Self> {
        let bars = closes
            .iter()
            .zip(start.iter_days())
            .map(|(&close, date)| PriceBar::new(date, close))
            .collect();
        Self::new(bars)
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_option_type_parse() {
        assert_eq!("call".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!("PUT".parse::<OptionType>().unwrap(), OptionType::Put);
        assert_eq!("c".parse::<OptionType>().unwrap(), OptionType::Call);
        assert!(matches!(
            "straddle".parse::<OptionType>(),
            Err(SimError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_option_type_serde() {
        let json = serde_json::to_string(&OptionType::Put).unwrap();
        assert_eq!(json, "\"put\"");
    }

    #[test]
    fn test_contract_validation() {
        assert!(OptionContract::new(100.0, 1.0, OptionType::Call).is_ok());
        assert!(OptionContract::new(100.0, 0.0, OptionType::Call).is_ok());
        assert!(OptionContract::new(0.0, 1.0, OptionType::Call).is_err());
        assert!(OptionContract::new(100.0, -0.5, OptionType::Put).is_err());
    }

    #[test]
    fn test_series_rejects_empty() {
        assert!(matches!(
            PriceSeries::new(vec![]),
            Err(SimError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let bars = vec![PriceBar::new(day(2), 100.0), PriceBar::new(day(2), 101.0)];
        assert!(matches!(
            PriceSeries::new(bars),
            Err(SimError::InvalidArgument(_))
        ));

        let bars = vec![PriceBar::new(day(3), 100.0), PriceBar::new(day(2), 101.0)];
        assert!(PriceSeries::new(bars).is_err());
    }

    #[test]
    fn test_series_rejects_bad_prices() {
        let bars = vec![PriceBar::new(day(1), 100.0), PriceBar::new(day(2), 0.0)];
        assert!(PriceSeries::new(bars).is_err());
    }

    #[test]
    fn test_from_closes() {
        let series = PriceSeries::from_closes(day(1), &[100.0, 101.0, 102.0]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.first_date(), day(1));
        assert_eq!(series.last_date(), day(3));
        assert_eq!(series.closes(), vec![100.0, 101.0, 102.0]);
    }
}
