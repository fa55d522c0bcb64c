//! Position and trade records for the backtester.
//!
//! A `Position` exists only while the engine is Open; closing it turns it
//! into a `Trade` in the run's trade log.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open stock position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Shares held (positive = long, negative = short).
    pub shares: i64,
    /// Fill price at entry.
    pub entry_price: f64,
    /// Bar the position was opened on.
    pub entry_date: NaiveDate,
    /// Transaction cost paid at entry.
    pub entry_cost: Decimal,
    /// Option value at entry (reference only).
    pub option_price: f64,
    /// Option delta at entry (reference only).
    pub delta: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.shares > 0
    }

    pub fn is_short(&self) -> bool {
        self.shares < 0
    }

    /// Mark-to-market value at `price`.
    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.shares) * price
    }

    /// Price P&L at `price`, before costs.
    pub fn unrealized_pnl(&self, price: Decimal, entry_price: Decimal) -> Decimal {
        Decimal::from(self.shares) * (price - entry_price)
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    /// Liquidated on the last bar of the run.
    EndOfPeriod,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopLoss => write!(f, "stop loss"),
            Self::EndOfPeriod => write!(f, "end of period"),
        }
    }
}

/// Option valuation recorded when a position is opened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub date: NaiveDate,
    pub spot: f64,
    pub shares: i64,
    pub option_price: f64,
    pub delta: f64,
}

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub shares: i64,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub entry_cost: Decimal,
    pub exit_cost: Decimal,
    /// Realized P&L net of both costs.
    pub pnl: Decimal,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    pub fn total_cost(&self) -> Decimal {
        self.entry_cost + self.exit_cost
    }

    pub fn days_held(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}
