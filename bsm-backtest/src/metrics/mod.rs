//! Performance metrics module.
//!
//! Shared by both simulation engines:
//! - Maximum drawdown (incremental tracker and whole-series analysis)
//! - Total return
//! - Sharpe-style ratios (legacy value-based, returns-based)

pub mod calculator;
pub mod drawdown;

pub use calculator::{MetricsCalculator, SampleStats, PERIODS_PER_YEAR};
pub use drawdown::{analyze_drawdown, max_drawdown, DrawdownAnalysis, DrawdownTracker};
