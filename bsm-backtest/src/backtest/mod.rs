//! Backtesting engine for a single underlying.
//!
//! This module provides:
//! - The Flat/Open state machine stepped once per daily bar
//! - Position and trade records
//! - A parallel stop-loss parameter sweep

pub mod engine;
pub mod sweep;
pub mod trade;

pub use engine::{BacktestConfig, BacktestEngine, BacktestResult, BacktestState, EquityPoint};
pub use sweep::{run_sweep, StopLossGrid, SweepResult};
pub use trade::{Entry, ExitReason, Position, Trade};
