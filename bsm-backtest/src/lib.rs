//! Black-Scholes option pricing with two simulation engines built on it:
//! a single-underlying strategy backtester and a dynamic delta-hedging
//! simulator, both governed by a shared risk policy.

pub mod backtest;
pub mod config;
pub mod costs;
pub mod data;
pub mod error;
pub mod events;
pub mod hedging;
pub mod metrics;
pub mod pricing;
pub mod risk;

// Re-export commonly used types
pub use backtest::{BacktestConfig, BacktestEngine, BacktestResult, StopLossGrid, Trade};
pub use config::{AppConfig, ConfigError};
pub use costs::TransactionCostModel;
pub use data::{Greeks, MarketState, OptionContract, OptionType, PriceLoader, PriceSeries};
pub use error::{Result, SimError};
pub use events::{EventSink, MemorySink, NullSink, Severity, SimEvent, TracingSink};
pub use hedging::{run_batch, HedgeConfig, HedgeEngine, HedgeResult};
pub use metrics::MetricsCalculator;
pub use risk::{position_size, should_stop_loss};
