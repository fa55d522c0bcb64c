//! Market data types and the CSV price loader.

pub mod loader;
pub mod types;

pub use loader::{LoaderError, PriceLoader};
pub use types::{Greeks, MarketState, OptionContract, OptionType, PriceBar, PriceSeries};
