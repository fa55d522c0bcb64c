//! Risk management module.
//!
//! Provides:
//! - Fixed-fractional position sizing
//! - Threshold stop-loss decisions

pub mod position_sizer;
pub mod stop_loss;

pub use position_sizer::{position_size, risk_amount};
pub use stop_loss::{should_stop_loss, stop_price};
