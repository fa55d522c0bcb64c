//! Position sizing.
//!
//! Fixed-fractional sizing: risk a fraction of the account per trade, where
//! "risk" is the dollar move per share that would stop the trade out.
//!
//! shares = floor(account_size * risk_per_trade / stop_loss_distance)

use crate::error::{ensure_positive, Result, SimError};

/// Dollar amount put at risk on one trade.
pub fn risk_amount(account_size: f64, risk_per_trade: f64) -> f64 {
    account_size * risk_per_trade
}

/// Number of whole shares to trade.
///
/// # Arguments
/// * `account_size` - Account value available for the trade
/// * `risk_per_trade` - Fraction of the account to risk (e.g. 0.01 for 1%)
/// * `stop_loss_distance` - Dollar move per share that defines the loss
/// * `current_price` - Price the position would be entered at
///
/// # Errors
/// `InvalidArgument` for a non-positive stop distance or price, a negative
/// account, or a risk fraction outside [0, 1].
pub fn position_size(
    account_size: f64,
    risk_per_trade: f64,
    stop_loss_distance: f64,
    current_price: f64,
) -> Result<i64> {
    ensure_positive("stop_loss_distance", stop_loss_distance)?;
    ensure_positive("current_price", current_price)?;
    if !(account_size.is_finite() && account_size >= 0.0) {
        return Err(SimError::invalid(format!(
            "account_size must be non-negative, got {account_size}"
        )));
    }
    if !(0.0..=1.0).contains(&risk_per_trade) {
        return Err(SimError::invalid(format!(
            "risk_per_trade must be within [0, 1], got {risk_per_trade}"
        )));
    }

    let shares = (risk_amount(account_size, risk_per_trade) / stop_loss_distance).floor();
    Ok(shares as i64)
}
