//! Option pricing.
//!
//! Black-Scholes closed-form values and Greeks for European calls and puts.

pub mod black_scholes;

pub use black_scholes::{
    call_put_prices, delta_profile, greeks, hedge_shares, intrinsic_value, price,
};
