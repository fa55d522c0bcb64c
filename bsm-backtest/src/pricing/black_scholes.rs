//! Closed-form Black-Scholes pricing and Greeks for European options.
//!
//! Every function here is pure: no state is kept between calls, so they can
//! be used from any number of simulation runs at once.
//!
//! Expiry convention: when `time <= 0` the price is the intrinsic value and
//! all Greeks are exactly zero, whatever the volatility.
//!
//! Greeks are raw derivatives: theta per year, vega per unit of volatility,
//! rho per unit of rate.

use std::f64::consts::PI;

use statrs::distribution::{ContinuousCDF, Normal};

use crate::data::{Greeks, MarketState, OptionContract, OptionType};
use crate::error::{ensure_finite, ensure_positive, Result, SimError};

/// Standard normal CDF.
fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

/// Standard normal PDF.
fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Calculate d1 and d2.
fn d1_d2(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> (f64, f64) {
    let vol_sqrt_t = vol * time.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * time) / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

fn validate(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> Result<()> {
    ensure_positive("spot", spot)?;
    ensure_positive("strike", strike)?;
    ensure_finite("time to maturity", time)?;
    ensure_finite("rate", rate)?;
    if time > 0.0 && !(vol.is_finite() && vol > 0.0) {
        return Err(SimError::invalid(format!(
            "volatility must be positive before expiry, got {vol}"
        )));
    }
    Ok(())
}

/// Payoff if exercised now.
pub fn intrinsic_value(spot: f64, strike: f64, kind: OptionType) -> f64 {
    match kind {
        OptionType::Call => (spot - strike).max(0.0),
        OptionType::Put => (strike - spot).max(0.0),
    }
}

/// Option price.
pub fn price(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
    kind: OptionType,
) -> Result<f64> {
    validate(spot, strike, time, rate, vol)?;

    if time <= 0.0 {
        return Ok(intrinsic_value(spot, strike, kind));
    }

    let (d1, d2) = d1_d2(spot, strike, time, rate, vol);
    let discount = (-rate * time).exp();

    Ok(match kind {
        OptionType::Call => spot * norm_cdf(d1) - strike * discount * norm_cdf(d2),
        OptionType::Put => strike * discount * norm_cdf(-d2) - spot * norm_cdf(-d1),
    })
}

/// Delta, gamma, theta, vega and rho.
pub fn greeks(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
    kind: OptionType,
) -> Result<Greeks> {
    validate(spot, strike, time, rate, vol)?;

    if time <= 0.0 {
        return Ok(Greeks::ZERO);
    }

    let (d1, d2) = d1_d2(spot, strike, time, rate, vol);
    let sqrt_t = time.sqrt();
    let discount = (-rate * time).exp();
    let pdf_d1 = norm_pdf(d1);

    // Kind-independent terms
    let gamma = pdf_d1 / (spot * vol * sqrt_t);
    let vega = spot * pdf_d1 * sqrt_t;
    let decay = -(spot * pdf_d1 * vol) / (2.0 * sqrt_t);

    let (delta, theta, rho) = match kind {
        OptionType::Call => (
            norm_cdf(d1),
            decay - rate * strike * discount * norm_cdf(d2),
            strike * time * discount * norm_cdf(d2),
        ),
        OptionType::Put => (
            norm_cdf(d1) - 1.0,
            decay + rate * strike * discount * norm_cdf(-d2),
            -strike * time * discount * norm_cdf(-d2),
        ),
    };

    Ok(Greeks {
        delta,
        gamma,
        theta,
        vega,
        rho,
    })
}

/// Call and put prices for the same market state.
pub fn call_put_prices(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
) -> Result<(f64, f64)> {
    Ok((
        price(spot, strike, time, rate, vol, OptionType::Call)?,
        price(spot, strike, time, rate, vol, OptionType::Put)?,
    ))
}

/// Shares of the underlying that neutralise the delta of one long option.
pub fn hedge_shares(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
    kind: OptionType,
) -> Result<f64> {
    Ok(-greeks(spot, strike, time, rate, vol, kind)?.delta)
}

/// Delta across a range of spot prices, as `(spot, delta)` pairs.
pub fn delta_profile(
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
    kind: OptionType,
    spots: &[f64],
) -> Result<Vec<(f64, f64)>> {
    spots
        .iter()
        .map(|&s| Ok((s, greeks(s, strike, time, rate, vol, kind)?.delta)))
        .collect()
}

impl OptionContract {
    /// Value of this contract in a market state.
    pub fn value(&self, market: &MarketState) -> Result<f64> {
        price(
            market.spot,
            self.strike,
            self.maturity,
            market.rate,
            market.volatility,
            self.kind,
        )
    }

    /// Greeks of this contract in a market state.
    pub fn greeks(&self, market: &MarketState) -> Result<Greeks> {
        greeks(
            market.spot,
            self.strike,
            self.maturity,
            market.rate,
            market.volatility,
            self.kind,
        )
    }

    /// Intrinsic value at a given spot.
    pub fn payoff(&self, spot: f64) -> f64 {
        intrinsic_value(spot, self.strike, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-4;

    #[test]
    fn test_reference_call() {
        let p = price(100.0, 100.0, 1.0, 0.05, 0.2, OptionType::Call).unwrap();
        assert!((p - 10.4506).abs() < TOL, "call price {p}");

        let g = greeks(100.0, 100.0, 1.0, 0.05, 0.2, OptionType::Call).unwrap();
        assert!((g.delta - 0.6368).abs() < TOL, "call delta {}", g.delta);
    }

    #[test]
    fn test_reference_put() {
        let p = price(100.0, 100.0, 1.0, 0.05, 0.2, OptionType::Put).unwrap();
        assert!((p - 5.5735).abs() < TOL, "put price {p}");

        let g = greeks(100.0, 100.0, 1.0, 0.05, 0.2, OptionType::Put).unwrap();
        assert!((g.delta - (0.6368 - 1.0)).abs() < TOL);
    }

    #[test]
    fn test_atm_zero_rate_call_equals_put() {
        for &s in &[50.0, 100.0, 250.0] {
            let (call, put) = call_put_prices(s, s, 0.75, 0.0, 0.3).unwrap();
            assert!((call - put).abs() < 1e-9, "S={s}: call {call} put {put}");
        }
    }

    #[test]
    fn test_put_call_parity() {
        let cases = [
            (100.0, 100.0, 1.0, 0.05, 0.2),
            (80.0, 100.0, 0.25, 0.01, 0.4),
            (150.0, 120.0, 2.0, 0.07, 0.15),
            (100.0, 110.0, 0.01, -0.01, 0.6),
        ];
        for &(s, k, t, r, v) in &cases {
            let (call, put) = call_put_prices(s, k, t, r, v).unwrap();
            let parity = s - k * (-r * t).exp();
            assert!(
                (call - put - parity).abs() < 1e-9,
                "parity violated for S={s} K={k} T={t}"
            );
        }
    }

    #[test]
    fn test_expiry_intrinsic_and_zero_greeks() {
        for &(s, k) in &[(110.0, 100.0), (90.0, 100.0), (100.0, 100.0)] {
            for &vol in &[0.0, 0.2, 3.0] {
                let call = price(s, k, 0.0, 0.05, vol, OptionType::Call).unwrap();
                let put = price(s, k, 0.0, 0.05, vol, OptionType::Put).unwrap();
                assert_eq!(call, (s - k).max(0.0));
                assert_eq!(put, (k - s).max(0.0));

                let g = greeks(s, k, 0.0, 0.05, vol, OptionType::Call).unwrap();
                assert_eq!(g, Greeks::ZERO);
                let g = greeks(s, k, -0.1, 0.05, vol, OptionType::Put).unwrap();
                assert_eq!(g, Greeks::ZERO);
            }
        }
    }

    #[test]
    fn test_zero_vol_before_expiry_rejected() {
        let result = price(100.0, 100.0, 1.0, 0.05, 0.0, OptionType::Call);
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
        let result = greeks(100.0, 100.0, 1.0, 0.05, -0.2, OptionType::Put);
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
    }

    #[test]
    fn test_non_positive_inputs_rejected() {
        assert!(price(0.0, 100.0, 1.0, 0.05, 0.2, OptionType::Call).is_err());
        assert!(price(100.0, -5.0, 1.0, 0.05, 0.2, OptionType::Call).is_err());
        assert!(price(100.0, 100.0, f64::NAN, 0.05, 0.2, OptionType::Call).is_err());
        assert!(greeks(-1.0, 100.0, 0.0, 0.05, 0.2, OptionType::Put).is_err());
    }

    #[test]
    fn test_delta_monotonic_in_spot() {
        let spots: Vec<f64> = (50..=150).map(|s| s as f64).collect();

        let calls = delta_profile(100.0, 1.0, 0.05, 0.2, OptionType::Call, &spots).unwrap();
        for w in calls.windows(2) {
            assert!(w[1].1 >= w[0].1, "call delta decreased at S={}", w[1].0);
        }

        // Put delta rises from -1 toward 0, so its magnitude shrinks
        let puts = delta_profile(100.0, 1.0, 0.05, 0.2, OptionType::Put, &spots).unwrap();
        for w in puts.windows(2) {
            assert!(w[1].1 >= w[0].1, "put delta decreased at S={}", w[1].0);
            assert!(w[1].1.abs() <= w[0].1.abs(), "|put delta| grew at S={}", w[1].0);
        }
        assert!(puts.iter().all(|&(_, d)| (-1.0..=0.0).contains(&d)));
    }

    #[test]
    fn test_greeks_match_finite_differences() {
        let (s, k, t, r, v) = (105.0, 100.0, 0.5, 0.03, 0.25);
        let h = 1e-4;

        for kind in [OptionType::Call, OptionType::Put] {
            let g = greeks(s, k, t, r, v, kind).unwrap();
            let p = |s: f64, t: f64, r: f64, v: f64| price(s, k, t, r, v, kind).unwrap();

            let delta = (p(s + h, t, r, v) - p(s - h, t, r, v)) / (2.0 * h);
            let gamma = (p(s + h, t, r, v) - 2.0 * p(s, t, r, v) + p(s - h, t, r, v)) / (h * h);
            let vega = (p(s, t, r, v + h) - p(s, t, r, v - h)) / (2.0 * h);
            let rho = (p(s, t, r + h, v) - p(s, t, r - h, v)) / (2.0 * h);
            // Theta is the derivative with respect to calendar time, i.e. -dV/dT.
            let theta = -(p(s, t + h, r, v) - p(s, t - h, r, v)) / (2.0 * h);

            assert!((g.delta - delta).abs() < 1e-5, "{kind} delta");
            assert!((g.gamma - gamma).abs() < 1e-3, "{kind} gamma");
            assert!((g.vega - vega).abs() < 1e-3, "{kind} vega");
            assert!((g.rho - rho).abs() < 1e-3, "{kind} rho");
            assert!((g.theta - theta).abs() < 1e-3, "{kind} theta");
        }
    }

    #[test]
    fn test_gamma_vega_kind_independent() {
        let c = greeks(95.0, 100.0, 0.3, 0.02, 0.35, OptionType::Call).unwrap();
        let p = greeks(95.0, 100.0, 0.3, 0.02, 0.35, OptionType::Put).unwrap();
        assert!((c.gamma - p.gamma).abs() < 1e-12);
        assert!((c.vega - p.vega).abs() < 1e-12);
    }

    #[test]
    fn test_hedge_shares() {
        let shares = hedge_shares(100.0, 100.0, 1.0, 0.05, 0.2, OptionType::Call).unwrap();
        assert!((shares + 0.6368).abs() < TOL);
    }

    #[test]
    fn test_tiny_maturity_is_finite() {
        let p = price(100.0, 100.0, 1e-6, 0.05, 0.2, OptionType::Call).unwrap();
        assert!(p.is_finite() && p >= 0.0);
        let g = greeks(120.0, 100.0, 1e-6, 0.05, 0.2, OptionType::Call).unwrap();
        assert!((g.delta - 1.0).abs() < 1e-9);
        assert!(g.gamma.is_finite());
    }

    #[test]
    fn test_contract_helpers() {
        let contract = OptionContract::new(100.0, 1.0, OptionType::Call).unwrap();
        let market = MarketState::new(100.0, 0.05, 0.2);
        assert!((contract.value(&market).unwrap() - 10.4506).abs() < TOL);
        assert_eq!(contract.payoff(112.0), 12.0);
    }
}
