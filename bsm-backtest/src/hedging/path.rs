//! Risk-neutral GBM price paths.
//!
//! S(t+dt) = S(t) * exp((r - sigma^2 / 2) dt + sigma sqrt(dt) Z), Z ~ N(0, 1).
//! The random source is always supplied by the caller.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{ensure_finite, ensure_positive, Result, SimError};

/// Simulate one path of `steps + 1` prices starting at `s0`.
pub fn simulate_gbm_path<R: Rng + ?Sized>(
    s0: f64,
    rate: f64,
    volatility: f64,
    maturity: f64,
    steps: usize,
    rng: &mut R,
) -> Result<Vec<f64>> {
    ensure_positive("s0", s0)?;
    ensure_finite("rate", rate)?;
    ensure_positive("maturity", maturity)?;
    if !(volatility.is_finite() && volatility >= 0.0) {
        return Err(SimError::invalid(format!(
            "volatility must be non-negative, got {volatility}"
        )));
    }
    if steps == 0 {
        return Err(SimError::invalid("steps must be at least 1"));
    }

    let dt = maturity / steps as f64;
    let drift = (rate - 0.5 * volatility * volatility) * dt;
    let diffusion = volatility * dt.sqrt();

    let mut path = Vec::with_capacity(steps + 1);
    path.push(s0);
    let mut spot = s0;
    for _ in 0..steps {
        let z: f64 = StandardNormal.sample(&mut *rng);
        spot *= (drift + diffusion * z).exp();
        path.push(spot);
    }
    Ok(path)
}
