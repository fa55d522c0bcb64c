//! Peak-to-trough drawdown.
//!
//! Drawdown at a point is `(peak - value) / peak` where `peak` is the running
//! maximum since the first value. A fractional decline is only meaningful
//! against a positive peak, so points whose running peak is zero or negative
//! contribute nothing.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Drawdown tracker for incremental portfolio value updates.
#[derive(Debug, Clone)]
pub struct DrawdownTracker {
    peak: f64,
    peak_idx: usize,
    max_drawdown: f64,
    max_drawdown_peak_idx: usize,
    max_drawdown_idx: usize,
    count: usize,
}

impl DrawdownTracker {
    /// Start tracking from an initial value (index 0).
    pub fn with_initial(initial_value: f64) -> Self {
        Self {
            peak: initial_value,
            peak_idx: 0,
            max_drawdown: 0.0,
            max_drawdown_peak_idx: 0,
            max_drawdown_idx: 0,
            count: 1,
        }
    }

    /// Feed the next value. Returns the drawdown at that value.
    pub fn update(&mut self, value: f64) -> f64 {
        let idx = self.count;
        self.count += 1;

        if value > self.peak {
            self.peak = value;
            self.peak_idx = idx;
            return 0.0;
        }

        let drawdown = self.drawdown_of(value);
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
            self.max_drawdown_peak_idx = self.peak_idx;
            self.max_drawdown_idx = idx;
        }
        drawdown
    }

    fn drawdown_of(&self, value: f64) -> f64 {
        if self.peak > 0.0 {
            (self.peak - value) / self.peak
        } else {
            0.0
        }
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }
}

/// Drawdown analysis details for a value sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    /// Largest fractional peak-to-trough decline.
    pub max_drawdown: f64,
    /// Index of the peak preceding the largest decline.
    pub peak_idx: usize,
    /// Index of the trough of the largest decline.
    pub trough_idx: usize,
    /// Highest value seen.
    pub peak_value: f64,
}

/// Analyze drawdown over a full sequence.
pub fn analyze_drawdown(values: &[f64]) -> Result<DrawdownAnalysis> {
    let (first, rest) = values
        .split_first()
        .ok_or_else(|| SimError::empty("drawdown needs at least one value"))?;

    let mut tracker = DrawdownTracker::with_initial(*first);
    for &value in rest {
        tracker.update(value);
    }

    Ok(DrawdownAnalysis {
        max_drawdown: tracker.max_drawdown,
        peak_idx: tracker.max_drawdown_peak_idx,
        trough_idx: tracker.max_drawdown_idx,
        peak_value: tracker.peak,
    })
}

/// Largest fractional peak-to-trough decline.
pub fn max_drawdown(values: &[f64]) -> Result<f64> {
    Ok(analyze_drawdown(values)?.max_drawdown)
}
