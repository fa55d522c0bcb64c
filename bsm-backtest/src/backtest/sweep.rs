//! Stop-loss parameter sweep.
//!
//! Runs the backtest for every (trigger threshold, sizing distance) pair in
//! a grid. Each run owns its engine and state, so the grid is evaluated in
//! parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::PriceSeries;
use crate::error::{Result, SimError};
use crate::events::EventSink;

use super::engine::{BacktestConfig, BacktestEngine};

/// Parameter values to sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopLossGrid {
    /// Stop-loss trigger thresholds.
    pub thresholds: Vec<f64>,
    /// Sizing stop distances in dollars per share.
    pub sizing_distances: Vec<f64>,
}

impl Default for StopLossGrid {
    fn default() -> Self {
        Self {
            thresholds: vec![0.90, 0.93, 0.95, 0.97],
            sizing_distances: vec![2.5, 5.0, 7.5, 10.0],
        }
    }
}

impl StopLossGrid {
    pub fn total_combinations(&self) -> usize {
        self.thresholds.len() * self.sizing_distances.len()
    }

    /// All (threshold, sizing distance) pairs.
    pub fn combinations(&self) -> Vec<(f64, f64)> {
        self.thresholds
            .iter()
            .flat_map(|&t| self.sizing_distances.iter().map(move |&d| (t, d)))
            .collect()
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub stop_loss_threshold: f64,
    pub sizing_stop_distance: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub legacy_ratio: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub trades: usize,
}

/// Backtest every grid point, best total return first.
pub fn run_sweep(
    base: &BacktestConfig,
    grid: &StopLossGrid,
    series: &PriceSeries,
    sink: &dyn EventSink,
) -> Result<Vec<SweepResult>> {
    let combos = grid.combinations();
    if combos.is_empty() {
        return Err(SimError::empty("sweep grid has no combinations"));
    }

    let mut results = combos
        .par_iter()
        .map(|&(threshold, distance)| -> Result<SweepResult> {
            let config = BacktestConfig {
                stop_loss_threshold: threshold,
                sizing_stop_distance: distance,
                ..base.clone()
            };
            let result = BacktestEngine::new(config)?.run(series, sink)?;
            Ok(SweepResult {
                stop_loss_threshold: threshold,
                sizing_stop_distance: distance,
                total_return: result.total_return,
                max_drawdown: result.max_drawdown,
                legacy_ratio: result.legacy_ratio,
                sharpe_ratio: result.sharpe_ratio,
                trades: result.trades.len(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    results.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use chrono::NaiveDate;

    fn series() -> PriceSeries {
        let closes = [100.0, 97.0, 92.0, 95.0, 99.0, 104.0, 101.0, 96.0, 103.0, 108.0];
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), &closes).unwrap()
    }

    #[test]
    fn test_grid_combinations() {
        let grid = StopLossGrid {
            thresholds: vec![0.9, 0.95],
            sizing_distances: vec![5.0, 10.0, 20.0],
        };
        assert_eq!(grid.total_combinations(), 6);
        let combos = grid.combinations();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0], (0.9, 5.0));
        assert_eq!(combos[5], (0.95, 20.0));
    }

    #[test]
    fn test_sweep_sorted_by_return() {
        let results = run_sweep(
            &BacktestConfig::default(),
            &StopLossGrid::default(),
            &series(),
            &NullSink,
        )
        .unwrap();

        assert_eq!(results.len(), 16);
        for pair in results.windows(2) {
            assert!(pair[0].total_return >= pair[1].total_return);
        }
    }

    #[test]
    fn test_sweep_matches_single_run() {
        let grid = StopLossGrid {
            thresholds: vec![0.95],
            sizing_distances: vec![5.0],
        };
        let base = BacktestConfig::default();
        let swept = run_sweep(&base, &grid, &series(), &NullSink).unwrap();
        let single = BacktestEngine::new(base).unwrap().run(&series(), &NullSink).unwrap();
        assert_eq!(swept[0].total_return, single.total_return);
        assert_eq!(swept[0].trades, single.trades.len());
    }

    #[test]
    fn test_invalid_grid_point() {
        let grid = StopLossGrid {
            thresholds: vec![1.2],
            sizing_distances: vec![5.0],
        };
        let result = run_sweep(&BacktestConfig::default(), &grid, &series(), &NullSink);
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));

        let empty = StopLossGrid {
            thresholds: vec![],
            sizing_distances: vec![5.0],
        };
        let result = run_sweep(&BacktestConfig::default(), &empty, &series(), &NullSink);
        assert!(matches!(result, Err(SimError::EmptyInput(_))));
    }
}
