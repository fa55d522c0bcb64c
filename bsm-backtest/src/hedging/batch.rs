//! Monte Carlo batch of independent hedging runs.
//!
//! Every run draws its own path from its own `StdRng`, seeded from the base
//! seed and the run index, so runs can execute in parallel and the batch is
//! reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::events::EventSink;
use crate::metrics::MetricsCalculator;

use super::engine::HedgeEngine;

/// Seed stride between consecutive runs.
const SEED_STRIDE: u64 = 7_919;

/// Seed used for run `index` of a batch.
pub fn run_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add((index as u64).wrapping_mul(SEED_STRIDE))
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub seed: u64,
    pub total_return: f64,
    pub final_value: f64,
    pub transaction_cost: f64,
    pub max_drawdown: f64,
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub runs: Vec<RunOutcome>,
    pub mean_total_return: f64,
    /// Population standard deviation of total return.
    pub std_total_return: f64,
    pub mean_final_value: f64,
    pub mean_transaction_cost: f64,
    pub worst_drawdown: f64,
}

impl BatchSummary {
    /// Generate summary string.
    pub fn summary(&self) -> String {
        format!(
            "Hedging Batch ({} runs)\n\
             ----------------------------------------\n\
             Mean Total Return: {:.2}%\n\
             Std Total Return: {:.2}%\n\
             Mean Final Value: ${:.4}\n\
             Mean Transaction Costs: ${:.4}\n\
             Worst Drawdown: {:.2}%",
            self.runs.len(),
            self.mean_total_return * 100.0,
            self.std_total_return * 100.0,
            self.mean_final_value,
            self.mean_transaction_cost,
            self.worst_drawdown * 100.0,
        )
    }
}

/// Run `runs` independent simulations in parallel.
pub fn run_batch(
    engine: &HedgeEngine,
    runs: usize,
    base_seed: u64,
    sink: &dyn EventSink,
) -> Result<BatchSummary> {
    if runs == 0 {
        return Err(SimError::empty("batch needs at least one run"));
    }

    let outcomes = (0..runs)
        .into_par_iter()
        .map(|i| -> Result<RunOutcome> {
            let seed = run_seed(base_seed, i);
            let mut rng = StdRng::seed_from_u64(seed);
            let result = engine.run(&mut rng, sink)?;
            Ok(RunOutcome {
                seed,
                total_return: result.total_return.ok_or_else(|| {
                    SimError::undefined(format!("total return undefined for seed {seed}"))
                })?,
                final_value: result.final_value,
                transaction_cost: result.total_transaction_cost,
                max_drawdown: result.max_drawdown,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let returns: Vec<f64> = outcomes.iter().map(|o| o.total_return).collect();
    let finals: Vec<f64> = outcomes.iter().map(|o| o.final_value).collect();
    let costs: Vec<f64> = outcomes.iter().map(|o| o.transaction_cost).collect();
    let returns = MetricsCalculator::sample_stats(&returns)?;
    let finals = MetricsCalculator::sample_stats(&finals)?;
    let costs = MetricsCalculator::sample_stats(&costs)?;
    let worst_drawdown = outcomes
        .iter()
        .map(|o| o.max_drawdown)
        .fold(0.0, f64::max);

    Ok(BatchSummary {
        mean_total_return: returns.mean,
        std_total_return: returns.std_dev,
        mean_final_value: finals.mean,
        mean_transaction_cost: costs.mean,
        worst_drawdown,
        runs: outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MemorySink, NullSink, SimEvent};
    use crate::hedging::HedgeConfig;

    fn engine() -> HedgeEngine {
        HedgeEngine::new(HedgeConfig {
            steps: 50,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_run_seed() {
        assert_eq!(run_seed(42, 0), 42);
        assert_eq!(run_seed(42, 3), 42 + 3 * 7_919);
        assert_eq!(run_seed(u64::MAX, 1), 7_918);
    }

    #[test]
    fn test_batch_is_reproducible() {
        let a = run_batch(&engine(), 8, 42, &NullSink).unwrap();
        let b = run_batch(&engine(), 8, 42, &NullSink).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.runs.len(), 8);
        assert_eq!(a.runs[0].seed, 42);
    }

    #[test]
    fn test_run_matches_single_simulation() {
        let engine = engine();
        let batch = run_batch(&engine, 3, 100, &NullSink).unwrap();

        let mut rng = StdRng::seed_from_u64(run_seed(100, 2));
        let single = engine.run(&mut rng, &NullSink).unwrap();
        assert_eq!(batch.runs[2].final_value, single.final_value);
    }

    #[test]
    fn test_batch_statistics() {
        let batch = run_batch(&engine(), 16, 7, &NullSink).unwrap();
        let worst = batch
            .runs
            .iter()
            .map(|r| r.max_drawdown)
            .fold(0.0, f64::max);
        assert_eq!(batch.worst_drawdown, worst);
        assert!(batch.std_total_return >= 0.0);
        assert!(batch.mean_transaction_cost > 0.0);
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(
            run_batch(&engine(), 0, 42, &NullSink),
            Err(SimError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_batch_reports_every_run() {
        let sink = MemorySink::new();
        run_batch(&engine(), 4, 1, &sink).unwrap();
        assert_eq!(
            sink.count(|e| matches!(e, SimEvent::HedgeCompleted { .. })),
            4
        );
    }
}
