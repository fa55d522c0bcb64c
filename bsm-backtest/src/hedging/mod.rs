//! Dynamic delta-hedging simulation.
//!
//! This module provides:
//! - GBM price path generation from a caller-supplied random source
//! - The step-by-step hedging engine
//! - A parallel Monte Carlo batch over independently seeded runs

pub mod batch;
pub mod engine;
pub mod path;

pub use batch::{run_batch, run_seed, BatchSummary, RunOutcome};
pub use engine::{HedgeConfig, HedgeEngine, HedgeResult, HedgeState, HedgeStep, TAU_FLOOR};
pub use path::simulate_gbm_path;
