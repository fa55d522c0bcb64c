//! Dynamic delta-hedging engine.
//!
//! The hedger is short one option and holds `-delta` shares, rebalanced at
//! every time step until maturity:
//! 1. Step 0: receive the premium, open the hedge, pay the cost of the trade
//! 2. Step i: reprice at the new spot and remaining time, move the hedge to
//!    the new `-delta`; cash accrues at the risk-free rate, absorbs the
//!    hedge's price P&L and pays the rebalancing cost
//! 3. Maturity: settle the option's intrinsic payoff against the final value
//!
//! A run is a fold of `HedgeEngine::step` over the price path.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::costs::TransactionCostModel;
use crate::data::{MarketState, OptionContract, OptionType};
use crate::error::{ensure_finite, ensure_positive, Result, SimError};
use crate::events::{EventSink, Severity, SimEvent};
use crate::metrics::{max_drawdown, MetricsCalculator};

use super::path::simulate_gbm_path;

/// Remaining time used once the option has reached maturity.
pub const TAU_FLOOR: f64 = 1e-6;

/// Configuration for a hedging simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgeConfig {
    /// Initial spot for generated paths.
    pub spot: f64,

    pub strike: f64,

    /// Time to maturity in years.
    pub maturity: f64,

    /// Risk-free rate (annual, continuous).
    pub rate: f64,

    /// Volatility (annual).
    pub volatility: f64,

    pub kind: OptionType,

    /// Rebalancing steps between now and maturity.
    pub steps: usize,

    /// Proportional cost charged on every hedge trade.
    pub transaction_cost: TransactionCostModel,

    /// Seed for generated paths.
    pub seed: u64,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            spot: 150.0,
            strike: 155.0,
            maturity: 0.5,
            rate: 0.03,
            volatility: 0.25,
            kind: OptionType::Call,
            steps: 252,
            transaction_cost: TransactionCostModel::default(),
            seed: 42,
        }
    }
}

impl HedgeConfig {
    /// Check every parameter against its domain.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("spot", self.spot)?;
        ensure_positive("maturity", self.maturity)?;
        self.contract()?;
        ensure_finite("rate", self.rate)?;
        ensure_positive("volatility", self.volatility)?;
        if self.steps == 0 {
            return Err(SimError::invalid("steps must be at least 1"));
        }
        self.transaction_cost.validate()
    }

    pub fn contract(&self) -> Result<OptionContract> {
        OptionContract::new(self.strike, self.maturity, self.kind)
    }

    /// Length of one time step in years.
    pub fn dt(&self) -> f64 {
        self.maturity / self.steps as f64
    }
}

/// Hedge book carried from one step to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HedgeState {
    /// Shares held (negative = short).
    pub hedge: f64,
    pub cash: f64,
    /// Spot at the previous step.
    pub spot: f64,
    pub total_cost: f64,
}

/// Record of one time step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeStep {
    /// Elapsed time in years.
    pub time: f64,
    pub spot: f64,
    pub option_value: f64,
    pub delta: f64,
    /// Shares held after rebalancing.
    pub hedge: f64,
    /// Shares bought (positive) or sold (negative) at this step.
    pub trade: f64,
    pub transaction_cost: f64,
    pub cash: f64,
}

impl HedgeStep {
    /// Cash plus the hedge marked at this step's spot.
    pub fn portfolio_value(&self) -> f64 {
        self.cash + self.hedge * self.spot
    }
}

/// Result of a completed hedging simulation.
#[derive(Debug, Clone, Serialize)]
pub struct HedgeResult {
    pub config: HedgeConfig,

    /// Option premium received at step 0.
    pub premium: f64,

    /// Spot at every step, `steps + 1` values.
    pub price_path: Vec<f64>,

    pub steps: Vec<HedgeStep>,

    /// Portfolio value at every step; the last value includes the payoff.
    pub portfolio_values: Vec<f64>,

    pub final_value: f64,

    /// Intrinsic value of the option at the final spot.
    pub option_payoff: f64,

    pub total_transaction_cost: f64,

    pub max_drawdown: f64,

    /// (final - premium) / premium, `None` when the premium is zero.
    pub total_return: Option<f64>,
}

impl HedgeResult {
    pub fn hedge_positions(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.hedge).collect()
    }

    pub fn cash_positions(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.cash).collect()
    }

    pub fn transaction_costs(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.transaction_cost).collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.time).collect()
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let total_return = self
            .total_return
            .map_or_else(|| "undefined".to_string(), |r| format!("{:.2}%", r * 100.0));
        format!(
            "Dynamic Hedging Results ({} steps)\n\
             ----------------------------------------\n\
             Premium: ${:.4}\n\
             Final Spot: ${:.2}\n\
             Option Payoff: ${:.4}\n\
             Final Value: ${:.4}\n\
             Total Return: {}\n\
             Max Drawdown: {:.2}%\n\
             Transaction Costs: ${:.4}",
            self.steps.len().saturating_sub(1),
            self.premium,
            self.price_path.last().copied().unwrap_or(0.0),
            self.option_payoff,
            self.final_value,
            total_return,
            self.max_drawdown * 100.0,
            self.total_transaction_cost,
        )
    }
}

/// The dynamic hedging engine.
#[derive(Debug, Clone)]
pub struct HedgeEngine {
    config: HedgeConfig,
    contract: OptionContract,
}

impl HedgeEngine {
    /// Create an engine, validating the configuration.
    pub fn new(config: HedgeConfig) -> Result<Self> {
        config.validate()?;
        let contract = config.contract()?;
        Ok(Self { config, contract })
    }

    pub fn config(&self) -> &HedgeConfig {
        &self.config
    }

    fn market(&self, spot: f64) -> MarketState {
        MarketState::new(spot, self.config.rate, self.config.volatility)
    }

    fn contract_at(&self, tau: f64) -> OptionContract {
        OptionContract {
            maturity: tau,
            ..self.contract
        }
    }

    /// Sell the option and open the hedge at `spot`.
    pub fn initial_state(&self, spot: f64) -> Result<(HedgeState, HedgeStep)> {
        ensure_positive("spot", spot)?;
        let market = self.market(spot);
        let premium = self.contract.value(&market)?;
        let delta = self.contract.greeks(&market)?.delta;

        let hedge = -delta;
        let cost = self.config.transaction_cost.cost(hedge, spot);
        let cash = premium + hedge * spot - cost;

        let state = HedgeState {
            hedge,
            cash,
            spot,
            total_cost: cost,
        };
        let record = HedgeStep {
            time: 0.0,
            spot,
            option_value: premium,
            delta,
            hedge,
            trade: hedge,
            transaction_cost: cost,
            cash,
        };
        Ok((state, record))
    }

    /// Rebalance at step `index` (1..=steps) with the new `spot`.
    pub fn step(&self, state: HedgeState, index: usize, spot: f64) -> Result<(HedgeState, HedgeStep)> {
        if index == 0 || index > self.config.steps {
            return Err(SimError::invalid(format!(
                "step index must be within 1..={}, got {index}",
                self.config.steps
            )));
        }
        ensure_positive("spot", spot)?;

        let dt = self.config.dt();
        let time = if index == self.config.steps {
            self.config.maturity
        } else {
            index as f64 * dt
        };
        let tau = self.config.maturity - time;
        let tau = if tau <= 0.0 { TAU_FLOOR } else { tau };

        let contract = self.contract_at(tau);
        let market = self.market(spot);
        let option_value = contract.value(&market)?;
        let delta = contract.greeks(&market)?.delta;

        let hedge = -delta;
        let trade = hedge - state.hedge;
        let cost = self.config.transaction_cost.cost(trade, spot);
        let cash = state.cash * (self.config.rate * dt).exp() + state.hedge * (spot - state.spot)
            - cost;

        let next = HedgeState {
            hedge,
            cash,
            spot,
            total_cost: state.total_cost + cost,
        };
        let record = HedgeStep {
            time,
            spot,
            option_value,
            delta,
            hedge,
            trade,
            transaction_cost: cost,
            cash,
        };
        Ok((next, record))
    }

    /// Hedge along a supplied path of `steps + 1` spots, starting at `path[0]`.
    pub fn run_with_path(&self, path: &[f64], sink: &dyn EventSink) -> Result<HedgeResult> {
        let (&s0, rest) = path
            .split_first()
            .ok_or_else(|| SimError::empty("price path has no values"))?;
        if rest.len() != self.config.steps {
            return Err(SimError::invalid(format!(
                "price path must have {} values, got {}",
                self.config.steps + 1,
                path.len()
            )));
        }

        let (mut state, first) = self.initial_state(s0)?;
        let premium = first.option_value;
        let mut steps = Vec::with_capacity(path.len());
        emit_rebalance(sink, 0, &first);
        steps.push(first);

        for (i, &spot) in rest.iter().enumerate() {
            let (next, record) = self.step(state, i + 1, spot)?;
            emit_rebalance(sink, i + 1, &record);
            state = next;
            steps.push(record);
        }

        let final_spot = state.spot;
        let option_payoff = self.contract.payoff(final_spot);
        let mut portfolio_values: Vec<f64> = steps.iter().map(HedgeStep::portfolio_value).collect();
        if let Some(last) = portfolio_values.last_mut() {
            *last += option_payoff;
        }
        let final_value = portfolio_values.last().copied().unwrap_or(option_payoff);
        let max_drawdown = max_drawdown(&portfolio_values)?;
        let total_return = MetricsCalculator::total_return(final_value, premium).ok();

        let result = HedgeResult {
            config: self.config.clone(),
            premium,
            price_path: path.to_vec(),
            steps,
            portfolio_values,
            final_value,
            option_payoff,
            total_transaction_cost: state.total_cost,
            max_drawdown,
            total_return,
        };

        sink.emit(
            Severity::Info,
            &SimEvent::HedgeCompleted {
                steps: self.config.steps,
                total_return,
                max_drawdown,
                final_value,
            },
        );

        Ok(result)
    }

    /// Hedge along a GBM path drawn from `rng`.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R, sink: &dyn EventSink) -> Result<HedgeResult> {
        let path = simulate_gbm_path(
            self.config.spot,
            self.config.rate,
            self.config.volatility,
            self.config.maturity,
            self.config.steps,
            rng,
        )?;
        self.run_with_path(&path, sink)
    }

    /// Hedge along a GBM path seeded from the configured seed.
    pub fn run_seeded(&self, sink: &dyn EventSink) -> Result<HedgeResult> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.run(&mut rng, sink)
    }
}

fn emit_rebalance(sink: &dyn EventSink, step: usize, record: &HedgeStep) {
    sink.emit(
        Severity::Debug,
        &SimEvent::HedgeRebalanced {
            step,
            hedge: record.hedge,
            trade: record.trade,
            cost: record.transaction_cost,
        },
    );
}
