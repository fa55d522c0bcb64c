//! Single-underlying backtesting engine.
//!
//! The engine is a two-state machine, Flat and Open, stepped once per bar:
//! 1. Flat: value the configured option, size a long stock position from
//!    cash, and open it if the size is positive
//! 2. Open: close the position if the stop-loss rule fires (no re-entry on
//!    the same bar)
//! 3. Mark to market and track drawdown
//!
//! A run is a fold of `BacktestEngine::step` over the price series.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::costs::TransactionCostModel;
use crate::data::{MarketState, OptionContract, OptionType, PriceBar, PriceSeries};
use crate::error::{ensure_finite, ensure_positive, Result, SimError};
use crate::events::{EventSink, Severity, SimEvent};
use crate::metrics::{DrawdownTracker, MetricsCalculator};
use crate::risk::{position_size, should_stop_loss, stop_price};

use super::trade::{Entry, ExitReason, Position, Trade};

/// Dollar distances closer than this are treated as equal.
const DISTANCE_TOLERANCE: f64 = 1e-9;

/// Configuration for backtest execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting cash.
    pub initial_capital: Decimal,

    /// Strike of the reference option valued at each entry.
    pub strike: f64,

    /// Maturity of the reference option in years.
    pub maturity: f64,

    /// Risk-free rate (annual, continuous).
    pub rate: f64,

    /// Volatility (annual).
    pub volatility: f64,

    /// Reference option kind.
    pub kind: OptionType,

    /// Proportional cost charged on every fill.
    pub transaction_cost: TransactionCostModel,

    /// Fraction of cash risked per trade.
    pub risk_per_trade: f64,

    /// Stop-loss trigger (long stops at entry * threshold).
    pub stop_loss_threshold: f64,

    /// Dollar stop distance per share used for sizing.
    pub sizing_stop_distance: f64,

    /// Close an open position on the last bar instead of leaving it marked
    /// to market.
    pub liquidate_at_end: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(100_000),
            strike: 150.0,
            maturity: 0.5,
            rate: 0.03,
            volatility: 0.25,
            kind: OptionType::Call,
            transaction_cost: TransactionCostModel::default(),
            risk_per_trade: 0.01,
            stop_loss_threshold: 0.95,
            sizing_stop_distance: 5.0,
            liquidate_at_end: false,
        }
    }
}

impl BacktestConfig {
    /// Check every parameter against its domain.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(SimError::invalid(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        self.contract()?;
        ensure_finite("rate", self.rate)?;
        ensure_positive("volatility", self.volatility)?;
        self.transaction_cost.validate()?;
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 1.0) {
            return Err(SimError::invalid(format!(
                "risk_per_trade must be within (0, 1], got {}",
                self.risk_per_trade
            )));
        }
        if !(self.stop_loss_threshold > 0.0 && self.stop_loss_threshold <= 1.0) {
            return Err(SimError::invalid(format!(
                "stop_loss_threshold must be within (0, 1], got {}",
                self.stop_loss_threshold
            )));
        }
        ensure_positive("sizing_stop_distance", self.sizing_stop_distance)?;
        Ok(())
    }

    /// The reference option described by this config.
    pub fn contract(&self) -> Result<OptionContract> {
        OptionContract::new(self.strike, self.maturity, self.kind)
    }

    /// Dollar distance per share at which the trigger fires for a long
    /// entered at `entry_price`.
    pub fn trigger_distance(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_threshold)
    }
}

/// Per-bar account snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub spot: f64,
    pub cash: Decimal,
    pub position_value: Decimal,
    pub equity: Decimal,
    pub shares: i64,
}

/// Engine state carried from one bar to the next.
#[derive(Debug, Clone)]
pub struct BacktestState {
    pub cash: Decimal,
    /// `None` while Flat.
    pub position: Option<Position>,
    pub drawdown: DrawdownTracker,
    pub trades: Vec<Trade>,
    pub entries: Vec<Entry>,
    pub total_costs: Decimal,
}

impl BacktestState {
    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn shares(&self) -> i64 {
        self.position.as_ref().map_or(0, |p| p.shares)
    }
}

/// Result of a completed backtest.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    /// Configuration used.
    pub config: BacktestConfig,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    /// Per-bar equity curve.
    pub equity_curve: Vec<EquityPoint>,

    /// Completed round trips.
    pub trades: Vec<Trade>,

    /// Option price and delta at each entry.
    pub entries: Vec<Entry>,

    /// Position still open after the last bar.
    pub open_position: Option<Position>,

    /// Equity after the last bar.
    pub final_value: Decimal,

    /// (final - initial) / initial.
    pub total_return: f64,

    /// Largest fractional decline from a running peak.
    pub max_drawdown: f64,

    /// Highest equity seen, including initial capital.
    pub peak_value: f64,

    /// Value-based ratio: (mean(values) - initial) / std(values) * sqrt(252).
    /// Kept for comparability with historical reports. `None` when the
    /// equity curve has zero variance.
    pub legacy_ratio: Option<f64>,

    /// Returns-based Sharpe ratio (risk-free rate = 0), annualized. `None`
    /// when undefined.
    pub sharpe_ratio: Option<f64>,

    /// Transaction costs paid.
    pub total_costs: Decimal,
}

impl BacktestResult {
    /// Equity at each bar as `f64`.
    pub fn values(&self) -> Result<Vec<f64>> {
        equity_values(&self.equity_curve)
    }

    /// Lowest cash balance on the curve. Entries are sized from risk, not
    /// from available cash, so this goes negative when a position costs more
    /// than the account holds.
    pub fn lowest_cash(&self) -> Decimal {
        self.equity_curve
            .iter()
            .map(|p| p.cash)
            .min()
            .unwrap_or(self.config.initial_capital)
    }

    pub fn total_pnl(&self) -> Decimal {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        let winners = self.trades.iter().filter(|t| t.is_winner()).count();
        winners as f64 / self.trades.len() as f64
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let ratio = |r: Option<f64>| r.map_or_else(|| "undefined".to_string(), |v| format!("{v:.2}"));
        let open = match &self.open_position {
            Some(p) => match stop_price(p.shares, p.entry_price, self.config.stop_loss_threshold) {
                Some(stop) => format!("{} shares from {:.2} (stop {:.2})", p.shares, p.entry_price, stop),
                None => format!("{} shares from {:.2}", p.shares, p.entry_price),
            },
            None => "flat".to_string(),
        };
        let lowest_cash = self.lowest_cash();
        let leverage = if lowest_cash < Decimal::ZERO {
            format!("\nCash Overdrawn: lowest cash ${lowest_cash:.2}")
        } else {
            String::new()
        };
        format!(
            "Backtest Results ({} to {})\n\
             ----------------------------------------\n\
             Total Return: {:.2}%\n\
             Final Value: ${:.2}\n\
             Max Drawdown: {:.2}%\n\
             Legacy Ratio: {}\n\
             Sharpe Ratio: {}\n\
             \n\
             Entries: {}\n\
             Closed Trades: {} (win rate {:.1}%)\n\
             Realized P&L: ${:.2}\n\
             Open Position: {}\n\
             Transaction Costs: ${:.2}{}",
            self.start_date,
            self.end_date,
            self.total_return * 100.0,
            self.final_value,
            self.max_drawdown * 100.0,
            ratio(self.legacy_ratio),
            ratio(self.sharpe_ratio),
            self.entries.len(),
            self.trades.len(),
            self.win_rate() * 100.0,
            self.total_pnl(),
            open,
            self.total_costs,
            leverage,
        )
    }
}

/// The backtesting engine.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    contract: OptionContract,
}

impl BacktestEngine {
    /// Create an engine, validating the configuration.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        let contract = config.contract()?;
        Ok(Self { config, contract })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Flat state holding the initial capital.
    pub fn initial_state(&self) -> Result<BacktestState> {
        Ok(BacktestState {
            cash: self.config.initial_capital,
            position: None,
            drawdown: DrawdownTracker::with_initial(to_f64(self.config.initial_capital)?),
            trades: Vec::new(),
            entries: Vec::new(),
            total_costs: Decimal::ZERO,
        })
    }

    /// Advance the state machine by one bar.
    pub fn step(
        &self,
        state: BacktestState,
        bar: &PriceBar,
        sink: &dyn EventSink,
    ) -> Result<(BacktestState, EquityPoint)> {
        self.advance(state, bar, false, sink)
    }

    /// Advance by one bar and, if `liquidate` is set, close whatever is
    /// still open at the bar's close before marking to market.
    fn advance(
        &self,
        mut state: BacktestState,
        bar: &PriceBar,
        liquidate: bool,
        sink: &dyn EventSink,
    ) -> Result<(BacktestState, EquityPoint)> {
        match state.position.take() {
            None => self.open_position(&mut state, bar, sink)?,
            Some(position) => {
                if should_stop_loss(
                    position.shares,
                    position.entry_price,
                    bar.close,
                    self.config.stop_loss_threshold,
                    sink,
                ) {
                    self.close_position(&mut state, position, bar, ExitReason::StopLoss, sink)?;
                } else {
                    state.position = Some(position);
                }
            }
        }

        if liquidate {
            if let Some(position) = state.position.take() {
                self.close_position(&mut state, position, bar, ExitReason::EndOfPeriod, sink)?;
            }
        }

        let point = self.mark_to_market(&mut state, bar)?;
        Ok((state, point))
    }

    /// Run the backtest over a full price series.
    pub fn run(&self, series: &PriceSeries, sink: &dyn EventSink) -> Result<BacktestResult> {
        let mut state = self.initial_state()?;
        let mut equity_curve = Vec::with_capacity(series.len());
        let last = series.len().saturating_sub(1);

        for (i, bar) in series.bars().iter().enumerate() {
            let liquidate = self.config.liquidate_at_end && i == last;
            let (next, point) = self.advance(state, bar, liquidate, sink)?;
            state = next;
            equity_curve.push(point);
        }

        self.build_result(series, state, equity_curve, sink)
    }

    fn open_position(
        &self,
        state: &mut BacktestState,
        bar: &PriceBar,
        sink: &dyn EventSink,
    ) -> Result<()> {
        let market = MarketState::new(bar.close, self.config.rate, self.config.volatility);
        let option_price = self.contract.value(&market)?;
        let delta = self.contract.greeks(&market)?.delta;

        let account = to_f64(state.cash)?.max(0.0);
        let shares = position_size(
            account,
            self.config.risk_per_trade,
            self.config.sizing_stop_distance,
            bar.close,
        )?;
        if shares == 0 {
            return Ok(());
        }

        let trigger_distance = self.config.trigger_distance(bar.close);
        if (trigger_distance - self.config.sizing_stop_distance).abs() > DISTANCE_TOLERANCE {
            sink.emit(
                Severity::Warn,
                &SimEvent::SizingStopMismatch {
                    sizing_distance: self.config.sizing_stop_distance,
                    trigger_distance,
                },
            );
        }

        let cost = self.config.transaction_cost.cost(shares as f64, bar.close);
        let entry_cost = to_decimal("entry cost", cost)?;
        let price = to_decimal("price", bar.close)?;
        state.cash -= Decimal::from(shares) * price + entry_cost;
        state.total_costs += entry_cost;
        if state.cash < Decimal::ZERO {
            sink.emit(
                Severity::Warn,
                &SimEvent::CashOverdrawn {
                    date: bar.date,
                    cash: to_f64(state.cash)?,
                },
            );
        }

        state.entries.push(Entry {
            date: bar.date,
            spot: bar.close,
            shares,
            option_price,
            delta,
        });
        state.position = Some(Position {
            shares,
            entry_price: bar.close,
            entry_date: bar.date,
            entry_cost,
            option_price,
            delta,
        });

        sink.emit(
            Severity::Info,
            &SimEvent::PositionOpened {
                date: bar.date,
                shares,
                price: bar.close,
                option_price,
                delta,
                cost,
            },
        );
        Ok(())
    }

    fn close_position(
        &self,
        state: &mut BacktestState,
        position: Position,
        bar: &PriceBar,
        reason: ExitReason,
        sink: &dyn EventSink,
    ) -> Result<()> {
        let cost = self.config.transaction_cost.cost(position.shares as f64, bar.close);
        let exit_cost = to_decimal("exit cost", cost)?;
        let price = to_decimal("price", bar.close)?;
        let entry_price = to_decimal("entry price", position.entry_price)?;

        state.cash += position.market_value(price) - exit_cost;
        state.total_costs += exit_cost;

        let pnl = position.unrealized_pnl(price, entry_price) - position.entry_cost - exit_cost;
        sink.emit(
            Severity::Info,
            &SimEvent::PositionClosed {
                date: bar.date,
                shares: position.shares,
                price: bar.close,
                pnl: to_f64(pnl)?,
                cost,
            },
        );

        state.trades.push(Trade {
            shares: position.shares,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date: bar.date,
            exit_price: bar.close,
            entry_cost: position.entry_cost,
            exit_cost,
            pnl,
            exit_reason: reason,
        });
        Ok(())
    }

    fn mark_to_market(&self, state: &mut BacktestState, bar: &PriceBar) -> Result<EquityPoint> {
        let price = to_decimal("price", bar.close)?;
        let position_value = state
            .position
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.market_value(price));
        let equity = state.cash + position_value;
        state.drawdown.update(to_f64(equity)?);

        Ok(EquityPoint {
            date: bar.date,
            spot: bar.close,
            cash: state.cash,
            position_value,
            equity,
            shares: state.shares(),
        })
    }

    fn build_result(
        &self,
        series: &PriceSeries,
        state: BacktestState,
        equity_curve: Vec<EquityPoint>,
        sink: &dyn EventSink,
    ) -> Result<BacktestResult> {
        let final_value = equity_curve
            .last()
            .map_or(self.config.initial_capital, |p| p.equity);
        let initial_capital = to_f64(self.config.initial_capital)?;
        let total_return = MetricsCalculator::total_return(to_f64(final_value)?, initial_capital)?;
        let values = equity_values(&equity_curve)?;
        let legacy_ratio = MetricsCalculator::legacy_ratio(&values, initial_capital).ok();
        let sharpe_ratio = MetricsCalculator::sharpe_ratio(&values).ok();

        let result = BacktestResult {
            config: self.config.clone(),
            start_date: series.first_date(),
            end_date: series.last_date(),
            equity_curve,
            trades: state.trades,
            entries: state.entries,
            open_position: state.position,
            final_value,
            total_return,
            max_drawdown: state.drawdown.max_drawdown(),
            peak_value: state.drawdown.peak(),
            legacy_ratio,
            sharpe_ratio,
            total_costs: state.total_costs,
        };

        sink.emit(
            Severity::Info,
            &SimEvent::BacktestCompleted {
                bars: result.equity_curve.len(),
                total_return,
                max_drawdown: result.max_drawdown,
                legacy_ratio,
                final_value: to_f64(final_value)?,
            },
        );

        Ok(result)
    }
}

fn to_decimal(name: &str, value: f64) -> Result<Decimal> {
    Decimal::try_from(value)
        .map_err(|e| SimError::invalid(format!("{name} {value} has no decimal form: {e}")))
}

fn to_f64(value: Decimal) -> Result<f64> {
    f64::try_from(value)
        .map_err(|e| SimError::invalid(format!("{value} has no f64 form: {e}")))
}

fn equity_values(curve: &[EquityPoint]) -> Result<Vec<f64>> {
    curve.iter().map(|p| to_f64(p.equity)).collect()
}
