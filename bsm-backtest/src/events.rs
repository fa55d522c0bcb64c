//! Observability sink for engine state transitions.
//!
//! Engines never log directly. Each run receives a `&dyn EventSink` and
//! reports what happened through it; the caller decides where the events go
//! (`tracing`, memory, nowhere).

use std::fmt;
use std::sync::Mutex;

use chrono::NaiveDate;

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

/// A state transition or run summary emitted by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// Backtest moved from Flat to Open.
    PositionOpened {
        date: NaiveDate,
        shares: i64,
        price: f64,
        option_price: f64,
        delta: f64,
        cost: f64,
    },
    /// Backtest moved from Open to Flat.
    PositionClosed {
        date: NaiveDate,
        shares: i64,
        price: f64,
        pnl: f64,
        cost: f64,
    },
    /// The stop-loss rule fired.
    StopLossTriggered {
        shares: i64,
        entry_price: f64,
        current_price: f64,
        threshold: f64,
    },
    /// Sizing distance and trigger threshold disagree on the dollar stop.
    SizingStopMismatch {
        sizing_distance: f64,
        trigger_distance: f64,
    },
    /// An entry cost more than the cash on hand.
    CashOverdrawn {
        date: NaiveDate,
        cash: f64,
    },
    /// Hedge rebalanced at a time step.
    HedgeRebalanced {
        step: usize,
        hedge: f64,
        trade: f64,
        cost: f64,
    },
    BacktestCompleted {
        bars: usize,
        total_return: f64,
        max_drawdown: f64,
        legacy_ratio: Option<f64>,
        final_value: f64,
    },
    HedgeCompleted {
        steps: usize,
        total_return: Option<f64>,
        max_drawdown: f64,
        final_value: f64,
    },
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionOpened {
                date,
                shares,
                price,
                option_price,
                delta,
                cost,
            } => write!(
                f,
                "Opened position: {shares} shares at {price:.2} on {date} \
                 (option {option_price:.4}, delta {delta:.4}, cost {cost:.2})"
            ),
            Self::PositionClosed {
                date,
                shares,
                price,
                pnl,
                cost,
            } => write!(
                f,
                "Closed position: {shares} shares at {price:.2} on {date} \
                 (pnl {pnl:.2}, cost {cost:.2})"
            ),
            Self::StopLossTriggered {
                shares,
                entry_price,
                current_price,
                threshold,
            } => {
                let side = if *shares > 0 { "long" } else { "short" };
                write!(
                    f,
                    "Stop-loss triggered for {side} position at {current_price:.2} \
                     (entry {entry_price:.2}, threshold {threshold})"
                )
            }
            Self::SizingStopMismatch {
                sizing_distance,
                trigger_distance,
            } => write!(
                f,
                "Sizing stop distance ${sizing_distance:.2} differs from trigger distance \
                 ${trigger_distance:.2}"
            ),
            Self::CashOverdrawn { date, cash } => write!(
                f,
                "Cash overdrawn to {cash:.2} on {date}: entry size exceeds available cash"
            ),
            Self::HedgeRebalanced {
                step,
                hedge,
                trade,
                cost,
            } => write!(
                f,
                "Step {step}: hedge {hedge:.4} (trade {trade:+.4}, cost {cost:.4})"
            ),
            Self::BacktestCompleted {
                bars,
                total_return,
                max_drawdown,
                legacy_ratio,
                final_value,
            } => {
                write!(
                    f,
                    "Backtest completed over {bars} bars: return {:.2}%, max drawdown {:.2}%, \
                     final value {final_value:.2}, legacy ratio ",
                    total_return * 100.0,
                    max_drawdown * 100.0,
                )?;
                match legacy_ratio {
                    Some(r) => write!(f, "{r:.2}"),
                    None => write!(f, "undefined"),
                }
            }
            Self::HedgeCompleted {
                steps,
                total_return,
                max_drawdown,
                final_value,
            } => {
                write!(f, "Dynamic hedging completed over {steps} steps: return ")?;
                match total_return {
                    Some(r) => write!(f, "{:.2}%", r * 100.0)?,
                    None => write!(f, "undefined")?,
                }
                write!(
                    f,
                    ", max drawdown {:.2}%, final value {final_value:.4}",
                    max_drawdown * 100.0
                )
            }
        }
    }
}

/// Destination for engine events.
pub trait EventSink: Send + Sync {
    fn emit(&self, severity: Severity, event: &SimEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, severity: Severity, event: &SimEvent) {
        match severity {
            Severity::Debug => tracing::debug!("{event}"),
            Severity::Info => tracing::info!("{event}"),
            Severity::Warn => tracing::warn!("{event}"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _severity: Severity, _event: &SimEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(Severity, SimEvent)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<(Severity, SimEvent)> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of recorded events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&SimEvent) -> bool) -> usize {
        self.events().iter().filter(|(_, e)| predicate(e)).count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, severity: Severity, event: &SimEvent) {
        let mut guard = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((severity, event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(
            Severity::Warn,
            &SimEvent::StopLossTriggered {
                shares: 10,
                entry_price: 100.0,
                current_price: 94.0,
                threshold: 0.95,
            },
        );
        sink.emit(
            Severity::Debug,
            &SimEvent::HedgeRebalanced {
                step: 1,
                hedge: -0.6,
                trade: 0.01,
                cost: 0.0,
            },
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, Severity::Warn);
        assert_eq!(
            sink.count(|e| matches!(e, SimEvent::HedgeRebalanced { .. })),
            1
        );
    }

    #[test]
    fn test_stop_loss_message() {
        let event = SimEvent::StopLossTriggered {
            shares: -5,
            entry_price: 100.0,
            current_price: 106.0,
            threshold: 0.95,
        };
        let msg = event.to_string();
        assert!(msg.contains("short position at 106.00"));
    }

    #[test]
    fn test_undefined_ratio_message() {
        let event = SimEvent::BacktestCompleted {
            bars: 1,
            total_return: 0.0,
            max_drawdown: 0.0,
            legacy_ratio: None,
            final_value: 100_000.0,
        };
        assert!(event.to_string().ends_with("legacy ratio undefined"));
    }
}
