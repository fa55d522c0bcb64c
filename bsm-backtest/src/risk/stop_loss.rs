//! Threshold stop-loss rule.
//!
//! Long positions stop out when price falls to `entry * threshold`; short
//! positions stop out when price rises to `entry / threshold`. A flat
//! position never stops out.

use crate::events::{EventSink, Severity, SimEvent};

/// Decide whether a position should be stopped out.
///
/// Mutates nothing: the caller acts on the result. A `StopLossTriggered`
/// warning is emitted to `sink` when the rule fires.
pub fn should_stop_loss(
    position: i64,
    entry_price: f64,
    current_price: f64,
    threshold: f64,
    sink: &dyn EventSink,
) -> bool {
    let triggered = match position.signum() {
        1 => current_price <= entry_price * threshold,
        -1 => current_price >= entry_price / threshold,
        _ => false,
    };

    if triggered {
        sink.emit(
            Severity::Warn,
            &SimEvent::StopLossTriggered {
                shares: position,
                entry_price,
                current_price,
                threshold,
            },
        );
    }

    triggered
}

/// Price at which a position entered at `entry_price` stops out.
pub fn stop_price(position: i64, entry_price: f64, threshold: f64) -> Option<f64> {
    match position.signum() {
        1 => Some(entry_price * threshold),
        -1 => Some(entry_price / threshold),
        _ => None,
    }
}
