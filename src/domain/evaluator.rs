//! Position risk evaluation against a risk policy.
//!
//! Precedence on every tick:
//! 1. take profit (when enabled)
//! 2. stop loss (when enabled)
//! 3. trailing stop (tightened first, then checked)
//! 4. hold
//!
//! Terminal positions are returned untouched with their terminal decision.

use crate::domain::error::TradeguardError;
use crate::domain::position::{Decision, Position, Side};
use crate::domain::risk_policy::RiskPolicy;

/// Slack for threshold comparisons on the percent scale; absorbs the rounding
/// in `unrealized_pct` so a move of exactly the threshold fires.
const PCT_TOLERANCE: f64 = 1e-9;

pub fn evaluate(
    position: &Position,
    current_price: f64,
    policy: &RiskPolicy,
) -> Result<(Decision, Position), TradeguardError> {
    check_price("entry_price", position.entry_price)?;
    check_price("current_price", current_price)?;

    if position.state.is_terminal() {
        return Ok((Decision::from(position.state), position.clone()));
    }

    let mut updated = position.clone();
    let pct = position.unrealized_pct(current_price);

    let decision = if policy.take_profit_enabled() && pct + PCT_TOLERANCE >= policy.take_profit_pct
    {
        Decision::CloseTakeProfit
    } else if policy.stop_loss_enabled() && pct - PCT_TOLERANCE <= -policy.stop_loss_pct {
        Decision::CloseStopLoss
    } else if policy.trailing_stop_enabled {
        let stop = tighten_trailing_stop(
            position.side,
            position.trailing_stop_price,
            current_price,
            policy.trailing_stop_distance_pct,
        );
        updated.trailing_stop_price = Some(stop);
        if trailing_stop_hit(position.side, current_price, stop) {
            Decision::CloseTrailingStop
        } else {
            Decision::Hold
        }
    } else {
        Decision::Hold
    };

    updated.state = decision.resulting_state();
    Ok((decision, updated))
}

/// New trailing stop level; never loosens an existing one.
pub fn tighten_trailing_stop(
    side: Side,
    existing: Option<f64>,
    current_price: f64,
    distance_pct: f64,
) -> f64 {
    match side {
        Side::Buy => {
            let candidate = current_price * (1.0 - distance_pct / 100.0);
            existing.map_or(candidate, |stop| stop.max(candidate))
        }
        Side::Sell => {
            let candidate = current_price * (1.0 + distance_pct / 100.0);
            existing.map_or(candidate, |stop| stop.min(candidate))
        }
    }
}

pub fn trailing_stop_hit(side: Side, current_price: f64, stop: f64) -> bool {
    match side {
        Side::Buy => current_price <= stop,
        Side::Sell => current_price >= stop,
    }
}

/// Absolute prices at which take profit and stop loss fire for `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerPrices {
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

/// Inverts the percent-move rule so the levels agree with [`evaluate`].
pub fn trigger_prices(entry_price: f64, side: Side, policy: &RiskPolicy) -> TriggerPrices {
    let tp = policy.take_profit_pct / 100.0;
    let sl = policy.stop_loss_pct / 100.0;
    match side {
        Side::Buy => TriggerPrices {
            take_profit: policy
                .take_profit_enabled()
                .then(|| entry_price * (1.0 + tp)),
            stop_loss: (policy.stop_loss_enabled() && sl < 1.0).then(|| entry_price * (1.0 - sl)),
        },
        Side::Sell => TriggerPrices {
            take_profit: policy
                .take_profit_enabled()
                .then(|| entry_price / (1.0 + tp)),
            // A short can never lose 100% under the entry/current rule.
            stop_loss: (policy.stop_loss_enabled() && sl < 1.0).then(|| entry_price / (1.0 - sl)),
        },
    }
}

fn check_price(field: &str, value: f64) -> Result<(), TradeguardError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TradeguardError::price(field, value));
    }
    Ok(())
}
