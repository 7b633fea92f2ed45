//! Entry sizing under the per-trade risk cap.
//!
//! Steps:
//! 1. Neutral signals open nothing
//! 2. risk_amount = free_balance * max_risk_per_trade_pct / 100
//! 3. With a stop loss, quantity = risk_amount / (price * stop_loss_pct / 100),
//!    capped so the notional never exceeds the free balance
//! 4. Without a stop loss the whole notional is at risk: quantity = risk_amount / price

use serde::Serialize;

use crate::domain::error::TradeguardError;
use crate::domain::evaluator::trigger_prices;
use crate::domain::position::Side;
use crate::domain::risk_policy::RiskPolicy;
use crate::domain::signal::{Signal, SignalKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryPlan {
    pub side: Side,
    pub entry_price: f64,
    pub quantity: f64,
    pub notional: f64,
    pub risk_amount: f64,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
}

pub fn risk_budget(free_balance: f64, policy: &RiskPolicy) -> f64 {
    free_balance * policy.max_risk_per_trade_pct / 100.0
}

pub fn plan_entry(
    signal: &Signal,
    price: f64,
    free_balance: f64,
    policy: &RiskPolicy,
) -> Result<Option<EntryPlan>, TradeguardError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(TradeguardError::price("entry_price", price));
    }
    if !free_balance.is_finite() || free_balance < 0.0 {
        return Err(TradeguardError::range(
            "free_balance",
            "must be a finite, non-negative amount",
        ));
    }

    let side = match signal.kind {
        SignalKind::Buy => Side::Buy,
        SignalKind::Sell => Side::Sell,
        SignalKind::Neutral => return Ok(None),
    };

    let budget = risk_budget(free_balance, policy);
    let max_quantity = free_balance / price;
    let quantity = if policy.stop_loss_enabled() {
        let loss_per_unit = price * policy.stop_loss_pct / 100.0;
        (budget / loss_per_unit).min(max_quantity)
    } else {
        budget / price
    };

    let notional = quantity * price;
    let risk_amount = if policy.stop_loss_enabled() {
        notional * policy.stop_loss_pct / 100.0
    } else {
        notional
    };

    let levels = trigger_prices(price, side, policy);
    Ok(Some(EntryPlan {
        side,
        entry_price: price,
        quantity,
        notional,
        risk_amount,
        stop_loss_price: levels.stop_loss,
        take_profit_price: levels.take_profit,
    }))
}
