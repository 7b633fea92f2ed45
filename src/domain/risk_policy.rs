//! Risk policy: per-user thresholds governing when positions close.
//!
//! A policy is only ever replaced as a whole. [`validate_policy`] is the single
//! gate every candidate passes through before it can become a user's canonical
//! policy, so a half-applied update (for example trailing stop enabled with a
//! zero distance) is never observable.

use serde::{Deserialize, Serialize};

use crate::domain::error::TradeguardError;

/// All percentages are on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    #[serde(rename = "takeProfit", alias = "take_profit")]
    pub take_profit_pct: f64,
    #[serde(rename = "stopLoss", alias = "stop_loss")]
    pub stop_loss_pct: f64,
    #[serde(rename = "maxRiskPerTrade", alias = "max_risk", alias = "max_risk_per_trade")]
    pub max_risk_per_trade_pct: f64,
    #[serde(rename = "trailingStop", alias = "trailing_stop")]
    pub trailing_stop_enabled: bool,
    #[serde(
        rename = "trailingStopDistance",
        alias = "trailing_stop_distance",
        default
    )]
    pub trailing_stop_distance_pct: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        RiskPolicy {
            take_profit_pct: 5.0,
            stop_loss_pct: 1.0,
            max_risk_per_trade_pct: 2.0,
            trailing_stop_enabled: false,
            trailing_stop_distance_pct: 0.0,
        }
    }
}

impl RiskPolicy {
    pub fn validated(self) -> Result<Self, TradeguardError> {
        validate_policy(self)
    }

    pub fn take_profit_enabled(&self) -> bool {
        self.take_profit_pct > 0.0
    }

    pub fn stop_loss_enabled(&self) -> bool {
        self.stop_loss_pct > 0.0
    }
}

pub fn validate_policy(candidate: RiskPolicy) -> Result<RiskPolicy, TradeguardError> {
    validate_percentage("take_profit_pct", candidate.take_profit_pct)?;
    validate_percentage("stop_loss_pct", candidate.stop_loss_pct)?;
    validate_max_risk(candidate.max_risk_per_trade_pct)?;
    validate_trailing(
        candidate.trailing_stop_enabled,
        candidate.trailing_stop_distance_pct,
    )?;
    Ok(candidate)
}

fn validate_percentage(field: &str, value: f64) -> Result<(), TradeguardError> {
    if !value.is_finite() {
        return Err(TradeguardError::range(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(TradeguardError::range(field, "must be non-negative"));
    }
    Ok(())
}

fn validate_max_risk(value: f64) -> Result<(), TradeguardError> {
    validate_percentage("max_risk_per_trade_pct", value)?;
    if value == 0.0 || value > 100.0 {
        return Err(TradeguardError::range(
            "max_risk_per_trade_pct",
            "must be greater than 0 and at most 100",
        ));
    }
    Ok(())
}

fn validate_trailing(enabled: bool, distance: f64) -> Result<(), TradeguardError> {
    validate_percentage("trailing_stop_distance_pct", distance)?;
    if enabled && distance <= 0.0 {
        return Err(TradeguardError::range(
            "trailing_stop_distance_pct",
            "must be positive when the trailing stop is enabled",
        ));
    }
    Ok(())
}
