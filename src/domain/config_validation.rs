//! Configuration validation.
//!
//! Validates the `[signal]`, `[risk]` and `[settings]` sections before use.

use crate::domain::error::TradeguardError;
use crate::domain::indicator::RsiMethod;
use crate::domain::risk_policy::{RiskPolicy, validate_policy};
use crate::domain::signal::{
    DEFAULT_OVERBOUGHT, DEFAULT_OVERSOLD, DEFAULT_RSI_WINDOW, SignalConfig, SignalThresholds,
};
use crate::ports::config_port::ConfigPort;

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), TradeguardError> {
    validate_window(config)?;
    validate_thresholds(config)?;
    validate_method(config)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), TradeguardError> {
    validate_policy(read_risk_policy(config)).map_err(|e| match e {
        TradeguardError::InvalidRange { field, reason } => TradeguardError::ConfigInvalid {
            section: "risk".to_string(),
            key: risk_key(&field).to_string(),
            reason,
        },
        other => other,
    })?;
    Ok(())
}

pub fn validate_settings_config(config: &dyn ConfigPort) -> Result<(), TradeguardError> {
    let backend = config
        .get_string("settings", "backend")
        .unwrap_or_else(|| "json".to_string());
    match backend.trim().to_lowercase().as_str() {
        "json" | "sqlite" => {}
        _ => {
            return Err(TradeguardError::ConfigInvalid {
                section: "settings".to_string(),
                key: "backend".to_string(),
                reason: "backend must be json or sqlite".to_string(),
            });
        }
    }

    match config.get_string("settings", "path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(TradeguardError::ConfigMissing {
                section: "settings".to_string(),
                key: "path".to_string(),
            });
        }
    }

    let pool_size = config.get_int("settings", "pool_size", 4);
    if pool_size < 1 {
        return Err(TradeguardError::ConfigInvalid {
            section: "settings".to_string(),
            key: "pool_size".to_string(),
            reason: "pool_size must be at least 1".to_string(),
        });
    }
    if pool_size > i64::from(u32::MAX) {
        return Err(TradeguardError::ConfigInvalid {
            section: "settings".to_string(),
            key: "pool_size".to_string(),
            reason: format!("pool_size must be at most {}", u32::MAX),
        });
    }
    Ok(())
}

/// Builds the signal configuration, applying defaults for absent keys.
pub fn build_signal_config(config: &dyn ConfigPort) -> Result<SignalConfig, TradeguardError> {
    validate_signal_config(config)?;
    let method = match config.get_string("signal", "method") {
        Some(s) => parse_method(&s)?,
        None => RsiMethod::Simple,
    };
    Ok(SignalConfig {
        window: config.get_int("signal", "window", DEFAULT_RSI_WINDOW as i64) as usize,
        method,
        thresholds: SignalThresholds {
            oversold: config.get_double("signal", "oversold", DEFAULT_OVERSOLD),
            overbought: config.get_double("signal", "overbought", DEFAULT_OVERBOUGHT),
        },
    })
}

/// Builds a validated policy from the `[risk]` section.
pub fn build_risk_policy(config: &dyn ConfigPort) -> Result<RiskPolicy, TradeguardError> {
    validate_risk_config(config)?;
    Ok(read_risk_policy(config))
}

fn read_risk_policy(config: &dyn ConfigPort) -> RiskPolicy {
    let defaults = RiskPolicy::default();
    RiskPolicy {
        take_profit_pct: config.get_double("risk", "take_profit", defaults.take_profit_pct),
        stop_loss_pct: config.get_double("risk", "stop_loss", defaults.stop_loss_pct),
        max_risk_per_trade_pct: config.get_double(
            "risk",
            "max_risk_per_trade",
            defaults.max_risk_per_trade_pct,
        ),
        trailing_stop_enabled: config.get_bool(
            "risk",
            "trailing_stop",
            defaults.trailing_stop_enabled,
        ),
        trailing_stop_distance_pct: config.get_double(
            "risk",
            "trailing_stop_distance",
            defaults.trailing_stop_distance_pct,
        ),
    }
}

fn risk_key(field: &str) -> &str {
    match field {
        "take_profit_pct" => "take_profit",
        "stop_loss_pct" => "stop_loss",
        "max_risk_per_trade_pct" => "max_risk_per_trade",
        "trailing_stop_distance_pct" => "trailing_stop_distance",
        other => other,
    }
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), TradeguardError> {
    let value = config.get_int("signal", "window", DEFAULT_RSI_WINDOW as i64);
    if value < 1 {
        return Err(TradeguardError::ConfigInvalid {
            section: "signal".to_string(),
            key: "window".to_string(),
            reason: "window must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), TradeguardError> {
    let thresholds = SignalThresholds {
        oversold: config.get_double("signal", "oversold", DEFAULT_OVERSOLD),
        overbought: config.get_double("signal", "overbought", DEFAULT_OVERBOUGHT),
    };
    thresholds.validate().map_err(|e| match e {
        TradeguardError::InvalidRange { field, reason } => TradeguardError::ConfigInvalid {
            section: "signal".to_string(),
            key: field,
            reason,
        },
        other => other,
    })
}

fn validate_method(config: &dyn ConfigPort) -> Result<(), TradeguardError> {
    if let Some(s) = config.get_string("signal", "method") {
        parse_method(&s)?;
    }
    Ok(())
}

fn parse_method(value: &str) -> Result<RsiMethod, TradeguardError> {
    value
        .parse::<RsiMethod>()
        .map_err(|reason| TradeguardError::ConfigInvalid {
            section: "signal".to_string(),
            key: "method".to_string(),
            reason,
        })
}
