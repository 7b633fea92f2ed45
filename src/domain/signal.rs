//! Signal classification from the latest RSI value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::TradeguardError;
use crate::domain::indicator::RsiMethod;
use crate::domain::indicator::rsi::rsi_series;
use crate::domain::price::PriceSeries;

pub const DEFAULT_RSI_WINDOW: usize = 14;
pub const DEFAULT_OVERSOLD: f64 = 30.0;
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Buy,
    Sell,
    Neutral,
}

impl SignalKind {
    /// Labels emitted by the legacy signal endpoint.
    pub fn label_fr(&self) -> &'static str {
        match self {
            SignalKind::Buy => "achat",
            SignalKind::Sell => "vente",
            SignalKind::Neutral => "neutre",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "buy"),
            SignalKind::Sell => write!(f, "sell"),
            SignalKind::Neutral => write!(f, "neutral"),
        }
    }
}

/// A classification together with the RSI value that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub rsi: Option<f64>,
}

/// Strict thresholds: `rsi < oversold` buys, `rsi > overbought` sells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        SignalThresholds {
            oversold: DEFAULT_OVERSOLD,
            overbought: DEFAULT_OVERBOUGHT,
        }
    }
}

impl SignalThresholds {
    pub fn validate(&self) -> Result<(), TradeguardError> {
        for (field, value) in [("oversold", self.oversold), ("overbought", self.overbought)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(TradeguardError::range(field, "must be between 0 and 100"));
            }
        }
        if self.oversold >= self.overbought {
            return Err(TradeguardError::range(
                "oversold",
                "must be below overbought",
            ));
        }
        Ok(())
    }
}

/// Indicator window, smoothing and thresholds used to derive a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalConfig {
    pub window: usize,
    pub method: RsiMethod,
    pub thresholds: SignalThresholds,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            window: DEFAULT_RSI_WINDOW,
            method: RsiMethod::Simple,
            thresholds: SignalThresholds::default(),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), TradeguardError> {
        if self.window == 0 {
            return Err(TradeguardError::range("window", "must be at least 1"));
        }
        self.thresholds.validate()
    }
}

pub fn classify(rsi: Option<f64>, thresholds: &SignalThresholds) -> Signal {
    let kind = match rsi {
        Some(v) if v < thresholds.oversold => SignalKind::Buy,
        Some(v) if v > thresholds.overbought => SignalKind::Sell,
        _ => SignalKind::Neutral,
    };
    Signal { kind, rsi }
}

/// Classifies the latest point of `series`. Short series yield Neutral with no RSI.
pub fn generate_signal(series: &PriceSeries, config: &SignalConfig) -> Signal {
    let rsi = rsi_series(series, config.window, config.method);
    classify(rsi.latest_value(), &config.thresholds)
}
