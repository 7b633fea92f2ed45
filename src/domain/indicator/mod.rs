//! Technical indicator types.
//!
//! - `IndicatorPoint`: a single point in an indicator time series, `None` during warmup
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a time series of indicator values aligned with its price series

pub mod rsi;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: Option<i64>,
    pub value: Option<f64>,
}

impl IndicatorPoint {
    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

/// How average gains and losses are smoothed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiMethod {
    /// Rolling arithmetic mean over the trailing window.
    #[default]
    Simple,
    /// Wilder's recursive smoothing seeded by the first simple mean.
    Wilder,
}

impl FromStr for RsiMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" | "sma" => Ok(RsiMethod::Simple),
            "wilder" | "rma" => Ok(RsiMethod::Wilder),
            other => Err(format!("unknown RSI method '{other}' (expected simple or wilder)")),
        }
    }
}

impl fmt::Display for RsiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsiMethod::Simple => write!(f, "simple"),
            RsiMethod::Wilder => write!(f, "wilder"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Rsi { window: usize, method: RsiMethod },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Rsi {
                window,
                method: RsiMethod::Simple,
            } => write!(f, "RSI({})", window),
            IndicatorType::Rsi {
                window,
                method: RsiMethod::Wilder,
            } => write!(f, "RSI({},wilder)", window),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Most recent point, defined or not.
    pub fn latest(&self) -> Option<&IndicatorPoint> {
        self.values.last()
    }

    /// Value at the most recent point; `None` when the series is empty or still warming up.
    pub fn latest_value(&self) -> Option<f64> {
        self.values.last().and_then(|p| p.value)
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|p| p.is_defined()).count()
    }
}
