//! Price points and validated price series.

use serde::{Deserialize, Serialize};

use crate::domain::error::TradeguardError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(close: f64) -> Self {
        PricePoint {
            timestamp: None,
            close,
        }
    }

    pub fn at(timestamp: i64, close: f64) -> Self {
        PricePoint {
            timestamp: Some(timestamp),
            close,
        }
    }
}

/// An immutable, validated sequence of closes in ascending time order.
///
/// Construction rejects non-finite or non-positive closes and timestamps that
/// move backwards. Points without a timestamp are accepted anywhere; ordering
/// for those is the caller's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, TradeguardError> {
        let mut last_ts: Option<i64> = None;
        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(TradeguardError::InvalidSeries {
                    index,
                    reason: format!("close {} must be finite and positive", point.close),
                });
            }
            if let Some(ts) = point.timestamp {
                if let Some(prev) = last_ts {
                    if ts < prev {
                        return Err(TradeguardError::InvalidSeries {
                            index,
                            reason: format!("timestamp {ts} precedes previous timestamp {prev}"),
                        });
                    }
                }
                last_ts = Some(ts);
            }
        }
        Ok(PriceSeries { points })
    }

    pub fn from_closes(closes: &[f64]) -> Result<Self, TradeguardError> {
        Self::new(closes.iter().map(|&c| PricePoint::new(c)).collect())
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// At least `window + 1` points are needed for a defined indicator value.
    pub fn has_history_for(&self, window: usize) -> bool {
        window > 0 && self.points.len() > window
    }
}
