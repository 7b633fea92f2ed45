//! RSI (Relative Strength Index) indicator implementation.
//!
//! Price deltas are split into gains (positive deltas) and losses (absolute
//! negative deltas). Averages over the trailing `window` deltas are either a
//! rolling arithmetic mean (`RsiMethod::Simple`, the default) or Wilder's
//! smoothing (`RsiMethod::Wilder`):
//! - First average: simple mean of the first `window` deltas
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0 and avg_gain > 0: RSI = 100
//! If avg_loss == 0 and avg_gain == 0: RSI = 50 (flat market)
//!
//! Warmup: indices below `window` are `None`; a defined value needs `window` deltas.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, RsiMethod};
use crate::domain::price::PriceSeries;

/// RSI over raw closes using the rolling simple mean. Output is aligned with the input.
pub fn calculate_rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    calculate_rsi_with(closes, window, RsiMethod::Simple)
}

pub fn calculate_rsi_with(closes: &[f64], window: usize, method: RsiMethod) -> Vec<Option<f64>> {
    let mut values = vec![None; closes.len()];
    if window == 0 || closes.len() <= window {
        return values;
    }

    let mut gains: Vec<f64> = Vec::with_capacity(closes.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(closes.len() - 1);
    for pair in closes.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let n = window as f64;
    match method {
        RsiMethod::Simple => {
            // Value at index i covers deltas i-window..i (delta j spans closes j and j+1).
            for i in window..closes.len() {
                let avg_gain = gains[i - window..i].iter().sum::<f64>() / n;
                let avg_loss = losses[i - window..i].iter().sum::<f64>() / n;
                values[i] = Some(rsi_from_averages(avg_gain, avg_loss));
            }
        }
        RsiMethod::Wilder => {
            let mut avg_gain = gains[..window].iter().sum::<f64>() / n;
            let mut avg_loss = losses[..window].iter().sum::<f64>() / n;
            values[window] = Some(rsi_from_averages(avg_gain, avg_loss));

            for i in window + 1..closes.len() {
                avg_gain = (avg_gain * (n - 1.0) + gains[i - 1]) / n;
                avg_loss = (avg_loss * (n - 1.0) + losses[i - 1]) / n;
                values[i] = Some(rsi_from_averages(avg_gain, avg_loss));
            }
        }
    }

    values
}

/// Maps average gain/loss to an RSI value with explicit zero-loss branches.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

/// RSI over a validated series, carrying each point's timestamp.
pub fn rsi_series(series: &PriceSeries, window: usize, method: RsiMethod) -> IndicatorSeries {
    let values = calculate_rsi_with(&series.closes(), window, method);
    IndicatorSeries {
        indicator_type: IndicatorType::Rsi { window, method },
        values: series
            .points()
            .iter()
            .zip(values)
            .map(|(point, value)| IndicatorPoint {
                timestamp: point.timestamp,
                value,
            })
            .collect(),
    }
}
