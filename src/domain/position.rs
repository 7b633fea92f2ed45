//! Open position state as seen by the risk evaluator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::TradeguardError;
use crate::domain::signal::SignalKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Side a fresh position would take for `signal`; Neutral opens nothing.
    pub fn from_signal(signal: SignalKind) -> Option<Side> {
        match signal {
            SignalKind::Buy => Some(Side::Buy),
            SignalKind::Sell => Some(Side::Sell),
            SignalKind::Neutral => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Lifecycle of a position. Everything but `Open` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    #[default]
    Open,
    ClosedTakeProfit,
    ClosedStopLoss,
    ClosedTrailingStop,
}

impl PositionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PositionState::Open)
    }
}

/// Outcome of one evaluation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Hold,
    CloseTakeProfit,
    CloseStopLoss,
    CloseTrailingStop,
}

impl Decision {
    pub fn is_close(&self) -> bool {
        !matches!(self, Decision::Hold)
    }

    pub fn resulting_state(&self) -> PositionState {
        match self {
            Decision::Hold => PositionState::Open,
            Decision::CloseTakeProfit => PositionState::ClosedTakeProfit,
            Decision::CloseStopLoss => PositionState::ClosedStopLoss,
            Decision::CloseTrailingStop => PositionState::ClosedTrailingStop,
        }
    }
}

impl From<PositionState> for Decision {
    fn from(state: PositionState) -> Self {
        match state {
            PositionState::Open => Decision::Hold,
            PositionState::ClosedTakeProfit => Decision::CloseTakeProfit,
            PositionState::ClosedStopLoss => Decision::CloseStopLoss,
            PositionState::ClosedTrailingStop => Decision::CloseTrailingStop,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Hold => write!(f, "hold"),
            Decision::CloseTakeProfit => write!(f, "close (take profit)"),
            Decision::CloseStopLoss => write!(f, "close (stop loss)"),
            Decision::CloseTrailingStop => write!(f, "close (trailing stop)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: f64,
    pub side: Side,
    pub opened_at: i64,
    #[serde(default)]
    pub trailing_stop_price: Option<f64>,
    #[serde(default)]
    pub state: PositionState,
}

impl Position {
    pub fn open(side: Side, entry_price: f64, opened_at: i64) -> Result<Self, TradeguardError> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(TradeguardError::price("entry_price", entry_price));
        }
        Ok(Position {
            entry_price,
            side,
            opened_at,
            trailing_stop_price: None,
            state: PositionState::Open,
        })
    }

    pub fn is_long(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    /// Unrealized move in percent, positive when the market moved in the position's favor.
    ///
    /// Shorts measure against the current price: (entry / current - 1) * 100.
    pub fn unrealized_pct(&self, price: f64) -> f64 {
        match self.side {
            Side::Buy => (price / self.entry_price - 1.0) * 100.0,
            Side::Sell => (self.entry_price / price - 1.0) * 100.0,
        }
    }
}
