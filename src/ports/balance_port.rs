//! Exchange balance provider port trait.

use serde::{Deserialize, Serialize};

use crate::domain::error::TradeguardError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
}

pub trait BalancePort {
    /// Non-zero balances held by `user`.
    fn balances(&self, user: &str) -> Result<Vec<Balance>, TradeguardError>;

    /// Free amount of `asset`; zero when the account holds none.
    fn free_balance(&self, user: &str, asset: &str) -> Result<f64, TradeguardError> {
        Ok(self
            .balances(user)?
            .iter()
            .find(|b| b.asset.eq_ignore_ascii_case(asset))
            .map_or(0.0, |b| b.free))
    }
}
