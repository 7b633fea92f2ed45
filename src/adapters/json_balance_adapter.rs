//! Balances read from a JSON snapshot file.
//!
//! The file is either an object keyed by user, each value a list of balances,
//! or a bare list applied to every user. Zero balances are dropped.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::domain::error::TradeguardError;
use crate::ports::balance_port::{Balance, BalancePort};

#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    PerUser(HashMap<String, Vec<Balance>>),
    Shared(Vec<Balance>),
}

pub struct JsonBalanceAdapter {
    snapshot: Snapshot,
}

impl JsonBalanceAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradeguardError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| TradeguardError::PriceFeed {
            reason: format!("failed to read balances {}: {}", path.display(), e),
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, TradeguardError> {
        let snapshot = serde_json::from_str(content).map_err(|e| TradeguardError::PriceFeed {
            reason: format!("invalid balance snapshot: {}", e),
        })?;
        Ok(Self { snapshot })
    }
}

impl BalancePort for JsonBalanceAdapter {
    fn balances(&self, user: &str) -> Result<Vec<Balance>, TradeguardError> {
        let all: &[Balance] = match &self.snapshot {
            Snapshot::PerUser(map) => map.get(user).map(Vec::as_slice).unwrap_or_default(),
            Snapshot::Shared(list) => list,
        };
        Ok(all
            .iter()
            .filter(|b| b.free > 0.0 || b.locked > 0.0)
            .cloned()
            .collect())
    }
}
