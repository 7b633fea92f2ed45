#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tradeguard::domain::error::TradeguardError;
use tradeguard::domain::price::{PricePoint, PriceSeries};
pub use tradeguard::domain::risk_policy::RiskPolicy;
use tradeguard::ports::balance_port::{Balance, BalancePort};
use tradeguard::ports::price_port::PricePort;
use tradeguard::ports::settings_port::SettingsPort;

/// In-memory settings store that counts writes and can be told to fail them.
#[derive(Default)]
pub struct MemorySettingsPort {
    pub policies: Mutex<HashMap<String, RiskPolicy>>,
    pub puts: AtomicUsize,
    pub fail_writes: bool,
}

impl MemorySettingsPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn with_policy(self, user: &str, policy: RiskPolicy) -> Self {
        self.policies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.to_string(), policy);
        self
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl SettingsPort for MemorySettingsPort {
    fn get(&self, user: &str) -> Result<Option<RiskPolicy>, TradeguardError> {
        Ok(self.policies.lock().unwrap().get(user).cloned())
    }

    fn put(&self, user: &str, policy: &RiskPolicy) -> Result<(), TradeguardError> {
        if self.fail_writes {
            return Err(TradeguardError::SettingsIo {
                reason: "store unavailable".into(),
            });
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.policies
            .lock()
            .unwrap()
            .insert(user.to_string(), policy.clone());
        Ok(())
    }
}

pub struct MockPricePort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::at(i as i64, c))
            .collect();
        self.data.insert(symbol.to_string(), points);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn fetch_prices(&self, symbol: &str) -> Result<Vec<PricePoint>, TradeguardError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TradeguardError::PriceFeed {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

pub struct MockBalancePort {
    pub balances: HashMap<String, Vec<Balance>>,
}

impl MockBalancePort {
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    pub fn with_free(mut self, user: &str, asset: &str, free: f64) -> Self {
        self.balances
            .entry(user.to_string())
            .or_default()
            .push(Balance {
                asset: asset.to_string(),
                free,
                locked: 0.0,
            });
        self
    }
}

impl BalancePort for MockBalancePort {
    fn balances(&self, user: &str) -> Result<Vec<Balance>, TradeguardError> {
        Ok(self.balances.get(user).cloned().unwrap_or_default())
    }
}

pub fn series(closes: &[f64]) -> PriceSeries {
    PriceSeries::from_closes(closes).unwrap()
}

/// Strictly rising closes: 100, 101, ... (n values).
pub fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

/// Strictly falling closes: 100, 99, ... (n values).
pub fn falling(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 - i as f64).collect()
}

pub fn policy(tp: f64, sl: f64, trailing: Option<f64>) -> RiskPolicy {
    RiskPolicy {
        take_profit_pct: tp,
        stop_loss_pct: sl,
        max_risk_per_trade_pct: 1.0,
        trailing_stop_enabled: trailing.is_some(),
        trailing_stop_distance_pct: trailing.unwrap_or(0.0),
    }
}
