//! Per-user risk policy storage port trait.

use crate::domain::error::TradeguardError;
use crate::domain::risk_policy::RiskPolicy;

/// Key-value store of whole policies keyed by user identifier.
///
/// Implementations report I/O failures as [`TradeguardError::SettingsIo`] and
/// never substitute a default policy for a failed read.
pub trait SettingsPort {
    fn get(&self, user: &str) -> Result<Option<RiskPolicy>, TradeguardError>;

    /// Replaces the stored policy for `user` in a single write.
    fn put(&self, user: &str, policy: &RiskPolicy) -> Result<(), TradeguardError>;
}

impl<T: SettingsPort + ?Sized> SettingsPort for Box<T> {
    fn get(&self, user: &str) -> Result<Option<RiskPolicy>, TradeguardError> {
        (**self).get(user)
    }

    fn put(&self, user: &str, policy: &RiskPolicy) -> Result<(), TradeguardError> {
        (**self).put(user, policy)
    }
}
