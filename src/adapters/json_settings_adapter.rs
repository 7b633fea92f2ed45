//! JSON file settings store.
//!
//! The file holds one object keyed by user identifier, each value being a
//! persisted policy record. Writes go to a sibling temp file which is then
//! renamed over the original, so readers never see a half-written file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::domain::error::TradeguardError;
use crate::domain::risk_policy::RiskPolicy;
use crate::ports::config_port::ConfigPort;
use crate::ports::settings_port::SettingsPort;

type PolicyFile = BTreeMap<String, RiskPolicy>;

pub struct JsonSettingsAdapter {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSettingsAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradeguardError> {
        let path =
            config
                .get_string("settings", "path")
                .ok_or_else(|| TradeguardError::ConfigMissing {
                    section: "settings".into(),
                    key: "path".into(),
                })?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PolicyFile, TradeguardError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PolicyFile::new()),
            Err(e) => {
                return Err(TradeguardError::SettingsIo {
                    reason: format!("failed to read {}: {}", self.path.display(), e),
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(PolicyFile::new());
        }
        serde_json::from_str(&content).map_err(|e| TradeguardError::SettingsIo {
            reason: format!("corrupt settings file {}: {}", self.path.display(), e),
        })
    }

    fn save(&self, policies: &PolicyFile) -> Result<(), TradeguardError> {
        let body = serde_json::to_string_pretty(policies).map_err(|e| {
            TradeguardError::SettingsIo {
                reason: format!("failed to encode settings: {}", e),
            }
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, body)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| TradeguardError::SettingsIo {
                reason: format!("failed to write {}: {}", self.path.display(), e),
            })
    }
}

impl SettingsPort for JsonSettingsAdapter {
    fn get(&self, user: &str) -> Result<Option<RiskPolicy>, TradeguardError> {
        Ok(self.load()?.remove(user))
    }

    fn put(&self, user: &str, policy: &RiskPolicy) -> Result<(), TradeguardError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut policies = self.load()?;
        policies.insert(user.to_string(), policy.clone());
        self.save(&policies)?;
        debug!(user, path = %self.path.display(), "wrote settings file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(tp: f64) -> RiskPolicy {
        RiskPolicy {
            take_profit_pct: tp,
            ..RiskPolicy::default()
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsAdapter::new(dir.path().join("risk_settings.json"));
        assert_eq!(store.get("alice").unwrap(), None);
    }

    #[test]
    fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsAdapter::new(dir.path().join("risk_settings.json"));
        store.put("alice", &policy(7.0)).unwrap();
        store.put("bob", &policy(3.0)).unwrap();
        store.put("alice", &policy(8.0)).unwrap();

        assert_eq!(store.get("alice").unwrap(), Some(policy(8.0)));
        assert_eq!(store.get("bob").unwrap(), Some(policy(3.0)));
    }

    #[test]
    fn file_uses_record_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_settings.json");
        let store = JsonSettingsAdapter::new(&path);
        store.put("alice", &policy(7.0)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["alice"]["takeProfit"], 7.0);
        assert_eq!(raw["alice"]["trailingStop"], false);
        assert!(!dir.path().join("risk_settings.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_settings_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_settings.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonSettingsAdapter::new(&path);

        assert!(matches!(
            store.get("alice").unwrap_err(),
            TradeguardError::SettingsIo { .. }
        ));
        // A corrupt file is never silently replaced.
        assert!(store.put("alice", &policy(1.0)).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn unwritable_location_is_settings_io() {
        let store = JsonSettingsAdapter::new("/nonexistent/dir/risk_settings.json");
        assert!(matches!(
            store.put("alice", &policy(1.0)).unwrap_err(),
            TradeguardError::SettingsIo { .. }
        ));
    }
}
