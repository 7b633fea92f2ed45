//! SQLite settings store.
//!
//! One row per user; the policy record is stored as JSON in `settings` so the
//! persisted shape matches the file store.

use crate::domain::error::TradeguardError;
use crate::domain::risk_policy::RiskPolicy;
use crate::ports::config_port::ConfigPort;
use crate::ports::settings_port::SettingsPort;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

pub struct SqliteSettingsAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteSettingsAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradeguardError> {
        let db_path =
            config
                .get_string("settings", "path")
                .ok_or_else(|| TradeguardError::ConfigMissing {
                    section: "settings".into(),
                    key: "path".into(),
                })?;

        let raw_pool_size = config.get_int("settings", "pool_size", 4);
        let pool_size = u32::try_from(raw_pool_size)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| TradeguardError::ConfigInvalid {
                section: "settings".into(),
                key: "pool_size".into(),
                reason: format!(
                    "pool_size must be between 1 and {}, got {}",
                    u32::MAX,
                    raw_pool_size
                ),
            })?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| TradeguardError::SettingsIo {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, TradeguardError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TradeguardError::SettingsIo {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), TradeguardError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS risk_settings (
                    user_id TEXT PRIMARY KEY NOT NULL,
                    settings TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );",
            )
            .map_err(query_error)
    }

    pub fn list_users(&self) -> Result<Vec<String>, TradeguardError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT user_id FROM risk_settings ORDER BY user_id")
            .map_err(query_error)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_error)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row.map_err(query_error)?);
        }
        Ok(users)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TradeguardError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| TradeguardError::SettingsIo {
                reason: e.to_string(),
            })
    }
}

fn query_error(e: rusqlite::Error) -> TradeguardError {
    TradeguardError::SettingsIo {
        reason: e.to_string(),
    }
}

impl SettingsPort for SqliteSettingsAdapter {
    fn get(&self, user: &str) -> Result<Option<RiskPolicy>, TradeguardError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT settings FROM risk_settings WHERE user_id = ?1",
                params![user],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;

        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| TradeguardError::SettingsIo {
                reason: format!("corrupt settings for {}: {}", user, e),
            })
        })
        .transpose()
    }

    fn put(&self, user: &str, policy: &RiskPolicy) -> Result<(), TradeguardError> {
        let json = serde_json::to_string(policy).map_err(|e| TradeguardError::SettingsIo {
            reason: format!("failed to encode settings: {}", e),
        })?;

        self.conn()?
            .execute(
                "INSERT INTO risk_settings (user_id, settings, updated_at)
                 VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(user_id) DO UPDATE SET
                    settings = excluded.settings,
                    updated_at = excluded.updated_at",
                params![user, json],
            )
            .map_err(query_error)?;
        debug!(user, "stored risk policy row");
        Ok(())
    }
}
