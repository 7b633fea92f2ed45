//! Domain error types.

/// Top-level error type for tradeguard.
#[derive(Debug, thiserror::Error)]
pub enum TradeguardError {
    #[error("invalid range for {field}: {reason}")]
    InvalidRange { field: String, reason: String },

    #[error("invalid price for {field}: {value} (must be finite and positive)")]
    InvalidPrice { field: String, value: f64 },

    #[error("invalid price series at index {index}: {reason}")]
    InvalidSeries { index: usize, reason: String },

    #[error("no risk policy stored for user {user}")]
    PolicyNotFound { user: String },

    #[error("no position with id {id}")]
    PositionNotFound { id: u64 },

    #[error("settings store error: {reason}")]
    SettingsIo { reason: String },

    #[error("price feed error: {reason}")]
    PriceFeed { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradeguardError {
    pub(crate) fn range(field: &str, reason: impl Into<String>) -> Self {
        TradeguardError::InvalidRange {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn price(field: &str, value: f64) -> Self {
        TradeguardError::InvalidPrice {
            field: field.to_string(),
            value,
        }
    }

    /// True for errors caused by caller input rather than the environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            TradeguardError::InvalidRange { .. }
                | TradeguardError::InvalidPrice { .. }
                | TradeguardError::InvalidSeries { .. }
                | TradeguardError::PositionNotFound { .. }
        )
    }
}

impl From<&TradeguardError> for std::process::ExitCode {
    fn from(err: &TradeguardError) -> Self {
        let code: u8 = match err {
            TradeguardError::Io(_) => 1,
            TradeguardError::ConfigParse { .. }
            | TradeguardError::ConfigMissing { .. }
            | TradeguardError::ConfigInvalid { .. } => 2,
            TradeguardError::SettingsIo { .. } | TradeguardError::PolicyNotFound { .. } => 3,
            TradeguardError::InvalidRange { .. } | TradeguardError::PositionNotFound { .. } => 4,
            TradeguardError::InvalidPrice { .. }
            | TradeguardError::InvalidSeries { .. }
            | TradeguardError::PriceFeed { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
