//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise `tradeguard=<level>` is used. Output
//! goes to stderr so stdout stays clean for command results.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const DEFAULT_LEVEL: &str = "warn";

pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("tradeguard={}", level)))
        .unwrap_or_else(|_| EnvFilter::new(format!("tradeguard={}", DEFAULT_LEVEL)))
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter(level))
        .try_init();
}
