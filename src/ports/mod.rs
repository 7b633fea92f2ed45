//! Port traits at the boundary of the core.

pub mod balance_port;
pub mod config_port;
pub mod price_port;
pub mod settings_port;
