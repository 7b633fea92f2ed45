//! Core domain types and logic.

pub mod price;
pub mod indicator;
pub mod signal;
pub mod risk_policy;
pub mod position;
pub mod evaluator;
pub mod sizing;
pub mod policy_book;
pub mod position_book;
pub mod config_validation;
pub mod error;
