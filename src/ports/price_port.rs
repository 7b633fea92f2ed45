//! Price feed port trait.
//!
//! The core only consumes what a feed hands it; fetching, caching and rate
//! limiting belong to the implementation.

use crate::domain::error::TradeguardError;
use crate::domain::price::PricePoint;

pub trait PricePort {
    /// Points for `symbol` in ascending time order.
    fn fetch_prices(&self, symbol: &str) -> Result<Vec<PricePoint>, TradeguardError>;
}
