//! CSV file price feed adapter.
//!
//! Each symbol lives in `<base>/<SYMBOL>.csv` with a header row. Two layouts
//! are understood:
//! - `timestamp,close` where timestamp is an integer ordinal (may be empty)
//! - `date,open,high,low,close,volume` where date is `YYYY-MM-DD`; the
//!   timestamp becomes the date's day number in the common era

use crate::domain::error::TradeguardError;
use crate::domain::price::PricePoint;
use crate::ports::price_port::PricePort;
use chrono::{Datelike, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Reads a single price file regardless of the adapter's base path.
    pub fn read_file(path: &Path) -> Result<Vec<PricePoint>, TradeguardError> {
        let content = fs::read_to_string(path).map_err(|e| TradeguardError::PriceFeed {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        parse_prices(&content)
    }
}

impl PricePort for CsvAdapter {
    fn fetch_prices(&self, symbol: &str) -> Result<Vec<PricePoint>, TradeguardError> {
        Self::read_file(&self.csv_path(symbol))
    }
}

pub fn parse_prices(content: &str) -> Result<Vec<PricePoint>, TradeguardError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| TradeguardError::PriceFeed {
            reason: format!("CSV header error: {}", e),
        })?
        .clone();

    let close_col = column(&headers, "close")?;
    let date_col = headers.iter().position(|h| h.eq_ignore_ascii_case("date"));
    let ts_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("timestamp"));

    let mut points = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| TradeguardError::PriceFeed {
            reason: format!("CSV parse error: {}", e),
        })?;

        let close: f64 = record
            .get(close_col)
            .ok_or_else(|| TradeguardError::PriceFeed {
                reason: format!("row {}: missing close column", row + 1),
            })?
            .parse()
            .map_err(|e| TradeguardError::PriceFeed {
                reason: format!("row {}: invalid close value: {}", row + 1, e),
            })?;

        let timestamp = match (ts_col, date_col) {
            (Some(col), _) => parse_timestamp(record.get(col), row)?,
            (None, Some(col)) => parse_date(record.get(col), row)?,
            (None, None) => None,
        };

        points.push(PricePoint { timestamp, close });
    }

    Ok(points)
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, TradeguardError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| TradeguardError::PriceFeed {
            reason: format!("missing {} column", name),
        })
}

fn parse_timestamp(value: Option<&str>, row: usize) -> Result<Option<i64>, TradeguardError> {
    match value {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|e| TradeguardError::PriceFeed {
            reason: format!("row {}: invalid timestamp: {}", row + 1, e),
        }),
    }
}

fn parse_date(value: Option<&str>, row: usize) -> Result<Option<i64>, TradeguardError> {
    match value {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|d| Some(d.num_days_from_ce() as i64))
            .map_err(|e| TradeguardError::PriceFeed {
                reason: format!("row {}: invalid date format: {}", row + 1, e),
            }),
    }
}
