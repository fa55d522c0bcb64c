//! CSV loader for daily price history.
//!
//! Reads files in the layout of a downloaded daily-history export: one row per
//! trading day with at least a `Date` column and a `Close` column. Extra
//! columns (Open, High, Volume...) are ignored. Dates may carry a time suffix
//! (`2024-01-02 00:00:00-05:00`), only the calendar day is kept.

use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

use crate::error::SimError;

use super::types::{PriceBar, PriceSeries};

/// Column holding the trading date.
pub const DATE_COLUMN: &str = "Date";

/// Column holding the closing price.
pub const CLOSE_COLUMN: &str = "Close";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid price series: {0}")]
    Series(#[from] SimError),
}

/// Loads historical closes from CSV files.
pub struct PriceLoader {
    data_dir: String,
}

impl PriceLoader {
    /// Create a loader rooted at a data directory.
    pub fn new(data_dir: &str) -> Self {
        Self {
            data_dir: data_dir.to_string(),
        }
    }

    /// Path of the history file for a ticker.
    pub fn csv_path(&self, ticker: &str) -> String {
        format!("{}/{}_historical.csv", self.data_dir, ticker)
    }

    /// Load the history file for a ticker from the data directory.
    pub fn load_ticker(&self, ticker: &str) -> Result<PriceSeries, LoaderError> {
        Self::load_file(self.csv_path(ticker))
    }

    /// Load a history file from an explicit path.
    pub fn load_file(path: impl AsRef<Path>) -> Result<PriceSeries, LoaderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()?
            .select([
                col(DATE_COLUMN).cast(DataType::String),
                col(CLOSE_COLUMN).cast(DataType::Float64),
            ])
            .collect()?;

        dataframe_to_series(&df)
    }
}

/// Convert a two-column (date, close) frame into a validated series.
fn dataframe_to_series(df: &DataFrame) -> Result<PriceSeries, LoaderError> {
    let dates = df.column(DATE_COLUMN)?.str()?;
    let closes = df.column(CLOSE_COLUMN)?.f64()?;

    let mut bars = Vec::with_capacity(df.height());
    for (row, (date, close)) in dates.into_iter().zip(closes.into_iter()).enumerate() {
        let date = date
            .and_then(parse_date)
            .ok_or_else(|| LoaderError::InvalidData(format!("row {row}: unparseable date")))?;
        let close = close
            .ok_or_else(|| LoaderError::InvalidData(format!("row {row}: missing close")))?;
        bars.push(PriceBar::new(date, close));
    }

    Ok(PriceSeries::new(bars)?)
}

/// Parse the calendar-day prefix of a date or timestamp string.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
