//! Historical price retrieval for the Market Scenario Generator
//!
//! The simulation core never performs I/O itself; it consumes a
//! [`PriceSeries`] that the caller obtained through a [`PriceProvider`].
//! This crate defines that seam plus two concrete providers: a JSON-file
//! provider for offline runs and an in-memory provider for tests. Real
//! market-data integrations implement the same trait; retry policy belongs
//! to them, not here.

use async_trait::async_trait;

use scengen_core::PriceSeries;

mod file;
mod memory;

pub use file::JsonFileProvider;
pub use memory::StaticProvider;

/// Error types for price retrieval
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("No data available for symbol {symbol}")]
    NoData { symbol: String },

    #[error("Series too short for {symbol}: {got} observations (minimum {min})")]
    SeriesTooShort {
        symbol: String,
        got: usize,
        min: usize,
    },

    #[error("Invalid price data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of historical daily prices.
///
/// Implementations return a chronologically ordered series of strictly
/// positive prices covering at most `lookback_years` before the newest
/// observation, and fail distinguishably when the symbol is unknown or the
/// history is too short.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetch the price history for one symbol
    async fn fetch(&self, symbol: &str, lookback_years: u32) -> Result<PriceSeries, DataError>;
}

/// Validate ordering and positivity of a fetched series
pub(crate) fn validate_series(series: &PriceSeries, min_len: usize) -> Result<(), DataError> {
    if series.len() < min_len {
        return Err(DataError::SeriesTooShort {
            symbol: series.symbol.clone(),
            got: series.len(),
            min: min_len,
        });
    }

    for window in series.points.windows(2) {
        if window[1].date <= window[0].date {
            return Err(DataError::InvalidData {
                symbol: series.symbol.clone(),
                reason: format!("dates not strictly increasing at {}", window[1].date),
            });
        }
    }

    if let Some(point) = series.points.iter().find(|p| !(p.price > 0.0)) {
        return Err(DataError::InvalidData {
            symbol: series.symbol.clone(),
            reason: format!("non-positive price {} at {}", point.price, point.date),
        });
    }

    Ok(())
}

/// Minimum observations a provider must deliver
pub const MIN_SERIES_LEN: usize = 50;
