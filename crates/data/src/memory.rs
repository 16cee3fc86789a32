//! In-memory price provider for tests and embedded use.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Duration;

use scengen_core::PriceSeries;

use crate::{validate_series, DataError, PriceProvider, MIN_SERIES_LEN};

/// Provider serving preloaded series, keyed by symbol
#[derive(Default)]
pub struct StaticProvider {
    series: HashMap<String, PriceSeries>,
}

impl StaticProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series under its symbol
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.symbol.clone(), series);
        self
    }
}

#[async_trait]
impl PriceProvider for StaticProvider {
    async fn fetch(&self, symbol: &str, lookback_years: u32) -> Result<PriceSeries, DataError> {
        let full = self.series.get(symbol).ok_or_else(|| DataError::NoData {
            symbol: symbol.to_string(),
        })?;

        let newest = full.points.last().map(|p| p.date).ok_or(DataError::NoData {
            symbol: symbol.to_string(),
        })?;
        let cutoff = newest - Duration::days(i64::from(lookback_years) * 365);

        let points = full
            .points
            .iter()
            .copied()
            .filter(|p| p.date > cutoff)
            .collect();

        let series = PriceSeries::new(full.symbol.clone(), points);
        validate_series(&series, MIN_SERIES_LEN)?;
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scengen_core::PricePoint;

    fn synthetic_series(symbol: &str, days: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let points = (0..days)
            .map(|i| PricePoint {
                date: start + Duration::days(i as i64),
                price: 100.0 + i as f64 * 0.1,
            })
            .collect();
        PriceSeries::new(symbol, points)
    }

    #[tokio::test]
    async fn test_fetch_known_symbol() {
        let provider = StaticProvider::new().with_series(synthetic_series("SPY", 300));
        let series = provider.fetch("SPY", 10).await.unwrap();
        assert_eq!(series.symbol, "SPY");
        assert_eq!(series.len(), 300);
    }

    #[tokio::test]
    async fn test_fetch_unknown_symbol() {
        let provider = StaticProvider::new();
        let err = provider.fetch("MISSING", 3).await.unwrap_err();
        assert!(matches!(err, DataError::NoData { ref symbol } if symbol == "MISSING"));
    }

    #[tokio::test]
    async fn test_fetch_too_short() {
        let provider = StaticProvider::new().with_series(synthetic_series("NEW", 10));
        let err = provider.fetch("NEW", 3).await.unwrap_err();
        assert!(matches!(err, DataError::SeriesTooShort { got: 10, .. }));
    }

    #[tokio::test]
    async fn test_lookback_window() {
        let provider = StaticProvider::new().with_series(synthetic_series("SPY", 800));
        let series = provider.fetch("SPY", 1).await.unwrap();
        // 1 year of calendar days from the newest observation
        assert!(series.len() <= 365);
        assert!(series.len() >= 300);
    }
}
