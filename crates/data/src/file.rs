//! JSON-file backed price provider for offline runs.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;
use tracing::debug;

use scengen_core::{PricePoint, PriceSeries};

use crate::{validate_series, DataError, PriceProvider, MIN_SERIES_LEN};

/// On-disk price file layout: `{ "symbol": "SPY", "prices": [...] }`
#[derive(Debug, Deserialize)]
struct PriceFile {
    symbol: String,
    prices: Vec<PricePoint>,
}

/// Provider reading `<dir>/<symbol>.json` files.
///
/// The lookback window is anchored at the newest observation in the file, so
/// fixtures captured in the past keep working.
pub struct JsonFileProvider {
    dir: PathBuf,
}

impl JsonFileProvider {
    /// Create a provider rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PriceProvider for JsonFileProvider {
    async fn fetch(&self, symbol: &str, lookback_years: u32) -> Result<PriceSeries, DataError> {
        let path = self.dir.join(format!("{symbol}.json"));
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(DataError::Io)?;
        let file: PriceFile =
            serde_json::from_str(&raw).map_err(|e| DataError::Parse(e.to_string()))?;

        if file.prices.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let newest = file.prices.last().map(|p| p.date).ok_or(DataError::NoData {
            symbol: symbol.to_string(),
        })?;
        let cutoff = newest - Duration::days(i64::from(lookback_years) * 365);

        let points: Vec<PricePoint> = file
            .prices
            .into_iter()
            .filter(|p| p.date > cutoff)
            .collect();

        debug!(
            symbol = %file.symbol,
            observations = points.len(),
            "loaded price history from {:?}",
            path
        );

        let series = PriceSeries::new(file.symbol, points);
        validate_series(&series, MIN_SERIES_LEN)?;
        Ok(series)
    }
}
