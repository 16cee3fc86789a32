//! Price-series preprocessing: raw prices to cleaned daily log returns.

use scengen_core::{AssetClass, PriceSeries, ReturnSeries, ScenarioError, SimulationConfig};

/// Compute cleaned daily log returns from a price series.
///
/// `r_t = ln(P_t) - ln(P_{t-1})`; the first observation has no return and is
/// dropped. Non-finite values and any |r| at or above the asset class's
/// outlier threshold are discarded. Pure function.
pub fn compute_log_returns(
    prices: &PriceSeries,
    asset_class: AssetClass,
    config: &SimulationConfig,
) -> Result<ReturnSeries, ScenarioError> {
    if prices.len() < config.min_price_observations {
        return Err(ScenarioError::InsufficientData {
            got: prices.len(),
            min: config.min_price_observations,
        });
    }

    let threshold = config.outlier_threshold(asset_class);

    let points: Vec<_> = prices
        .points
        .windows(2)
        .filter_map(|w| {
            let r = w[1].price.ln() - w[0].price.ln();
            (r.is_finite() && r.abs() < threshold).then_some((w[1].date, r))
        })
        .collect();

    if points.len() < config.min_clean_returns {
        return Err(ScenarioError::InsufficientData {
            got: points.len(),
            min: config.min_clean_returns,
        });
    }

    Ok(ReturnSeries {
        symbol: prices.symbol.clone(),
        points,
    })
}
