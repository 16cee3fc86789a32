//! Price-path construction from simulated return tensors.

use ndarray::{Array1, Array2, Array3, Axis};

use scengen_core::ScenarioError;

/// Build price paths from a `(num_paths, horizon)` log-return matrix.
///
/// `Price[p, t] = start_price * exp(sum of r[p, 0..=t])`.
pub fn price_paths(start_price: f64, returns: &Array2<f64>) -> Array2<f64> {
    let mut paths = returns.clone();
    paths.accumulate_axis_inplace(Axis(1), |&prev, curr| *curr += prev);
    paths.mapv_inplace(|cum| start_price * cum.exp());
    paths
}

/// Build per-asset price paths from a `(num_paths, horizon, n_assets)`
/// log-return tensor.
pub fn asset_price_paths(start_prices: &Array1<f64>, returns: &Array3<f64>) -> Array3<f64> {
    let mut paths = returns.clone();
    paths.accumulate_axis_inplace(Axis(1), |&prev, curr| *curr += prev);
    paths.mapv_inplace(f64::exp);
    paths *= &start_prices.view().insert_axis(Axis(0)).insert_axis(Axis(0));
    paths
}

/// Weighted composite log returns per (path, day) cell, shape
/// `(num_paths, horizon)`.
pub fn portfolio_log_returns(returns: &Array3<f64>, weights: &Array1<f64>) -> Array2<f64> {
    let (num_paths, horizon, n_assets) = returns.dim();
    let flat = returns
        .view()
        .into_shape((num_paths * horizon, n_assets))
        .expect("standard-layout tensor flattens over leading axes");
    flat.dot(weights)
        .into_shape((num_paths, horizon))
        .expect("weighted rows reshape to (num_paths, horizon)")
}

/// Composite portfolio value paths, normalized to a 1.0 starting value
pub fn portfolio_paths(returns: &Array3<f64>, weights: &Array1<f64>) -> Array2<f64> {
    price_paths(1.0, &portfolio_log_returns(returns, weights))
}

/// Resolve portfolio weights.
///
/// Explicit weights must match the asset count and sum to 1 within
/// tolerance; absent weights default to equal weighting.
pub fn resolve_weights(
    n_assets: usize,
    explicit: Option<&[f64]>,
    tolerance: f64,
) -> Result<Array1<f64>, ScenarioError> {
    match explicit {
        None => Ok(Array1::from_elem(n_assets, 1.0 / n_assets as f64)),
        Some(weights) => {
            if weights.len() != n_assets {
                return Err(ScenarioError::WeightMismatch(format!(
                    "{} weights for {} assets",
                    weights.len(),
                    n_assets
                )));
            }
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > tolerance {
                return Err(ScenarioError::WeightMismatch(format!(
                    "weights sum to {sum}, expected 1.0"
                )));
            }
            Ok(Array1::from(weights.to_vec()))
        }
    }
}
