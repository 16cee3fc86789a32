//! Stochastic return models: Gaussian, Gaussian mixture, EWMA volatility.
//!
//! The three models sit behind one contract: `fit` produces a request-scoped
//! [`FittedModel`] variant, `sample` turns it into a `(num_paths, horizon)`
//! matrix of daily log returns. Sampling is risk-neutral throughout: the
//! fitted historical drift is discarded and only the Ito variance-drag
//! correction survives, so terminal price distributions are driftless.

use ndarray::{Array1, Array2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use statrs::distribution::Normal;
use tracing::debug;

use scengen_core::{FittedModel, MixtureFit, ModelKind, ReturnSeries, ScenarioError, SimulationConfig};

use crate::stats::percentile;

/// Fit the selected model to a cleaned return series
pub fn fit(
    model: ModelKind,
    returns: &ReturnSeries,
    config: &SimulationConfig,
) -> Result<FittedModel, ScenarioError> {
    if returns.len() < config.min_clean_returns {
        return Err(ScenarioError::InsufficientData {
            got: returns.len(),
            min: config.min_clean_returns,
        });
    }

    let values = returns.values();
    match model {
        ModelKind::Gaussian => {
            let (mean, std_dev) = gaussian_moments(&values);
            Ok(FittedModel::Gaussian { mean, std_dev })
        }
        ModelKind::Mixture => {
            let fit = fit_mixture(
                &values,
                config.mixture_components,
                config.mixture_max_iter,
                config.mixture_tolerance,
            )?;
            Ok(FittedModel::Mixture(fit))
        }
        ModelKind::Ewma => {
            let vol_series = ewma_volatility(&values, config.ewma_lambda);
            Ok(FittedModel::Ewma { vol_series })
        }
    }
}

/// Sample daily log returns from a fitted model.
///
/// Output shape is `(num_paths, horizon)`; every cell is a log return. The
/// generator is the caller's request-scoped handle, so a fixed seed
/// reproduces the tensor bit for bit.
pub fn sample(
    model: &FittedModel,
    horizon: usize,
    num_paths: usize,
    rng: &mut StdRng,
    config: &SimulationConfig,
) -> Result<Array2<f64>, ScenarioError> {
    match model {
        FittedModel::Gaussian { std_dev, .. } => {
            Ok(sample_gaussian(*std_dev, horizon, num_paths, rng))
        }
        FittedModel::Mixture(fit) => {
            sample_mixture(fit, horizon, num_paths, config.mixture_clip, rng)
        }
        FittedModel::Ewma { vol_series } => {
            let last_vol = vol_series.last().copied().unwrap_or(0.0);
            let vol_forecast = forecast_volatility(last_vol, horizon);
            Ok(sample_ewma(&vol_forecast, num_paths, rng))
        }
    }
}

/// Mean and Bessel-corrected sample standard deviation
pub fn gaussian_moments(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// Draw i.i.d. normal returns under the risk-neutral drift `-sigma^2 / 2`
fn sample_gaussian(std_dev: f64, horizon: usize, num_paths: usize, rng: &mut StdRng) -> Array2<f64> {
    let adj_mean = -0.5 * std_dev * std_dev;

    if std_dev <= 0.0 {
        // Degenerate history with zero variance: every path is flat
        return Array2::from_elem((num_paths, horizon), adj_mean);
    }

    let normal = Normal::new(adj_mean, std_dev).expect("std_dev checked positive");
    let draws: Vec<f64> = (0..num_paths * horizon).map(|_| normal.sample(rng)).collect();
    Array2::from_shape_vec((num_paths, horizon), draws)
        .expect("draw count matches (num_paths, horizon)")
}

/// Fit a univariate Gaussian mixture by expectation-maximization.
///
/// Initialization is deterministic: component means start at evenly spaced
/// quantiles of the data, variances at the overall sample variance, weights
/// uniform. Convergence is declared when the mean log-likelihood moves less
/// than `tol` between iterations.
pub fn fit_mixture(
    values: &[f64],
    n_components: usize,
    max_iter: usize,
    tol: f64,
) -> Result<MixtureFit, ScenarioError> {
    let n = values.len();
    if n < n_components {
        return Err(ScenarioError::InsufficientData {
            got: n,
            min: n_components,
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut means: Vec<f64> = (0..n_components)
        .map(|k| {
            let pct = 100.0 * (k as f64 + 0.5) / n_components as f64;
            percentile(&sorted, pct)
        })
        .collect();

    let (_, overall_std) = gaussian_moments(values);
    let mut variances = vec![(overall_std * overall_std).max(1e-10); n_components];
    let mut weights = vec![1.0 / n_components as f64; n_components];

    let mut responsibilities = vec![0.0; n * n_components];
    let mut prev_log_likelihood = f64::NEG_INFINITY;

    for iteration in 0..max_iter {
        // E-step: responsibilities plus the mean log-likelihood
        let mut log_likelihood = 0.0;
        for (i, &x) in values.iter().enumerate() {
            let mut total = 0.0;
            for k in 0..n_components {
                let p = weights[k] * normal_pdf(x, means[k], variances[k]);
                responsibilities[i * n_components + k] = p;
                total += p;
            }
            if total > 1e-300 {
                for k in 0..n_components {
                    responsibilities[i * n_components + k] /= total;
                }
                log_likelihood += total.ln();
            } else {
                for k in 0..n_components {
                    responsibilities[i * n_components + k] = 1.0 / n_components as f64;
                }
            }
        }
        log_likelihood /= n as f64;

        // M-step
        for k in 0..n_components {
            let n_k = (0..n)
                .map(|i| responsibilities[i * n_components + k])
                .sum::<f64>()
                .max(1e-10);

            weights[k] = n_k / n as f64;
            means[k] = (0..n)
                .map(|i| responsibilities[i * n_components + k] * values[i])
                .sum::<f64>()
                / n_k;
            variances[k] = ((0..n)
                .map(|i| {
                    let d = values[i] - means[k];
                    responsibilities[i * n_components + k] * d * d
                })
                .sum::<f64>()
                / n_k)
                .max(1e-10);
        }

        if (log_likelihood - prev_log_likelihood).abs() < tol {
            debug!(iteration, log_likelihood, "mixture fit converged");
            break;
        }
        prev_log_likelihood = log_likelihood;
    }

    let weight_sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= weight_sum;
    }

    Ok(MixtureFit {
        weights,
        means,
        variances,
    })
}

/// Sample from a fitted mixture, then clip and recenter.
///
/// Mixture tails can produce implausibly large daily moves, so every draw is
/// clipped to the symmetric bound first; only then is the global mean
/// subtracted, which keeps the clipped extremes from dominating the
/// drift-neutralization.
fn sample_mixture(
    fit: &MixtureFit,
    horizon: usize,
    num_paths: usize,
    clip: f64,
    rng: &mut StdRng,
) -> Result<Array2<f64>, ScenarioError> {
    let component_index =
        WeightedIndex::new(&fit.weights).map_err(|e| ScenarioError::Decomposition(e.to_string()))?;
    let components: Vec<Normal> = fit
        .means
        .iter()
        .zip(&fit.variances)
        .map(|(&mean, &var)| Normal::new(mean, var.sqrt()).expect("variance floored positive"))
        .collect();

    let draws: Vec<f64> = (0..num_paths * horizon)
        .map(|_| {
            let k = component_index.sample(rng);
            components[k].sample(rng)
        })
        .collect();

    let mut sampled = Array2::from_shape_vec((num_paths, horizon), draws)
        .expect("draw count matches (num_paths, horizon)");

    sampled.mapv_inplace(|v| v.clamp(-clip, clip));
    let global_mean = sampled.mean().unwrap_or(0.0);
    sampled -= global_mean;

    Ok(sampled)
}

/// EWMA volatility series over a return history.
///
/// `var_0 = r_0^2`, `var_t = lambda * var_{t-1} + (1 - lambda) * r_{t-1}^2`.
pub fn ewma_volatility(returns: &[f64], lambda: f64) -> Array1<f64> {
    let n = returns.len();
    let mut variance = vec![0.0; n];
    if n > 0 {
        variance[0] = returns[0] * returns[0];
    }
    for t in 1..n {
        variance[t] = lambda * variance[t - 1] + (1.0 - lambda) * returns[t - 1] * returns[t - 1];
    }
    Array1::from_iter(variance.into_iter().map(f64::sqrt))
}

/// Flat volatility forecast: every future day reuses the last estimate.
///
/// Under a random-walk view of volatility the last estimate is the expected
/// value for every future day, so the forecast does not decay.
pub fn forecast_volatility(last_vol: f64, horizon: usize) -> Array1<f64> {
    Array1::from_elem(horizon, last_vol)
}

/// Draw day-scaled normal returns with the per-day variance-drag shift
fn sample_ewma(vol_forecast: &Array1<f64>, num_paths: usize, rng: &mut StdRng) -> Array2<f64> {
    let horizon = vol_forecast.len();
    let std_normal = Normal::new(0.0, 1.0).expect("unit normal");

    let mut sampled = Array2::zeros((num_paths, horizon));
    for path in 0..num_paths {
        for day in 0..horizon {
            let vol = vol_forecast[day];
            let z: f64 = std_normal.sample(rng);
            sampled[[path, day]] = z * vol - 0.5 * vol * vol;
        }
    }
    sampled
}

/// Probability density of `N(mean, var)` at `x`
fn normal_pdf(x: f64, mean: f64, var: f64) -> f64 {
    let d = x - mean;
    (-0.5 * d * d / var).exp() / (2.0 * std::f64::consts::PI * var).sqrt()
}
