//! Scenario orchestration: wires preprocessing, models, correlation, paths,
//! and statistics per simulation request.

use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use scengen_core::{
    ModelKind, PortfolioReport, PriceSeries, ReturnSeries, ScenarioError, ScenarioReport,
    SimulationConfig, SimulationOutcome, SimulationRequest,
};

use crate::{correlation, models, paths, preprocess, stats};

/// The simulation engine.
///
/// Stateless across calls: every request reads immutable history, runs a
/// self-contained computation with its own seeded generator, and returns.
#[derive(Debug, Clone, Default)]
pub struct ScenarioEngine {
    config: SimulationConfig,
}

impl ScenarioEngine {
    /// Create an engine with the given configuration
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Engine configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run one simulation request against pre-fetched price histories.
    ///
    /// `series` must hold one entry per requested symbol, in order; the
    /// caller performs the market-data retrieval before the core runs.
    pub fn run(
        &self,
        request: &SimulationRequest,
        series: &[PriceSeries],
    ) -> Result<SimulationOutcome, ScenarioError> {
        request.validate()?;

        if series.len() != request.symbols.len() {
            return Err(ScenarioError::InvalidRequest(format!(
                "{} price series for {} symbols",
                series.len(),
                request.symbols.len()
            )));
        }

        let mut rng = match request.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        if series.len() == 1 {
            Ok(SimulationOutcome::Single(self.run_single(
                &series[0], request, &mut rng,
            )?))
        } else {
            Ok(SimulationOutcome::Portfolio(self.run_portfolio(
                series, request, &mut rng,
            )?))
        }
    }

    /// Single-asset pipeline: preprocess, fit, sample, build, summarize
    fn run_single(
        &self,
        prices: &PriceSeries,
        request: &SimulationRequest,
        rng: &mut StdRng,
    ) -> Result<ScenarioReport, ScenarioError> {
        let returns = preprocess::compute_log_returns(prices, request.asset_class, &self.config)?;
        let fitted = models::fit(request.model, &returns, &self.config)?;
        let sampled = models::sample(
            &fitted,
            request.horizon_days,
            request.num_paths,
            rng,
            &self.config,
        )?;

        let start_price = prices
            .start_price()
            .ok_or(ScenarioError::InsufficientData {
                got: 0,
                min: self.config.min_price_observations,
            })?;

        let annualized_vol = stats::population_std(sampled.iter().copied())
            * self.config.trading_days_per_year.sqrt();

        let price_paths = paths::price_paths(start_price, &sampled);
        let final_prices: Vec<f64> = price_paths.slice(s![.., -1]).to_vec();
        let final_returns: Vec<f64> = final_prices
            .iter()
            .map(|p| p / start_price - 1.0)
            .collect();

        let risk = stats::risk_report(&final_returns, annualized_vol);
        let paths_sample = sample_rows(&price_paths, self.config.paths_sample_size);

        info!(
            symbol = %prices.symbol,
            model = request.model.as_str(),
            horizon = request.horizon_days,
            paths = request.num_paths,
            "single-asset scenario complete"
        );

        Ok(ScenarioReport {
            symbol: prices.symbol.clone(),
            model: request.model,
            start_price,
            final_prices,
            final_returns,
            risk,
            paths_sample,
        })
    }

    /// Portfolio pipeline: align, correlate, factorize, sample, compose
    fn run_portfolio(
        &self,
        series: &[PriceSeries],
        request: &SimulationRequest,
        rng: &mut StdRng,
    ) -> Result<PortfolioReport, ScenarioError> {
        // The Cholesky pathway transforms normal noise; the mixture and EWMA
        // samplers have no correlated generalization here
        if request.model != ModelKind::Gaussian {
            return Err(ScenarioError::UnknownModel(format!(
                "{} is not supported for multi-asset simulation, use gaussian",
                request.model.as_str()
            )));
        }

        let cleaned: Vec<ReturnSeries> = series
            .iter()
            .map(|prices| preprocess::compute_log_returns(prices, request.asset_class, &self.config))
            .collect::<Result<_, _>>()?;

        let aligned = correlation::align_returns(&cleaned, self.config.min_overlap)?;
        let outcome = correlation::correlation_matrix(&aligned, &self.config)?;
        let factor = correlation::cholesky(&outcome.matrix)?;

        // Per-asset moments over the aligned window, with the risk-neutral
        // variance-drag drift replacing the fitted mean
        let n_assets = series.len();
        let mut std_devs = Array1::zeros(n_assets);
        let mut adjusted_means = Array1::zeros(n_assets);
        for (i, column) in aligned.axis_iter(Axis(1)).enumerate() {
            let values = column.to_vec();
            let (_, std_dev) = models::gaussian_moments(&values);
            std_devs[i] = std_dev;
            adjusted_means[i] = -0.5 * std_dev * std_dev;
        }

        let sampled = correlation::sample_correlated_returns(
            &adjusted_means,
            &std_devs,
            &factor,
            request.horizon_days,
            request.num_paths,
            rng,
        );

        let weights = paths::resolve_weights(
            n_assets,
            request.weights.as_deref(),
            self.config.weight_tolerance,
        )?;

        let start_prices_vec: Vec<f64> = series
            .iter()
            .map(|s| {
                s.start_price().ok_or(ScenarioError::InsufficientData {
                    got: 0,
                    min: self.config.min_price_observations,
                })
            })
            .collect::<Result<_, _>>()?;
        let start_prices = Array1::from(start_prices_vec.clone());

        let asset_paths = paths::asset_price_paths(&start_prices, &sampled);
        let portfolio_log_returns = paths::portfolio_log_returns(&sampled, &weights);

        let annualized_vol = stats::population_std(portfolio_log_returns.iter().copied())
            * self.config.trading_days_per_year.sqrt();

        let portfolio_paths = paths::price_paths(1.0, &portfolio_log_returns);
        let final_returns: Vec<f64> = portfolio_paths
            .slice(s![.., -1])
            .iter()
            .map(|v| v - 1.0)
            .collect();

        let risk = stats::portfolio_risk_report(&final_returns, annualized_vol);

        // Per-asset contribution to the portfolio mean terminal return:
        // weight times the asset's mean terminal simple return
        let mean_return_contributions: Vec<f64> = (0..n_assets)
            .map(|i| {
                let terminal = asset_paths.slice(s![.., -1, i]);
                let mean_return =
                    terminal.iter().map(|p| p / start_prices[i] - 1.0).sum::<f64>()
                        / request.num_paths as f64;
                weights[i] * mean_return
            })
            .collect();

        let portfolio_paths_sample = sample_rows(&portfolio_paths, self.config.paths_sample_size);
        let asset_paths_sample: Vec<Vec<Vec<f64>>> = (0..n_assets)
            .map(|i| {
                let asset_slice = asset_paths.slice(s![.., .., i]).to_owned();
                sample_rows(&asset_slice, self.config.paths_sample_size)
            })
            .collect();

        info!(
            symbols = ?request.symbols,
            repaired = outcome.repaired,
            horizon = request.horizon_days,
            paths = request.num_paths,
            "portfolio scenario complete"
        );

        Ok(PortfolioReport {
            symbols: request.symbols.clone(),
            model: request.model,
            weights: weights.to_vec(),
            start_prices: start_prices_vec,
            correlation_matrix: outcome.matrix,
            correlation_repaired: outcome.repaired,
            final_returns,
            risk,
            portfolio_paths_sample,
            asset_paths_sample,
            mean_return_contributions,
        })
    }
}

/// First `limit` rows of a path matrix as plain vectors
fn sample_rows(paths: &Array2<f64>, limit: usize) -> Vec<Vec<f64>> {
    paths
        .axis_iter(Axis(0))
        .take(limit)
        .map(|row| row.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use scengen_core::{AssetClass, PricePoint};

    fn synthetic_prices(symbol: &str, n: usize, phase: f64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let mut price = 100.0;
        let points = (0..n)
            .map(|i| {
                price *= 1.0 + 0.012 * ((i as f64) * 0.61 + phase).sin();
                PricePoint {
                    date: start + Duration::days(i as i64),
                    price,
                }
            })
            .collect();
        PriceSeries::new(symbol, points)
    }

    fn request(symbols: Vec<&str>, model: ModelKind) -> SimulationRequest {
        SimulationRequest {
            symbols: symbols.into_iter().map(String::from).collect(),
            lookback_years: 3,
            horizon_days: 20,
            num_paths: 200,
            model,
            weights: None,
            seed: Some(7),
            asset_class: AssetClass::Equity,
        }
    }

    #[test]
    fn test_single_asset_run_is_deterministic() {
        let engine = ScenarioEngine::default();
        let prices = synthetic_prices("SPY", 300, 0.0);
        let req = request(vec!["SPY"], ModelKind::Gaussian);

        let a = engine.run(&req, &[prices.clone()]).unwrap();
        let b = engine.run(&req, &[prices]).unwrap();

        match (a, b) {
            (SimulationOutcome::Single(a), SimulationOutcome::Single(b)) => {
                assert_eq!(a.final_prices, b.final_prices);
                assert_eq!(a.paths_sample, b.paths_sample);
            }
            _ => panic!("expected single-asset outcomes"),
        }
    }

    #[test]
    fn test_single_asset_report_shape() {
        let engine = ScenarioEngine::default();
        let prices = synthetic_prices("SPY", 300, 0.0);
        let start_price = prices.start_price().unwrap();
        let req = request(vec!["SPY"], ModelKind::Gaussian);

        let outcome = engine.run(&req, &[prices]).unwrap();
        let report = match outcome {
            SimulationOutcome::Single(r) => r,
            _ => panic!("expected single-asset outcome"),
        };

        assert_eq!(report.start_price, start_price);
        assert_eq!(report.final_prices.len(), 200);
        assert_eq!(report.final_returns.len(), 200);
        assert_eq!(report.paths_sample.len(), 50);
        assert_eq!(report.paths_sample[0].len(), 20);
        assert!(report.final_prices.iter().all(|&p| p > 0.0));
        assert!(report.risk.cvar_95 <= report.risk.var_95);
    }

    #[test]
    fn test_each_model_runs_single_asset() {
        let engine = ScenarioEngine::default();
        let prices = synthetic_prices("SPY", 300, 0.0);

        for model in [ModelKind::Gaussian, ModelKind::Mixture, ModelKind::Ewma] {
            let req = request(vec!["SPY"], model);
            let outcome = engine.run(&req, &[prices.clone()]).unwrap();
            assert!(matches!(outcome, SimulationOutcome::Single(_)));
        }
    }

    #[test]
    fn test_portfolio_run() {
        let engine = ScenarioEngine::default();
        let a = synthetic_prices("SPY", 300, 0.0);
        let b = synthetic_prices("TLT", 300, 1.1);
        let req = request(vec!["SPY", "TLT"], ModelKind::Gaussian);

        let outcome = engine.run(&req, &[a, b]).unwrap();
        let report = match outcome {
            SimulationOutcome::Portfolio(r) => r,
            _ => panic!("expected portfolio outcome"),
        };

        assert_eq!(report.weights, vec![0.5, 0.5]);
        assert_eq!(report.correlation_matrix.dim(), (2, 2));
        assert_eq!(report.final_returns.len(), 200);
        assert_eq!(report.asset_paths_sample.len(), 2);
        assert_eq!(report.mean_return_contributions.len(), 2);
        assert!(report.risk.min_return <= report.risk.max_return);
    }

    #[test]
    fn test_portfolio_rejects_non_gaussian() {
        let engine = ScenarioEngine::default();
        let a = synthetic_prices("SPY", 300, 0.0);
        let b = synthetic_prices("TLT", 300, 1.1);
        let req = request(vec!["SPY", "TLT"], ModelKind::Mixture);

        let err = engine.run(&req, &[a, b]).unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownModel(_)));
    }

    #[test]
    fn test_series_count_mismatch() {
        let engine = ScenarioEngine::default();
        let a = synthetic_prices("SPY", 300, 0.0);
        let req = request(vec!["SPY", "TLT"], ModelKind::Gaussian);

        let err = engine.run(&req, &[a]).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidRequest(_)));
    }
}
