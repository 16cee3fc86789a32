//! End-to-end scenario properties: seeded determinism and portfolio
//! correlation convergence.

use chrono::{Duration, NaiveDate};
use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use scengen_core::{
    AssetClass, ModelKind, PricePoint, PriceSeries, ReturnSeries, SimulationConfig,
    SimulationOutcome, SimulationRequest,
};
use scengen_sim::{correlation, models, paths, preprocess, ScenarioEngine};

/// Price history whose preprocessing yields exactly `n_returns` clean returns
fn fixture_prices(symbol: &str, n_returns: usize, seed: u64) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let mut price = 250.0;

    let points = (0..=n_returns)
        .map(|i| {
            if i > 0 {
                // Uniform moves well inside the outlier threshold
                price *= 1.0 + rng.gen_range(-0.015..0.015);
            }
            PricePoint {
                date: start + Duration::days(i as i64),
                price,
            }
        })
        .collect();

    PriceSeries::new(symbol, points)
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

#[test]
fn gaussian_scenario_with_252_returns_is_reproducible() {
    let config = SimulationConfig::default();
    let prices = fixture_prices("SPY", 252, 9);

    let returns = preprocess::compute_log_returns(&prices, AssetClass::Equity, &config).unwrap();
    assert_eq!(returns.len(), 252);

    let fitted = models::fit(ModelKind::Gaussian, &returns, &config).unwrap();

    // One path over ten days, seed 7, run twice
    let mut rng_a = StdRng::seed_from_u64(7);
    let mut rng_b = StdRng::seed_from_u64(7);
    let sample_a = models::sample(&fitted, 10, 1, &mut rng_a, &config).unwrap();
    let sample_b = models::sample(&fitted, 10, 1, &mut rng_b, &config).unwrap();
    assert_eq!(sample_a, sample_b);

    let start_price = prices.start_price().unwrap();
    let path_a = paths::price_paths(start_price, &sample_a);
    let path_b = paths::price_paths(start_price, &sample_b);
    assert_eq!(path_a, path_b);
    assert_eq!(path_a.dim(), (1, 10));
}

#[test]
fn engine_run_is_reproducible_across_calls() {
    let engine = ScenarioEngine::default();
    let prices = fixture_prices("SPY", 252, 9);

    let request = SimulationRequest {
        symbols: vec!["SPY".to_string()],
        lookback_years: 3,
        horizon_days: 10,
        num_paths: 100,
        model: ModelKind::Gaussian,
        weights: None,
        seed: Some(7),
        asset_class: AssetClass::Equity,
    };

    let a = engine.run(&request, &[prices.clone()]).unwrap();
    let b = engine.run(&request, &[prices]).unwrap();

    match (a, b) {
        (SimulationOutcome::Single(a), SimulationOutcome::Single(b)) => {
            assert_eq!(a.final_prices, b.final_prices);
            assert_eq!(a.risk.var_95, b.risk.var_95);
        }
        _ => panic!("expected single-asset outcomes"),
    }
}

#[test]
fn simulated_correlation_converges_to_historical() {
    let config = SimulationConfig::default();
    let rho = 0.7;

    // Correlated return history: r2 = rho * r1 + sqrt(1 - rho^2) * e
    let mut rng = StdRng::seed_from_u64(17);
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let n_days = 500;

    let mut points_a = Vec::with_capacity(n_days);
    let mut points_b = Vec::with_capacity(n_days);
    for i in 0..n_days {
        let date = start + Duration::days(i as i64);
        let z1: f64 = rng.gen_range(-1.0..1.0);
        let z2: f64 = rng.gen_range(-1.0..1.0);
        let r1 = 0.012 * z1;
        let r2 = rho * r1 + (1.0 - rho * rho).sqrt() * 0.012 * z2;
        points_a.push((date, r1));
        points_b.push((date, r2));
    }

    let series_a = ReturnSeries {
        symbol: "A".to_string(),
        points: points_a,
    };
    let series_b = ReturnSeries {
        symbol: "B".to_string(),
        points: points_b,
    };

    let aligned =
        correlation::align_returns(&[series_a, series_b], config.min_overlap).unwrap();
    let outcome = correlation::correlation_matrix(&aligned, &config).unwrap();
    let historical_rho = outcome.matrix[[0, 1]];
    let factor = correlation::cholesky(&outcome.matrix).unwrap();

    // Per-asset moments over the aligned window
    let mut std_devs = Array1::zeros(2);
    let mut adjusted_means = Array1::zeros(2);
    for (i, column) in aligned.axis_iter(Axis(1)).enumerate() {
        let values = column.to_vec();
        let (_, std_dev) = models::gaussian_moments(&values);
        std_devs[i] = std_dev;
        adjusted_means[i] = -0.5 * std_dev * std_dev;
    }

    let mut sim_rng = StdRng::seed_from_u64(99);
    let sampled = correlation::sample_correlated_returns(
        &adjusted_means,
        &std_devs,
        &factor,
        10,
        50_000,
        &mut sim_rng,
    );

    // Terminal log return per (path, asset)
    let terminal = sampled.sum_axis(Axis(1));
    let asset_a: Vec<f64> = terminal.column(0).to_vec();
    let asset_b: Vec<f64> = terminal.column(1).to_vec();

    let simulated_rho = pearson(&asset_a, &asset_b);
    assert!(
        (simulated_rho - historical_rho).abs() < 0.05,
        "simulated {simulated_rho} vs historical {historical_rho}"
    );
}

#[test]
fn portfolio_engine_reports_contributions_and_correlation() {
    let engine = ScenarioEngine::default();
    let a = fixture_prices("SPY", 400, 3);
    let b = fixture_prices("TLT", 400, 4);

    let request = SimulationRequest {
        symbols: vec!["SPY".to_string(), "TLT".to_string()],
        lookback_years: 3,
        horizon_days: 21,
        num_paths: 500,
        model: ModelKind::Gaussian,
        weights: Some(vec![0.5, 0.5]),
        seed: Some(123),
        asset_class: AssetClass::Equity,
    };

    let outcome = engine.run(&request, &[a, b]).unwrap();
    let report = match outcome {
        SimulationOutcome::Portfolio(r) => r,
        _ => panic!("expected portfolio outcome"),
    };

    assert_eq!(report.correlation_matrix.dim(), (2, 2));
    assert!((report.correlation_matrix[[0, 0]] - 1.0).abs() < 1e-9);
    assert_eq!(
        report.correlation_matrix[[0, 1]],
        report.correlation_matrix[[1, 0]]
    );

    // Contributions weighted 50/50 sum close to the portfolio mean; the
    // composite compounds log returns so equality is approximate
    let contribution_sum: f64 = report.mean_return_contributions.iter().sum();
    assert!((contribution_sum - report.risk.mean).abs() < 0.02);

    assert_eq!(report.portfolio_paths_sample.len(), 50);
    assert_eq!(report.asset_paths_sample[0].len(), 50);
    assert!(report.risk.cvar_95 <= report.risk.var_95);
}
