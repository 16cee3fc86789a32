//! Shared data types for simulation requests, fitted models, and reports.

use std::str::FromStr;

use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::ScenarioError;

/// Allowed range for the historical lookback window, in years
pub const LOOKBACK_YEARS_RANGE: (u32, u32) = (1, 10);

/// Allowed range for the simulation horizon, in trading days
pub const HORIZON_DAYS_RANGE: (usize, usize) = (1, 1000);

/// Allowed range for the Monte Carlo path count
pub const NUM_PATHS_RANGE: (usize, usize) = (100, 10_000);

/// Single daily price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Observation date
    pub date: NaiveDate,

    /// Closing price, strictly positive
    pub price: f64,
}

/// Date-ordered price history for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Ticker symbol
    pub symbol: String,

    /// Chronologically ordered observations
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Create a new price series
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent price, the anchor for simulated paths
    pub fn start_price(&self) -> Option<f64> {
        self.points.last().map(|p| p.price)
    }
}

/// Cleaned daily log returns for one instrument.
///
/// Values are guaranteed finite and within the configured outlier bound;
/// dates are strictly increasing. Only the preprocessor constructs these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSeries {
    /// Ticker symbol
    pub symbol: String,

    /// (date, log return) pairs
    pub points: Vec<(NaiveDate, f64)>,
}

impl ReturnSeries {
    /// Number of returns
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Return values without dates
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, r)| *r).collect()
    }
}

/// Asset class, selecting the daily-move outlier threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Equities and ETFs
    Equity,

    /// Cryptocurrencies
    Crypto,
}

/// Stochastic return model selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// I.i.d. normal daily returns
    Gaussian,

    /// Finite Gaussian mixture over daily returns
    #[serde(rename = "gmm")]
    Mixture,

    /// Exponentially weighted moving-average volatility
    Ewma,
}

impl ModelKind {
    /// Wire spelling of the selector
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Gaussian => "gaussian",
            ModelKind::Mixture => "gmm",
            ModelKind::Ewma => "ewma",
        }
    }
}

impl FromStr for ModelKind {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gaussian" => Ok(ModelKind::Gaussian),
            "gmm" => Ok(ModelKind::Mixture),
            "ewma" => Ok(ModelKind::Ewma),
            other => Err(ScenarioError::UnknownModel(other.to_string())),
        }
    }
}

/// Fitted parameters of a univariate Gaussian mixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixtureFit {
    /// Component mixing weights, summing to 1
    pub weights: Vec<f64>,

    /// Component means
    pub means: Vec<f64>,

    /// Component variances (full, unshared)
    pub variances: Vec<f64>,
}

/// Fitted return model, scoped to a single simulation request
#[derive(Debug, Clone)]
pub enum FittedModel {
    /// Normal daily returns
    Gaussian {
        /// Fitted historical mean (replaced by the risk-neutral drift at sampling)
        mean: f64,
        /// Bessel-corrected sample standard deviation
        std_dev: f64,
    },

    /// Gaussian mixture over daily returns
    Mixture(MixtureFit),

    /// EWMA volatility estimate
    Ewma {
        /// Estimated volatility per historical day; the forecast projects
        /// the last entry forward at sampling time
        vol_series: Array1<f64>,
    },
}

/// Parameters of one simulation request.
///
/// Range validation mirrors what the calling service layer enforces; the
/// engine re-checks before doing any work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Ticker symbols; one entry runs a single-asset scenario, several run a portfolio
    pub symbols: Vec<String>,

    /// Historical lookback window in years
    pub lookback_years: u32,

    /// Simulation horizon in trading days
    pub horizon_days: usize,

    /// Number of Monte Carlo paths
    pub num_paths: usize,

    /// Return model selector
    pub model: ModelKind,

    /// Explicit portfolio weights; equal weighting when absent
    pub weights: Option<Vec<f64>>,

    /// Seed for the request-scoped random generator; entropy when absent
    pub seed: Option<u64>,

    /// Asset class for outlier filtering
    pub asset_class: AssetClass,
}

impl SimulationRequest {
    /// Validate request-layer ranges
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.symbols.is_empty() {
            return Err(ScenarioError::InvalidRequest(
                "at least one symbol is required".to_string(),
            ));
        }

        let (lo, hi) = LOOKBACK_YEARS_RANGE;
        if self.lookback_years < lo || self.lookback_years > hi {
            return Err(ScenarioError::InvalidRequest(format!(
                "lookback_years {} outside [{}, {}]",
                self.lookback_years, lo, hi
            )));
        }

        let (lo, hi) = HORIZON_DAYS_RANGE;
        if self.horizon_days < lo || self.horizon_days > hi {
            return Err(ScenarioError::InvalidRequest(format!(
                "horizon_days {} outside [{}, {}]",
                self.horizon_days, lo, hi
            )));
        }

        let (lo, hi) = NUM_PATHS_RANGE;
        if self.num_paths < lo || self.num_paths > hi {
            return Err(ScenarioError::InvalidRequest(format!(
                "num_paths {} outside [{}, {}]",
                self.num_paths, lo, hi
            )));
        }

        if let Some(weights) = &self.weights {
            if weights.len() != self.symbols.len() {
                return Err(ScenarioError::WeightMismatch(format!(
                    "{} weights for {} symbols",
                    weights.len(),
                    self.symbols.len()
                )));
            }
        }

        Ok(())
    }
}

/// Scalar risk metrics from the terminal-day return distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    /// Mean terminal return
    pub mean: f64,

    /// Annualized volatility supplied by the simulation
    pub volatility: f64,

    /// 5th-percentile terminal return (linear interpolation)
    pub var_95: f64,

    /// Mean of terminal returns at or below VaR95
    pub cvar_95: f64,

    /// Fraction of paths with negative terminal return
    pub prob_loss: f64,
}

/// Portfolio-level risk metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRiskReport {
    /// Mean terminal return
    pub mean: f64,

    /// Annualized volatility supplied by the simulation
    pub volatility: f64,

    /// 5th-percentile terminal return (linear interpolation)
    pub var_95: f64,

    /// Mean of terminal returns at or below VaR95
    pub cvar_95: f64,

    /// Fraction of paths with negative terminal return
    pub prob_loss: f64,

    /// Mean over annualized volatility, 0 when volatility is 0
    pub sharpe_ratio: f64,

    /// Best terminal return across paths
    pub max_return: f64,

    /// Worst terminal return across paths
    pub min_return: f64,
}

/// Result of a single-asset scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Ticker symbol
    pub symbol: String,

    /// Model used for sampling
    pub model: ModelKind,

    /// Last historical price, the path anchor
    pub start_price: f64,

    /// Terminal price per path
    pub final_prices: Vec<f64>,

    /// Terminal simple return per path
    pub final_returns: Vec<f64>,

    /// Risk metrics over the terminal distribution
    pub risk: RiskReport,

    /// First paths of the price tensor, for visualization
    pub paths_sample: Vec<Vec<f64>>,
}

/// Result of a correlated multi-asset scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioReport {
    /// Ticker symbols, in weight order
    pub symbols: Vec<String>,

    /// Model used for sampling
    pub model: ModelKind,

    /// Resolved portfolio weights
    pub weights: Vec<f64>,

    /// Last historical price per asset
    pub start_prices: Vec<f64>,

    /// Pearson correlation matrix over the aligned history
    pub correlation_matrix: Array2<f64>,

    /// Whether the correlation matrix needed a positive-semidefinite repair
    pub correlation_repaired: bool,

    /// Terminal portfolio return per path
    pub final_returns: Vec<f64>,

    /// Portfolio risk metrics
    pub risk: PortfolioRiskReport,

    /// First paths of the composite portfolio value tensor
    pub portfolio_paths_sample: Vec<Vec<f64>>,

    /// First paths of each asset's price tensor, indexed by symbol order
    pub asset_paths_sample: Vec<Vec<Vec<f64>>>,

    /// Per-asset contribution to the portfolio mean terminal return
    pub mean_return_contributions: Vec<f64>,
}

/// Outcome of one simulation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SimulationOutcome {
    /// Single-asset scenario
    Single(ScenarioReport),

    /// Correlated portfolio scenario
    Portfolio(PortfolioReport),
}
