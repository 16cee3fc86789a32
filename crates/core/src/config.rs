//! Configuration for the simulation engine
//!
//! All numeric policy knobs live here so that model code reads them from one
//! place instead of scattering literals.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AssetClass, ScenarioError};

/// Simulation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Minimum raw price observations before preprocessing
    pub min_price_observations: usize,

    /// Minimum clean log returns after outlier filtering
    pub min_clean_returns: usize,

    /// Minimum shared dates for multi-asset alignment
    pub min_overlap: usize,

    /// Absolute daily log-return bound for equities
    pub equity_outlier_threshold: f64,

    /// Absolute daily log-return bound for crypto
    pub crypto_outlier_threshold: f64,

    /// EWMA variance decay factor
    pub ewma_lambda: f64,

    /// Number of Gaussian mixture components
    pub mixture_components: usize,

    /// Maximum EM iterations for the mixture fit
    pub mixture_max_iter: usize,

    /// EM convergence tolerance on mean log-likelihood
    pub mixture_tolerance: f64,

    /// Symmetric clip bound applied to sampled mixture returns
    pub mixture_clip: f64,

    /// Eigenvalues below the negated tolerance trigger the PSD repair
    pub psd_tolerance: f64,

    /// Value added to the correlation diagonal during the PSD repair
    pub psd_diagonal_jitter: f64,

    /// Tolerance when checking that portfolio weights sum to 1
    pub weight_tolerance: f64,

    /// Trading days per year for annualization
    pub trading_days_per_year: f64,

    /// Number of price paths included in report samples
    pub paths_sample_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_price_observations: 50,
            min_clean_returns: 30,
            min_overlap: 30,
            equity_outlier_threshold: 0.20,
            crypto_outlier_threshold: 0.30,
            ewma_lambda: 0.94,
            mixture_components: 3,
            mixture_max_iter: 100,
            mixture_tolerance: 1e-6,
            mixture_clip: 0.12,
            psd_tolerance: 1e-10,
            psd_diagonal_jitter: 1e-6,
            weight_tolerance: 1e-6,
            trading_days_per_year: 252.0,
            paths_sample_size: 50,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let config_str = std::fs::read_to_string(path)?;
        serde_json::from_str(&config_str).map_err(|e| ScenarioError::Config(e.to_string()))
    }

    /// Outlier threshold for an asset class
    pub fn outlier_threshold(&self, asset_class: AssetClass) -> f64 {
        match asset_class {
            AssetClass::Equity => self.equity_outlier_threshold,
            AssetClass::Crypto => self.crypto_outlier_threshold,
        }
    }
}
