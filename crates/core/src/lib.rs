//! Core module for the Market Scenario Generator
//!
//! This module holds the shared data model for the simulation engine:
//! - Price and return series types
//! - Simulation requests and reports
//! - Configuration and settings
//! - Error types shared across the workspace

mod config;
mod types;

pub use config::SimulationConfig;
pub use types::{
    AssetClass, FittedModel, MixtureFit, ModelKind, PortfolioReport, PortfolioRiskReport,
    PricePoint, PriceSeries, ReturnSeries, RiskReport, ScenarioReport, SimulationOutcome,
    SimulationRequest,
};

/// Error types for the scenario-generation core
#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("Insufficient data: {got} clean observations (minimum {min})")]
    InsufficientData { got: usize, min: usize },

    #[error("Insufficient overlap: {got} shared dates across assets (minimum {min})")]
    InsufficientOverlap { got: usize, min: usize },

    #[error("Weight mismatch: {0}")]
    WeightMismatch(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Decomposition failure: {0}")]
    Decomposition(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Module version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
