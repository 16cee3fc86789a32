//! Monte Carlo simulation core for the Market Scenario Generator
//!
//! This crate turns historical price series into simulated price-path
//! scenarios and risk metrics:
//! - `preprocess`: price series to cleaned log returns
//! - `models`: Gaussian, Gaussian-mixture, and EWMA return models behind one
//!   fit/sample contract
//! - `correlation`: cross-asset correlation, positive-semidefinite repair,
//!   Cholesky factorization, correlated sampling
//! - `paths`: return tensors to price paths and portfolio composites
//! - `stats`: terminal-distribution risk metrics
//! - `orchestrator`: wires the pieces per simulation request
//!
//! Everything is synchronous and request-scoped: one call reads immutable
//! history, computes, and returns. The random generator is created per
//! request from an explicit seed, never shared.

pub mod correlation;
pub mod models;
pub mod orchestrator;
pub mod paths;
pub mod preprocess;
pub mod stats;

pub use correlation::CorrelationOutcome;
pub use orchestrator::ScenarioEngine;

pub use scengen_core::{ScenarioError, SimulationConfig};
