//! Risk statistics over terminal-day return distributions.
//!
//! Volatility is supplied by the caller (daily standard deviation of the
//! full simulated return tensor, annualized by sqrt(252)); the terminal
//! slice alone discards the path-wise dispersion the model already captured,
//! so it is never recomputed here.

use std::cmp::Ordering;

use scengen_core::{PortfolioRiskReport, RiskReport};

/// Linear-interpolation percentile over an ascending-sorted slice.
///
/// Matches the usual numeric-library convention: rank `pct/100 * (n - 1)`,
/// interpolated between the surrounding order statistics.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Population standard deviation of a value iterator
pub fn population_std(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let mut count = 0usize;
    let mut sum = 0.0;
    for v in values.clone() {
        count += 1;
        sum += v;
    }
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    variance.sqrt()
}

/// Core terminal-distribution metrics shared by both report shapes
fn terminal_metrics(final_returns: &[f64]) -> (f64, f64, f64, f64) {
    let n = final_returns.len() as f64;
    let mean = final_returns.iter().sum::<f64>() / n;

    let mut sorted = final_returns.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let var_95 = percentile(&sorted, 5.0);

    let tail: Vec<f64> = sorted.iter().copied().filter(|&r| r <= var_95).collect();
    let cvar_95 = if tail.is_empty() {
        // Degenerate but defined: interpolation can place VaR below every sample
        var_95
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    };

    let prob_loss = final_returns.iter().filter(|&&r| r < 0.0).count() as f64 / n;

    (mean, var_95, cvar_95, prob_loss)
}

/// Risk metrics for a single-asset scenario
pub fn risk_report(final_returns: &[f64], annualized_vol: f64) -> RiskReport {
    let (mean, var_95, cvar_95, prob_loss) = terminal_metrics(final_returns);
    RiskReport {
        mean,
        volatility: annualized_vol,
        var_95,
        cvar_95,
        prob_loss,
    }
}

/// Risk metrics for a portfolio scenario, adding Sharpe and the outcome range
pub fn portfolio_risk_report(final_returns: &[f64], annualized_vol: f64) -> PortfolioRiskReport {
    let (mean, var_95, cvar_95, prob_loss) = terminal_metrics(final_returns);

    let sharpe_ratio = if annualized_vol > 0.0 {
        mean / annualized_vol
    } else {
        0.0
    };

    let max_return = final_returns
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let min_return = final_returns.iter().copied().fold(f64::INFINITY, f64::min);

    PortfolioRiskReport {
        mean,
        volatility: annualized_vol,
        var_95,
        cvar_95,
        prob_loss,
        sharpe_ratio,
        max_return,
        min_return,
    }
}
