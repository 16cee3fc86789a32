//! Cross-asset correlation: alignment, estimation, repair, factorization,
//! and correlated sampling.
//!
//! The correlation matrix is estimated over the inner join of the assets'
//! return histories. A numerically indefinite estimate is repaired by adding
//! a small diagonal jitter (reported as a warning, never an error); the
//! repaired matrix is then Cholesky-factorized, and the lower-triangular
//! factor turns independent normal noise into correlated noise.

use std::collections::HashMap;

use chrono::NaiveDate;
use ndarray::{Array1, Array2, Array3, Axis};
use ndarray_stats::CorrelationExt;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use statrs::distribution::Normal;
use tracing::{debug, warn};

use scengen_core::{ReturnSeries, ScenarioError, SimulationConfig};

/// Correlation matrix plus whether the PSD repair fired
#[derive(Debug, Clone)]
pub struct CorrelationOutcome {
    /// Symmetric correlation matrix, positive semidefinite after repair
    pub matrix: Array2<f64>,

    /// True when the diagonal jitter was applied
    pub repaired: bool,
}

/// Inner-join return series on shared dates.
///
/// Output shape is `(shared_dates, n_assets)` with rows in date order.
/// Fails with `InsufficientOverlap` when fewer than `min_overlap` dates are
/// common to every asset.
pub fn align_returns(
    series: &[ReturnSeries],
    min_overlap: usize,
) -> Result<Array2<f64>, ScenarioError> {
    if series.is_empty() {
        return Err(ScenarioError::InsufficientOverlap {
            got: 0,
            min: min_overlap,
        });
    }

    let maps: Vec<HashMap<NaiveDate, f64>> = series
        .iter()
        .map(|s| s.points.iter().copied().collect())
        .collect();

    // The first series' dates are already ascending; keep those present everywhere
    let shared: Vec<NaiveDate> = series[0]
        .points
        .iter()
        .map(|(date, _)| *date)
        .filter(|date| maps[1..].iter().all(|m| m.contains_key(date)))
        .collect();

    if shared.len() < min_overlap {
        return Err(ScenarioError::InsufficientOverlap {
            got: shared.len(),
            min: min_overlap,
        });
    }

    let mut aligned = Array2::zeros((shared.len(), series.len()));
    for (row, date) in shared.iter().enumerate() {
        for (col, map) in maps.iter().enumerate() {
            aligned[[row, col]] = map[date];
        }
    }

    debug!(
        assets = series.len(),
        shared_dates = shared.len(),
        "aligned return histories"
    );
    Ok(aligned)
}

/// Pearson correlation over an aligned return window, repaired to positive
/// semidefinite when needed.
pub fn correlation_matrix(
    aligned: &Array2<f64>,
    config: &SimulationConfig,
) -> Result<CorrelationOutcome, ScenarioError> {
    // ndarray-stats expects variables as rows
    let mut matrix = aligned
        .t()
        .pearson_correlation()
        .map_err(|_| ScenarioError::InsufficientOverlap {
            got: aligned.nrows(),
            min: config.min_overlap,
        })?;

    let repaired = ensure_positive_semidefinite(&mut matrix, config);
    Ok(CorrelationOutcome { matrix, repaired })
}

/// Repair a numerically indefinite symmetric matrix in place.
///
/// Eigenvalues below the negated tolerance trigger a small diagonal jitter.
/// This handles rounding-level indefiniteness only; it is logged as a
/// warning and reported to the caller, never raised as an error.
pub fn ensure_positive_semidefinite(matrix: &mut Array2<f64>, config: &SimulationConfig) -> bool {
    let eigenvalues = symmetric_eigenvalues(matrix);
    let min_eigenvalue = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);

    if min_eigenvalue >= -config.psd_tolerance {
        return false;
    }

    warn!(
        min_eigenvalue,
        jitter = config.psd_diagonal_jitter,
        "correlation matrix is not positive semidefinite, repairing diagonal"
    );
    for i in 0..matrix.nrows() {
        matrix[[i, i]] += config.psd_diagonal_jitter;
    }
    true
}

/// Lower-triangular Cholesky factor `L` with `L * L^T = matrix`.
///
/// A non-positive pivot here means the caller skipped the repair step or the
/// repair was insufficient; that is a logic error and propagates.
pub fn cholesky(matrix: &Array2<f64>) -> Result<Array2<f64>, ScenarioError> {
    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(ScenarioError::Decomposition(format!(
            "matrix is {}x{}, expected square",
            matrix.nrows(),
            matrix.ncols()
        )));
    }

    let mut factor = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += factor[[i, k]] * factor[[j, k]];
            }

            if i == j {
                let pivot = matrix[[i, i]] - sum;
                if pivot <= 0.0 {
                    return Err(ScenarioError::Decomposition(format!(
                        "non-positive pivot {pivot:.3e} at row {i}"
                    )));
                }
                factor[[i, j]] = pivot.sqrt();
            } else {
                factor[[i, j]] = (matrix[[i, j]] - sum) / factor[[j, j]];
            }
        }
    }

    Ok(factor)
}

/// Eigenvalues of a symmetric matrix via cyclic Jacobi rotations
pub fn symmetric_eigenvalues(matrix: &Array2<f64>) -> Vec<f64> {
    let n = matrix.nrows();
    let mut a = matrix.clone();

    for _sweep in 0..100 {
        let mut off_diagonal = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off_diagonal += a[[i, j]] * a[[i, j]];
            }
        }
        if off_diagonal.sqrt() < 1e-12 {
            break;
        }

        for p in 0..n.saturating_sub(1) {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < 1e-300 {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
            }
        }
    }

    (0..n).map(|i| a[[i, i]]).collect()
}

/// Sample correlated per-asset log returns.
///
/// Independent standard normals `Z` of shape `(num_paths, horizon, n_assets)`
/// are transformed by the Cholesky factor as one batched contraction
/// (`X = Z * L^T` over the flattened leading axes), then scaled by the
/// per-asset standard deviation and shifted by the per-asset adjusted mean.
pub fn sample_correlated_returns(
    adjusted_means: &Array1<f64>,
    std_devs: &Array1<f64>,
    factor: &Array2<f64>,
    horizon: usize,
    num_paths: usize,
    rng: &mut StdRng,
) -> Array3<f64> {
    let n_assets = adjusted_means.len();
    let std_normal = Normal::new(0.0, 1.0).expect("unit normal");

    let draws: Vec<f64> = (0..num_paths * horizon * n_assets)
        .map(|_| std_normal.sample(rng))
        .collect();
    let noise = Array2::from_shape_vec((num_paths * horizon, n_assets), draws)
        .expect("draw count matches (num_paths * horizon, n_assets)");

    // Row-wise x = L * z is the matrix product Z * L^T over all (path, day) rows
    let correlated = noise.dot(&factor.t());

    let scaled = &correlated * &std_devs.view().insert_axis(Axis(0))
        + &adjusted_means.view().insert_axis(Axis(0));

    scaled
        .into_shape((num_paths, horizon, n_assets))
        .expect("flattened layout reshapes to (num_paths, horizon, n_assets)")
}
