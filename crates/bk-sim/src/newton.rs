//! Simplified Newton iteration for implicit integration stages.

use crate::error::{SimError, SimResult};
use nalgebra::linalg::LU;
use nalgebra::{DVector, Dyn};

/// Newton solver configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Convergence threshold on the weighted RMS norm of the update
    pub tol: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tol: 1e-3,
        }
    }
}

/// Newton iteration result.
#[derive(Clone, Debug)]
pub struct NewtonResult {
    /// Solution vector
    pub z: DVector<f64>,
    /// Number of iterations
    pub iterations: usize,
}

/// Weighted RMS norm `sqrt(mean((v_i / w_i)^2))`.
pub fn weighted_rms(v: &DVector<f64>, weights: &DVector<f64>) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v
        .iter()
        .zip(weights.iter())
        .map(|(vi, wi)| (vi / wi).powi(2))
        .sum();
    (sum / v.len() as f64).sqrt()
}

/// Solve `G(z) = 0` with a frozen, factorized iteration matrix.
///
/// Each iteration solves `M dz = -G(z)`, where `lu` is the LU factorization
/// of `M ≈ dG/dz`. Converges when the weighted norm of `dz` drops below
/// `config.tol`. The matrix is not refreshed between iterations.
pub fn newton_solve<G>(
    z0: DVector<f64>,
    residual_fn: G,
    lu: &LU<f64, Dyn, Dyn>,
    weights: &DVector<f64>,
    config: &NewtonConfig,
) -> SimResult<NewtonResult>
where
    G: Fn(&DVector<f64>) -> SimResult<DVector<f64>>,
{
    let mut z = z0;

    for iter in 0..config.max_iterations {
        let r = residual_fn(&z)?;

        let dz = lu.solve(&(-r)).ok_or_else(|| SimError::ConvergenceFailed {
            what: "singular iteration matrix".to_string(),
        })?;
        z += &dz;

        if !z.iter().all(|v| v.is_finite()) {
            return Err(SimError::ConvergenceFailed {
                what: format!("non-finite Newton iterate at iteration {}", iter),
            });
        }

        if weighted_rms(&dz, weights) <= config.tol {
            return Ok(NewtonResult {
                z,
                iterations: iter + 1,
            });
        }
    }

    Err(SimError::ConvergenceFailed {
        what: format!(
            "Newton did not converge within {} iterations",
            config.max_iterations
        ),
    })
}
