//! Implicit adaptive integrators for stiff systems.

use crate::error::SimResult;
use crate::integrator::{AdaptiveStepper, StepAttempt, error_weights};
use crate::model::TransientModel;
use crate::newton::{NewtonConfig, newton_solve, weighted_rms};
use bk_core::Tolerances;
use nalgebra::{DMatrix, DVector};

/// Variable-step BDF2, started with backward Euler.
///
/// History is cleared on [`AdaptiveStepper::reset`], so after every mode
/// boundary the first step is a backward Euler step. The error estimate is the
/// difference between the BDF2 and backward Euler solutions of the same step.
#[derive(Clone, Debug)]
pub struct Bdf2 {
    newton: NewtonConfig,
    /// State and step size of the previous accepted step
    history: Option<(DVector<f64>, f64)>,
}

impl Bdf2 {
    pub fn new(newton: NewtonConfig) -> Self {
        Self {
            newton,
            history: None,
        }
    }
}

impl AdaptiveStepper for Bdf2 {
    fn error_order(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.history = None;
    }

    fn attempt<M: TransientModel>(
        &mut self,
        model: &M,
        mode: M::Mode,
        x: &DVector<f64>,
        h: f64,
        tol: Tolerances,
    ) -> SimResult<StepAttempt> {
        let n = x.len();
        let jac = model.jacobian(mode, x)?;
        let eye = DMatrix::<f64>::identity(n, n);
        let weights = error_weights(x, x, tol);

        // Backward Euler: z - x - h f(z) = 0
        let be_lu = (&eye - &jac * h).lu();
        let x_be = newton_solve(
            x.clone(),
            |z| Ok(z - x - model.rhs(mode, z)? * h),
            &be_lu,
            &weights,
            &self.newton,
        )?
        .z;

        let Some((x_prev, h_prev)) = &self.history else {
            // Startup: local error of backward Euler ~ h/2 * (f(x1) - f(x0))
            let f0 = model.rhs(mode, x)?;
            let f1 = model.rhs(mode, &x_be)?;
            let err = (f1 - f0) * (0.5 * h);
            let error = weighted_rms(&err, &error_weights(x, &x_be, tol));
            return Ok(StepAttempt {
                x_new: x_be,
                error,
            });
        };

        // x_{n+1} - a1 x_n + a2 x_{n-1} = beta h f(x_{n+1}), omega = h / h_prev
        let omega = h / h_prev;
        let denom = 1.0 + 2.0 * omega;
        let beta = (1.0 + omega) / denom;
        let a1 = (1.0 + omega).powi(2) / denom;
        let a2 = omega * omega / denom;

        let base = x * a1 - x_prev * a2;
        let lu = (&eye - &jac * (beta * h)).lu();
        let x_new = newton_solve(
            x_be.clone(),
            |z| Ok(z - &base - model.rhs(mode, z)? * (beta * h)),
            &lu,
            &weights,
            &self.newton,
        )?
        .z;

        let error = weighted_rms(&(&x_new - &x_be), &error_weights(x, &x_new, tol));
        Ok(StepAttempt { x_new, error })
    }

    fn accept(&mut self, x_old: &DVector<f64>, h: f64) {
        self.history = Some((x_old.clone(), h));
    }
}

// Two-stage Radau IIA coefficients (c = 1/3, 1).
const RADAU_A: [[f64; 2]; 2] = [[5.0 / 12.0, -1.0 / 12.0], [3.0 / 4.0, 1.0 / 4.0]];

/// Two-stage Radau IIA (order 3, L-stable), error by step doubling.
///
/// Each attempt takes one step of size `h` and two of size `h/2`; the two-step
/// result is kept and `(x_half - x_full) / 7` is the error estimate.
#[derive(Clone, Debug)]
pub struct RadauIIA {
    newton: NewtonConfig,
}

impl RadauIIA {
    pub fn new(newton: NewtonConfig) -> Self {
        Self { newton }
    }

    /// One Radau IIA step with a frozen Jacobian `jac`.
    fn step<M: TransientModel>(
        &self,
        model: &M,
        mode: M::Mode,
        x: &DVector<f64>,
        h: f64,
        jac: &DMatrix<f64>,
        weights: &DVector<f64>,
    ) -> SimResult<DVector<f64>> {
        let n = x.len();

        // Iteration matrix I - h (A ⊗ J)
        let mut iter = DMatrix::<f64>::identity(2 * n, 2 * n);
        for (i, row) in RADAU_A.iter().enumerate() {
            for (j, a_ij) in row.iter().enumerate() {
                let mut block = iter.view_mut((i * n, j * n), (n, n));
                block -= jac * (h * a_ij);
            }
        }
        let lu = iter.lu();

        let stage_weights = DVector::from_fn(2 * n, |k, _| weights[k % n]);

        // Stage increments Z = (Z1, Z2): Z_i = h * sum_j a_ij f(x + Z_j)
        let residual = |z: &DVector<f64>| -> SimResult<DVector<f64>> {
            let z1 = z.rows(0, n).into_owned();
            let z2 = z.rows(n, n).into_owned();
            let f1 = model.rhs(mode, &(x + &z1))?;
            let f2 = model.rhs(mode, &(x + &z2))?;
            let mut r = z.clone();
            for (i, row) in RADAU_A.iter().enumerate() {
                let combo = (&f1 * row[0] + &f2 * row[1]) * h;
                let mut part = r.rows_mut(i * n, n);
                part -= combo;
            }
            Ok(r)
        };

        let z = newton_solve(
            DVector::zeros(2 * n),
            residual,
            &lu,
            &stage_weights,
            &self.newton,
        )?
        .z;

        // Stiffly accurate: the last stage is the step result.
        Ok(x + z.rows(n, n))
    }
}

impl AdaptiveStepper for RadauIIA {
    fn error_order(&self) -> usize {
        3
    }

    fn reset(&mut self) {}

    fn attempt<M: TransientModel>(
        &mut self,
        model: &M,
        mode: M::Mode,
        x: &DVector<f64>,
        h: f64,
        tol: Tolerances,
    ) -> SimResult<StepAttempt> {
        let jac = model.jacobian(mode, x)?;
        let weights = error_weights(x, x, tol);

        let x_full = self.step(model, mode, x, h, &jac, &weights)?;
        let x_mid = self.step(model, mode, x, 0.5 * h, &jac, &weights)?;
        let x_half = self.step(model, mode, &x_mid, 0.5 * h, &jac, &weights)?;

        // Richardson: order 3 -> 2^3 - 1
        let err = (&x_half - &x_full) / 7.0;
        let error = weighted_rms(&err, &error_weights(x, &x_half, tol));
        Ok(StepAttempt {
            x_new: x_half,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stiff linear pair: fast decay into a slow manifold.
    /// x0' = -1000 (x0 - x1), x1' = -x1
    struct StiffPair;

    impl TransientModel for StiffPair {
        type Mode = ();

        fn initial_state(&self) -> DVector<f64> {
            DVector::from_vec(vec![0.0, 1.0])
        }

        fn mode_at(&self, _t: f64) -> Self::Mode {}

        fn rhs(&self, _mode: (), x: &DVector<f64>) -> SimResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![-1000.0 * (x[0] - x[1]), -x[1]]))
        }
    }

    fn tol() -> Tolerances {
        Tolerances {
            abs: 1e-6,
            rel: 1e-6,
        }
    }

    #[test]
    fn backward_euler_start_is_stable_for_large_steps() {
        let model = StiffPair;
        let mut bdf = Bdf2::new(NewtonConfig::default());
        let x = model.initial_state();
        // h * 1000 = 100: explicit methods would blow up here.
        let attempt = bdf.attempt(&model, (), &x, 0.1, tol()).unwrap();
        assert!(attempt.x_new.iter().all(|v| v.is_finite()));
        assert!(attempt.x_new[0] > 0.0 && attempt.x_new[0] <= 1.0);
        assert!(attempt.x_new[1] > 0.85 && attempt.x_new[1] < 1.0);
    }

    #[test]
    fn bdf2_uses_history_after_accept() {
        let model = StiffPair;
        let mut bdf = Bdf2::new(NewtonConfig::default());
        let x0 = model.initial_state();
        let h = 1e-3;
        let first = bdf.attempt(&model, (), &x0, h, tol()).unwrap();
        bdf.accept(&x0, h);
        let second = bdf.attempt(&model, (), &first.x_new, h, tol()).unwrap();

        // Slow component follows exp(-t) closely.
        assert!((second.x_new[1] - (-2.0 * h).exp()).abs() < 1e-5);

        bdf.reset();
        assert!(bdf.history.is_none());
    }

    #[test]
    fn radau_matches_slow_manifold() {
        let model = StiffPair;
        let mut radau = RadauIIA::new(NewtonConfig::default());
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let h = 0.05;
        let attempt = radau.attempt(&model, (), &x, h, tol()).unwrap();
        let slow = (-h).exp();
        assert!((attempt.x_new[1] - slow).abs() < 1e-6);
        // Fast component is pinned to the slow one (x0 ≈ x1 + x1/1000).
        assert!((attempt.x_new[0] - attempt.x_new[1]).abs() < 2e-3);
    }

    #[test]
    fn radau_error_estimate_shrinks_with_step() {
        let model = StiffPair;
        let mut radau = RadauIIA::new(NewtonConfig::default());
        // Start on the slow manifold so only the smooth component contributes.
        let x = DVector::from_vec(vec![1000.0 / 999.0, 1.0]);
        let big = radau.attempt(&model, (), &x, 0.2, tol()).unwrap();
        let small = radau.attempt(&model, (), &x, 0.02, tol()).unwrap();
        assert!(small.error < big.error);
    }
}
