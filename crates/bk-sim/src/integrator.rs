//! Time integrators: fixed-step explicit and adaptive embedded schemes.

use crate::error::SimResult;
use crate::model::TransientModel;
use crate::newton::weighted_rms;
use bk_core::Tolerances;
use nalgebra::DVector;

/// Trait for fixed-step time integrators.
pub trait Integrator {
    /// Advance state by one time step in the given mode.
    fn step<M: TransientModel>(
        &self,
        model: &M,
        mode: M::Mode,
        x: &DVector<f64>,
        dt: f64,
    ) -> SimResult<DVector<f64>>;
}

/// Forward Euler (explicit, 1st order).
/// Calls rhs() once per step.
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &M,
        mode: M::Mode,
        x: &DVector<f64>,
        dt: f64,
    ) -> SimResult<DVector<f64>> {
        let xdot = model.rhs(mode, x)?;
        Ok(x + xdot * dt)
    }
}

/// Outcome of one trial step of an adaptive integrator.
#[derive(Clone, Debug)]
pub struct StepAttempt {
    /// Proposed state at `t + h`
    pub x_new: DVector<f64>,
    /// Weighted RMS local error estimate; the step is acceptable when <= 1
    pub error: f64,
}

/// Per-component error scale `abs + rel * max(|a_i|, |b_i|)`.
pub fn error_weights(a: &DVector<f64>, b: &DVector<f64>, tol: Tolerances) -> DVector<f64> {
    a.zip_map(b, |ai, bi| tol.abs + tol.rel * ai.abs().max(bi.abs()))
}

/// Trait for integrators with local error control.
///
/// The driver calls [`AdaptiveStepper::attempt`] until a step is accepted,
/// then [`AdaptiveStepper::accept`]. [`AdaptiveStepper::reset`] is called at
/// every mode boundary so multistep history never spans a discontinuity.
pub trait AdaptiveStepper {
    /// Order `q` of the error estimate; the controller scales steps by `err^(-1/(q+1))`.
    fn error_order(&self) -> usize;

    /// Forget any history carried between steps.
    fn reset(&mut self);

    /// Try a step of size `h` from `x`.
    fn attempt<M: TransientModel>(
        &mut self,
        model: &M,
        mode: M::Mode,
        x: &DVector<f64>,
        h: f64,
        tol: Tolerances,
    ) -> SimResult<StepAttempt>;

    /// Record that the last attempt from `x_old` with size `h` was accepted.
    fn accept(&mut self, _x_old: &DVector<f64>, _h: f64) {}
}

// Dormand–Prince 5(4) tableau.
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;
// Difference between the 5th and embedded 4th order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Adaptive Dormand–Prince 5(4) Runge–Kutta method.
///
/// Explicit embedded pair: advances with the 5th order solution and uses the
/// difference to the 4th order one as the local error estimate.
#[derive(Clone, Debug, Default)]
pub struct Dopri5;

impl AdaptiveStepper for Dopri5 {
    fn error_order(&self) -> usize {
        4
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
        let k1 = model.rhs(mode, x)?;
        let k2 = model.rhs(mode, &(x + &k1 * (h * A21)))?;
        let k3 = model.rhs(mode, &(x + (&k1 * A31 + &k2 * A32) * h))?;
        let k4 = model.rhs(mode, &(x + (&k1 * A41 + &k2 * A42 + &k3 * A43) * h))?;
        let k5 = model.rhs(
            mode,
            &(x + (&k1 * A51 + &k2 * A52 + &k3 * A53 + &k4 * A54) * h),
        )?;
        let k6 = model.rhs(
            mode,
            &(x + (&k1 * A61 + &k2 * A62 + &k3 * A63 + &k4 * A64 + &k5 * A65) * h),
        )?;

        let x_new = x + (&k1 * B1 + &k3 * B3 + &k4 * B4 + &k5 * B5 + &k6 * B6) * h;
        let k7 = model.rhs(mode, &x_new)?;

        let err = (&k1 * E1 + &k3 * E3 + &k4 * E4 + &k5 * E5 + &k6 * E6 + &k7 * E7) * h;
        let error = weighted_rms(&err, &error_weights(x, &x_new, tol));

        Ok(StepAttempt { x_new, error })
    }
}
