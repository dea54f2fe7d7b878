//! TransientModel trait for piecewise-smooth dynamic systems.

use crate::error::SimResult;
use crate::jacobian::finite_difference_jacobian;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

/// Interval `[start, end)` on which a model's dynamic mode is constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment<M> {
    pub start: f64,
    pub end: f64,
    pub mode: M,
}

impl<M> Segment<M> {
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Trait for transient (dynamic) system models with discrete modes.
///
/// A TransientModel must implement:
/// - Initial state
/// - Mode lookup: which right-hand side applies at time t
/// - RHS computation within a mode: x_dot = f_mode(x)
///
/// The right-hand side may jump between modes. Fixed-step integrators look up
/// the mode at the start of every step; adaptive integrators walk the
/// [`TransientModel::segments`] so that no step crosses a mode change.
pub trait TransientModel {
    /// Discrete mode selecting the active right-hand side.
    type Mode: Copy + PartialEq + Debug;

    /// Return the initial state at t=0.
    fn initial_state(&self) -> DVector<f64>;

    /// Mode active at time `t`.
    fn mode_at(&self, t: f64) -> Self::Mode;

    /// Cover `[0, t_end)` with constant-mode segments, in time order.
    ///
    /// Default: a single segment in the mode active at t=0.
    fn segments(&self, t_end: f64) -> impl Iterator<Item = Segment<Self::Mode>> {
        std::iter::once(Segment {
            start: 0.0,
            end: t_end,
            mode: self.mode_at(0.0),
        })
    }

    /// Compute state derivative dxdt = f_mode(x).
    fn rhs(&self, mode: Self::Mode, x: &DVector<f64>) -> SimResult<DVector<f64>>;

    /// Jacobian of [`TransientModel::rhs`] with respect to `x`.
    ///
    /// Default: forward finite differences.
    fn jacobian(&self, mode: Self::Mode, x: &DVector<f64>) -> SimResult<DMatrix<f64>> {
        finite_difference_jacobian(x, |y| self.rhs(mode, y), 1e-7)
    }
}
