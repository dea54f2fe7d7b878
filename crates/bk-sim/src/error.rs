//! Error types for simulation operations.

use bk_design::DesignError;
use thiserror::Error;

/// Errors encountered during transient simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid converter parameters: {0}")]
    Design(#[from] DesignError),

    #[error("Sample limit exceeded: {requested} samples requested, at most {max} allowed")]
    SampleLimit { requested: usize, max: usize },

    #[error("Non-finite {what} at t = {t} s")]
    NonFinite { what: &'static str, t: f64 },

    #[error("Step size underflow at t = {t} s (h = {h} s)")]
    StepSizeUnderflow { t: f64, h: f64 },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// True for failures of the numerical integration itself, as opposed to
    /// rejected inputs.
    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            SimError::NonFinite { .. }
                | SimError::StepSizeUnderflow { .. }
                | SimError::ConvergenceFailed { .. }
        )
    }
}
