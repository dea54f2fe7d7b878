//! Error types for design synthesis.

use bk_core::CoreError;
use thiserror::Error;

/// Errors raised while validating a design or sizing its components.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DesignError {
    #[error(
        "Infeasible design: input voltage {input_voltage} V must exceed switch drop plus output voltage ({required} V)"
    )]
    InfeasibleDesign { input_voltage: f64, required: f64 },

    #[error("Invalid parameter: {what} = {value}")]
    InvalidParameter { what: &'static str, value: f64 },
}

pub type DesignResult<T> = Result<T, DesignError>;

impl From<CoreError> for DesignError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NonFinite { what, value } | CoreError::NonPositive { what, value } => {
                DesignError::InvalidParameter { what, value }
            }
        }
    }
}
