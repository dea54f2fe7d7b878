//! Error types for the bk-app service layer.

use std::path::PathBuf;

use bk_design::DesignError;
use bk_sim::SimError;

/// Application error type shared by every frontend.
///
/// Engine failures collapse into three kinds: an unreachable design target,
/// a rejected input, and a numerical breakdown of the integrator.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Infeasible design: {0}")]
    InfeasibleDesign(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Simulation diverged: {0}")]
    SimulationDivergence(String),

    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to write {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bk-app operations.
pub type AppResult<T> = Result<T, AppError>;

/// Coarse classification of [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InfeasibleDesign,
    InvalidParameter,
    SimulationDivergence,
    Io,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InfeasibleDesign(_) => ErrorKind::InfeasibleDesign,
            AppError::InvalidParameter(_) | AppError::Project(_) => ErrorKind::InvalidParameter,
            AppError::SimulationDivergence(_) => ErrorKind::SimulationDivergence,
            AppError::FileWrite { .. } | AppError::Io(_) => ErrorKind::Io,
        }
    }
}

// Conversions from backend error types
impl From<DesignError> for AppError {
    fn from(err: DesignError) -> Self {
        match err {
            DesignError::InfeasibleDesign { .. } => AppError::InfeasibleDesign(err.to_string()),
            DesignError::InvalidParameter { .. } => AppError::InvalidParameter(err.to_string()),
        }
    }
}

impl From<SimError> for AppError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::Design(e) => e.into(),
            e if e.is_divergence() => AppError::SimulationDivergence(e.to_string()),
            e => AppError::InvalidParameter(e.to_string()),
        }
    }
}

impl From<bk_project::ProjectError> for AppError {
    fn from(err: bk_project::ProjectError) -> Self {
        match err {
            bk_project::ProjectError::Io(e) => AppError::Io(e),
            e => AppError::Project(e.to_string()),
        }
    }
}
