//! Shared application service layer for the buck converter engine.
//!
//! Owns the recompute cycle (synthesize, simulate, analyze) behind a
//! caller-held [`SimulationContext`], project file conversion, and the
//! parallel method comparison used by the CLI.

pub mod compare;
pub mod context;
pub mod error;
pub mod project_service;
pub mod summary;

// Re-export key types for convenience
pub use compare::{Deviation, MethodRun, compare_methods, deviations_from};
pub use context::{
    ParameterSource, RecomputeResults, SimulationContext, SimulationInputs, recompute,
};
pub use error::{AppError, AppResult, ErrorKind};
pub use project_service::{inputs_from_project, load_project, project_from_inputs, save_project};
pub use summary::{MeasuredRipple, RunSummary};
