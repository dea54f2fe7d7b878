//! Transient simulation of a switched buck converter.
//!
//! Provides:
//! - `TransientModel` for piecewise-smooth systems with discrete modes
//! - Fixed-step forward Euler and adaptive Dormand–Prince, BDF2 and Radau IIA
//!   back-ends sharing one sampling grid
//! - `BuckModel` state equations and PWM switch classification
//! - Element waveform reconstruction and settling diagnostics

pub mod buck;
pub mod error;
pub mod grid;
pub mod implicit;
pub mod integrator;
pub mod model;
pub mod settling;
pub mod sim;
pub mod switching;
pub mod trajectory;
pub mod waveforms;

// Internal modules
mod jacobian;
mod newton;

// Re-exports for public API
pub use buck::BuckModel;
pub use error::{SimError, SimResult};
pub use grid::TimeGrid;
pub use implicit::{Bdf2, RadauIIA};
pub use integrator::{AdaptiveStepper, Dopri5, ForwardEuler, Integrator, StepAttempt};
pub use model::{Segment, TransientModel};
pub use newton::NewtonConfig;
pub use settling::{
    DEFAULT_SETTLING_BAND, SettlingEstimates, SettlingReport, settling_report, settling_time,
};
pub use sim::{
    IntegrationMethod, STEPS_PER_SAMPLE, STEPS_PER_SEGMENT, SimOptions, SimRecord, SimStats, run_sim,
};
pub use switching::{SwitchSchedule, SwitchSegments, SwitchState, classify};
pub use trajectory::{SimulationState, Trajectory, simulate_converter};
pub use waveforms::{ElementSample, ElementWaveforms, element_sample, reconstruct};
