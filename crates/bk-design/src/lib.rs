//! Component sizing for a step-down (buck) converter.
//!
//! Provides:
//! - `DesignSpec`: target electrical requirements with lab defaults
//! - `synthesize`: inverse design equations producing `DerivedParameters`
//! - `check_ripples`: expected ripple and LC cutoff diagnostics

pub mod error;
pub mod ripple;
pub mod spec;
pub mod synth;

pub use error::{DesignError, DesignResult};
pub use ripple::{RippleReport, check_ripples};
pub use spec::{DesignSpec, OutputBounds};
pub use synth::{ComponentQuantities, DerivedParameters, synthesize};
