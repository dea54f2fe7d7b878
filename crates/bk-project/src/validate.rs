//! Project validation logic.

use crate::schema::{ComponentsDef, Project, SimulationDef};
use bk_design::{DesignError, DesignSpec};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Infeasible design: {reason}")]
    Infeasible { reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    if project.name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: format!("{:?}", project.name),
            reason: "must not be empty".to_string(),
        });
    }

    let spec = DesignSpec::from(&project.design);
    match &project.components {
        // Manual values bypass synthesis, so only the field checks apply.
        Some(components) => {
            spec.validate_fields().map_err(|e| design_error("design", e))?;
            validate_components(components)?;
        }
        None => spec.validate().map_err(|e| design_error("design", e))?,
    }

    validate_simulation(&project.simulation)
}

fn design_error(context: &str, e: DesignError) -> ValidationError {
    match e {
        DesignError::InvalidParameter { what, value } => ValidationError::InvalidValue {
            field: format!("{} {}", context, what),
            value: value.to_string(),
            reason: "out of range".to_string(),
        },
        e @ DesignError::InfeasibleDesign { .. } => ValidationError::Infeasible {
            reason: e.to_string(),
        },
    }
}

fn validate_components(components: &ComponentsDef) -> Result<(), ValidationError> {
    components
        .to_parameters()
        .map(|_| ())
        .map_err(|e| design_error("components", e))
}

fn validate_simulation(sim: &SimulationDef) -> Result<(), ValidationError> {
    validate_positive_finite("duration_s", sim.duration_s)?;
    validate_positive_finite("atol", sim.atol)?;
    validate_non_negative_finite("rtol", sim.rtol)?;
    validate_positive_finite("settling_band", sim.settling_band)?;

    if sim.samples_per_period == 0 {
        return Err(ValidationError::InvalidValue {
            field: "simulation samples_per_period".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if sim.max_steps == Some(0) {
        return Err(ValidationError::InvalidValue {
            field: "simulation max_steps".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if sim.settling_band >= 1.0 {
        return Err(ValidationError::InvalidValue {
            field: "simulation settling_band".to_string(),
            value: sim.settling_band.to_string(),
            reason: "must be below 1".to_string(),
        });
    }
    Ok(())
}

fn validate_positive_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("simulation {}", field),
            value: value.to_string(),
            reason: "must be positive and finite".to_string(),
        });
    }
    Ok(())
}

fn validate_non_negative_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("simulation {}", field),
            value: value.to_string(),
            reason: "must be non-negative and finite".to_string(),
        });
    }
    Ok(())
}
