//! Project loading, saving, and conversion to simulation inputs.

use std::path::Path;

use bk_design::DesignSpec;
use bk_project::schema::{ComponentsDef, DesignDef, Project, SimulationDef};

use crate::context::{ParameterSource, SimulationInputs};
use crate::error::AppResult;

/// Load a project file (YAML or JSON by extension), migrated and validated.
pub fn load_project(path: &Path) -> AppResult<Project> {
    Ok(bk_project::load(path)?)
}

/// Validate and save a project file (YAML or JSON by extension).
pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    bk_project::save(path, project)?;
    Ok(())
}

/// Simulation inputs described by `project`.
pub fn inputs_from_project(project: &Project) -> AppResult<SimulationInputs> {
    let source = match &project.components {
        Some(components) => ParameterSource::Manual(components.to_parameters()?),
        None => ParameterSource::Synthesized,
    };

    Ok(SimulationInputs {
        spec: DesignSpec::from(&project.design),
        source,
        method: project.simulation.method,
        duration: project.simulation.duration_s,
        options: project.simulation.sim_options(),
        settling_band: project.simulation.settling_band,
    })
}

/// Project file capturing `inputs`.
pub fn project_from_inputs(name: &str, inputs: &SimulationInputs) -> Project {
    let components = match &inputs.source {
        ParameterSource::Manual(params) => Some(ComponentsDef::from(params)),
        ParameterSource::Synthesized => None,
    };

    Project {
        design: DesignDef::from(&inputs.spec),
        simulation: SimulationDef {
            duration_s: inputs.duration,
            method: inputs.method,
            samples_per_period: inputs.options.samples_per_period,
            rtol: inputs.options.tolerances.rel,
            atol: inputs.options.tolerances.abs,
            settling_band: inputs.settling_band,
            max_steps: inputs.options.max_steps,
        },
        components,
        ..Project::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_design::DerivedParameters;
    use bk_sim::IntegrationMethod;
    use proptest::prelude::*;

    #[test]
    fn default_project_matches_default_inputs() {
        let inputs = inputs_from_project(&Project::new("buck")).unwrap();
        assert_eq!(inputs, SimulationInputs::default());
    }

    #[test]
    fn inputs_survive_project_conversion() {
        let inputs = SimulationInputs {
            method: IntegrationMethod::Bdf,
            duration: 1e-3,
            source: ParameterSource::Manual(
                DerivedParameters::manual(6e-5, 4e-5, 10.0, 2e-3, 1e-4).unwrap(),
            ),
            ..SimulationInputs::default()
        };
        let project = project_from_inputs("manual", &inputs);
        let back = inputs_from_project(&project).unwrap();
        assert_eq!(back.method, inputs.method);
        assert_eq!(back.duration, inputs.duration);
        assert_eq!(back.spec, inputs.spec);
        match (back.source, inputs.source) {
            (ParameterSource::Manual(a), ParameterSource::Manual(b)) => {
                assert_eq!(a.inductance, b.inductance);
                assert!((a.period - b.period).abs() < 1e-18);
            }
            other => panic!("unexpected sources: {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn simulation_settings_survive_project_conversion(
            method_idx in 0_usize..4,
            duration in 1e-5_f64..1e-1,
            spp in 10_usize..5_000,
            band in 0.001_f64..0.2,
            input_voltage in 12.0_f64..48.0,
            max_steps in proptest::option::of(1_usize..1_000_000),
        ) {
            let mut inputs = SimulationInputs {
                method: IntegrationMethod::ALL[method_idx],
                duration,
                settling_band: band,
                ..SimulationInputs::default()
            };
            inputs.options.samples_per_period = spp;
            inputs.options.max_steps = max_steps;
            inputs.spec.input_voltage = input_voltage;

            let back = inputs_from_project(&project_from_inputs("prop", &inputs)).unwrap();
            prop_assert_eq!(back, inputs);
        }
    }
}
