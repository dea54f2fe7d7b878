//! Caller-owned simulation context with atomic recompute.

use bk_design::{
    DerivedParameters, DesignSpec, OutputBounds, RippleReport, check_ripples, synthesize,
};
use bk_sim::{
    DEFAULT_SETTLING_BAND, IntegrationMethod, SettlingReport, SimOptions, Trajectory,
    settling_report, simulate_converter,
};

use crate::error::{AppError, AppResult};

/// Where the component values of a recompute come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterSource {
    /// Sized from the design spec on every recompute
    Synthesized,
    /// Hand-entered values used as-is
    Manual(DerivedParameters),
}

/// Everything a recompute depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInputs {
    pub spec: DesignSpec,
    pub source: ParameterSource,
    pub method: IntegrationMethod,
    /// Simulated time span (s)
    pub duration: f64,
    pub options: SimOptions,
    /// Settling band as a fraction of the output voltage
    pub settling_band: f64,
}

impl Default for SimulationInputs {
    fn default() -> Self {
        Self {
            spec: DesignSpec::default(),
            source: ParameterSource::Synthesized,
            method: IntegrationMethod::default(),
            duration: 0.005,
            options: SimOptions::default(),
            settling_band: DEFAULT_SETTLING_BAND,
        }
    }
}

/// Outputs of one successful recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeResults {
    pub parameters: DerivedParameters,
    pub ripple: RippleReport,
    pub bounds: OutputBounds,
    pub trajectory: Trajectory,
    pub settling: SettlingReport,
}

/// Synthesize (unless manual), simulate and analyze `inputs`.
///
/// Pure: nothing is retained between calls.
pub fn recompute(inputs: &SimulationInputs) -> AppResult<RecomputeResults> {
    let _span = tracing::info_span!(
        "recompute",
        method = %inputs.method,
        duration = inputs.duration
    )
    .entered();

    if !inputs.settling_band.is_finite()
        || inputs.settling_band <= 0.0
        || inputs.settling_band >= 1.0
    {
        return Err(AppError::InvalidParameter(format!(
            "settling band must be in (0, 1), got {}",
            inputs.settling_band
        )));
    }

    let parameters = match inputs.source {
        ParameterSource::Synthesized => synthesize(&inputs.spec)?,
        ParameterSource::Manual(params) => {
            inputs.spec.validate_fields()?;
            params.validate()?;
            params
        }
    };

    let trajectory = simulate_converter(
        &inputs.spec,
        &parameters,
        inputs.duration,
        inputs.method,
        &inputs.options,
    )?;

    let ripple = check_ripples(&inputs.spec, &parameters);
    let settling = settling_report(
        &trajectory,
        inputs.spec.output_voltage,
        &parameters,
        inputs.settling_band,
    );

    tracing::debug!(
        samples = trajectory.len(),
        accepted = trajectory.stats.accepted_steps,
        rejected = trajectory.stats.rejected_steps,
        "recompute finished"
    );

    Ok(RecomputeResults {
        parameters,
        ripple,
        bounds: inputs.spec.output_bounds(),
        trajectory,
        settling,
    })
}

/// Simulation state owned by one caller.
///
/// Every edit goes through a full recompute. Inputs and results change
/// together: if the recompute fails, the edit is discarded and the previous
/// results stay available.
#[derive(Debug, Clone, Default)]
pub struct SimulationContext {
    inputs: SimulationInputs,
    results: Option<RecomputeResults>,
}

impl SimulationContext {
    /// Context with the given inputs and no results yet.
    pub fn new(inputs: SimulationInputs) -> Self {
        Self {
            inputs,
            results: None,
        }
    }

    pub fn inputs(&self) -> &SimulationInputs {
        &self.inputs
    }

    pub fn spec(&self) -> &DesignSpec {
        &self.inputs.spec
    }

    pub fn method(&self) -> IntegrationMethod {
        self.inputs.method
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.inputs.source, ParameterSource::Manual(_))
    }

    /// Results of the last successful recompute.
    pub fn results(&self) -> Option<&RecomputeResults> {
        self.results.as_ref()
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.results.as_ref().map(|r| &r.trajectory)
    }

    /// Recompute with the current inputs.
    pub fn recompute(&mut self) -> AppResult<&RecomputeResults> {
        let inputs = self.inputs.clone();
        self.commit(inputs)
    }

    /// Apply `edit` to a copy of the inputs and recompute.
    pub fn update(
        &mut self,
        edit: impl FnOnce(&mut SimulationInputs),
    ) -> AppResult<&RecomputeResults> {
        let mut inputs = self.inputs.clone();
        edit(&mut inputs);
        self.commit(inputs)
    }

    pub fn set_spec(&mut self, spec: DesignSpec) -> AppResult<&RecomputeResults> {
        self.update(|i| i.spec = spec)
    }

    pub fn set_method(&mut self, method: IntegrationMethod) -> AppResult<&RecomputeResults> {
        self.update(|i| i.method = method)
    }

    pub fn set_duration(&mut self, duration: f64) -> AppResult<&RecomputeResults> {
        self.update(|i| i.duration = duration)
    }

    /// Switch to hand-entered component values.
    pub fn set_manual_parameters(
        &mut self,
        params: DerivedParameters,
    ) -> AppResult<&RecomputeResults> {
        self.update(|i| i.source = ParameterSource::Manual(params))
    }

    /// Return to sizing the components from the spec.
    pub fn use_synthesized_parameters(&mut self) -> AppResult<&RecomputeResults> {
        self.update(|i| i.source = ParameterSource::Synthesized)
    }

    /// Default spec with synthesized components; method, duration and
    /// options are kept.
    pub fn restore_defaults(&mut self) -> AppResult<&RecomputeResults> {
        self.update(|i| {
            i.spec = DesignSpec::default();
            i.source = ParameterSource::Synthesized;
        })
    }

    fn commit(&mut self, inputs: SimulationInputs) -> AppResult<&RecomputeResults> {
        match recompute(&inputs) {
            Ok(results) => {
                self.inputs = inputs;
                Ok(&*self.results.insert(results))
            }
            Err(e) => {
                tracing::warn!(error = %e, "recompute failed, keeping previous results");
                Err(e)
            }
        }
    }
}
