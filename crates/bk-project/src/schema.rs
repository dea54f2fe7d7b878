//! Project schema definitions.

use bk_design::{DerivedParameters, DesignResult, DesignSpec};
use bk_sim::{DEFAULT_SETTLING_BAND, IntegrationMethod, SimOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub design: DesignDef,
    #[serde(default)]
    pub simulation: SimulationDef,
    /// Hand-entered component values; synthesis is skipped when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentsDef>,
}

impl Project {
    /// New project at the latest version with default design and settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: name.into(),
            design: DesignDef::default(),
            simulation: SimulationDef::default(),
            components: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DesignDef {
    pub input_voltage_v: f64,
    pub output_voltage_v: f64,
    /// Peak-to-peak output ripple
    pub output_ripple_v: f64,
    pub load_current_a: f64,
    pub ripple_ratio: f64,
    pub frequency_hz: f64,
    pub duty_min: f64,
    pub duty_max: f64,
    pub switch_drop_v: f64,
    pub diode_drop_v: f64,
}

impl Default for DesignDef {
    fn default() -> Self {
        DesignDef::from(&DesignSpec::default())
    }
}

impl From<&DesignSpec> for DesignDef {
    fn from(spec: &DesignSpec) -> Self {
        Self {
            input_voltage_v: spec.input_voltage,
            output_voltage_v: spec.output_voltage,
            output_ripple_v: spec.output_ripple,
            load_current_a: spec.load_current,
            ripple_ratio: spec.ripple_ratio,
            frequency_hz: spec.frequency,
            duty_min: spec.duty_min,
            duty_max: spec.duty_max,
            switch_drop_v: spec.switch_drop,
            diode_drop_v: spec.diode_drop,
        }
    }
}

impl From<&DesignDef> for DesignSpec {
    fn from(def: &DesignDef) -> Self {
        Self {
            input_voltage: def.input_voltage_v,
            output_voltage: def.output_voltage_v,
            output_ripple: def.output_ripple_v,
            load_current: def.load_current_a,
            ripple_ratio: def.ripple_ratio,
            frequency: def.frequency_hz,
            duty_min: def.duty_min,
            duty_max: def.duty_max,
            switch_drop: def.switch_drop_v,
            diode_drop: def.diode_drop_v,
        }
    }
}

fn default_duration_s() -> f64 {
    0.005
}

fn default_samples_per_period() -> usize {
    1000
}

fn default_rtol() -> f64 {
    1e-6
}

fn default_atol() -> f64 {
    1e-9
}

fn default_settling_band() -> f64 {
    DEFAULT_SETTLING_BAND
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    #[serde(default = "default_duration_s")]
    pub duration_s: f64,
    #[serde(default)]
    pub method: IntegrationMethod,
    #[serde(default = "default_samples_per_period")]
    pub samples_per_period: usize,
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// Settling band as a fraction of the output voltage
    #[serde(default = "default_settling_band")]
    pub settling_band: f64,
    /// Cap on adaptive step attempts; sized from the grid when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self {
            duration_s: default_duration_s(),
            method: IntegrationMethod::default(),
            samples_per_period: default_samples_per_period(),
            rtol: default_rtol(),
            atol: default_atol(),
            settling_band: default_settling_band(),
            max_steps: None,
        }
    }
}

impl SimulationDef {
    pub fn sim_options(&self) -> SimOptions {
        let mut opts = SimOptions {
            samples_per_period: self.samples_per_period,
            max_steps: self.max_steps,
            ..SimOptions::default()
        };
        opts.tolerances.rel = self.rtol;
        opts.tolerances.abs = self.atol;
        opts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentsDef {
    pub t_on_s: f64,
    pub t_off_s: f64,
    pub resistance_ohm: f64,
    pub inductance_h: f64,
    pub capacitance_f: f64,
}

impl ComponentsDef {
    pub fn to_parameters(&self) -> DesignResult<DerivedParameters> {
        DerivedParameters::manual(
            self.t_on_s,
            self.t_off_s,
            self.resistance_ohm,
            self.inductance_h,
            self.capacitance_f,
        )
    }
}

impl From<&DerivedParameters> for ComponentsDef {
    fn from(params: &DerivedParameters) -> Self {
        Self {
            t_on_s: params.t_on,
            t_off_s: params.t_off,
            resistance_ohm: params.resistance,
            inductance_h: params.inductance,
            capacitance_f: params.capacitance,
        }
    }
}
