//! Steady-state ripple and filter diagnostics.

use crate::spec::DesignSpec;
use crate::synth::DerivedParameters;
use bk_core::units::{Current, Frequency, Voltage, amps, hz, volts};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Expected ripple figures for a sized converter.
///
/// Diagnostic values only; no threshold is applied to them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RippleReport {
    /// Peak-to-peak inductor current ripple (A)
    pub inductor_ripple: f64,
    /// Peak-to-peak output voltage ripple (V)
    pub output_ripple: f64,
    /// LC low-pass corner frequency (Hz)
    pub cutoff_frequency: f64,
}

impl RippleReport {
    pub fn inductor_ripple_current(&self) -> Current {
        amps(self.inductor_ripple)
    }

    pub fn output_ripple_voltage(&self) -> Voltage {
        volts(self.output_ripple)
    }

    pub fn cutoff(&self) -> Frequency {
        hz(self.cutoff_frequency)
    }
}

/// Ripple expected from `params` when regulating `spec.output_voltage`.
///
/// The duty cycle is the nominal `U_out / (U_in - U_sw)` of `spec`, the same
/// value [`crate::synthesize`] sizes with. The switching frequency is
/// `1 / params.period`, which equals `spec.frequency` for synthesized
/// parameters. With hand-entered timing only the period is honored: the
/// `t_on`/`t_off` split does not enter the result.
pub fn check_ripples(spec: &DesignSpec, params: &DerivedParameters) -> RippleReport {
    let f = params.frequency();
    let inductor_ripple = spec.headroom() * spec.duty_cycle() / (params.inductance * f);
    let output_ripple = inductor_ripple / (8.0 * params.capacitance * f);
    let cutoff_frequency = 1.0 / (2.0 * PI * (params.inductance * params.capacitance).sqrt());

    RippleReport {
        inductor_ripple,
        output_ripple,
        cutoff_frequency,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::synth::synthesize;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn capacitance_sizing_round_trips(
            ripple in 0.001_f64..1.0,
            f in 1_000.0_f64..100_000.0,
            out in 1.0_f64..10.0,
        ) {
            let spec = DesignSpec {
                output_ripple: ripple,
                frequency: f,
                output_voltage: out,
                ..DesignSpec::default()
            };
            let params = synthesize(&spec).unwrap();
            let report = check_ripples(&spec, &params);
            prop_assert!((report.output_ripple - ripple).abs() <= 1e-9 * ripple);
        }
    }
}
