//! Inverse design equations: from requirements to component values.

use crate::error::{DesignError, DesignResult};
use crate::spec::DesignSpec;
use bk_core::units::{
    Capacitance, Frequency, Inductance, Resistance, Time, farads, henries, hz, ohms, s,
};
use bk_core::{ensure_finite, ensure_positive};
use serde::{Deserialize, Serialize};

/// Component values and switching timing for one converter instance.
///
/// Always built whole, either by [`synthesize`] or [`DerivedParameters::manual`];
/// both enforce `period = t_on + t_off > 0` and positive L, C, R.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    /// Switching period (s)
    pub period: f64,
    /// Switch conduction interval per period (s)
    pub t_on: f64,
    /// Switch blocking interval per period (s)
    pub t_off: f64,
    /// Load resistance (Ω)
    pub resistance: f64,
    /// Filter inductance (H)
    pub inductance: f64,
    /// Filter capacitance (F)
    pub capacitance: f64,
}

/// Typed view of [`DerivedParameters`].
#[derive(Debug, Clone, Copy)]
pub struct ComponentQuantities {
    pub period: Time,
    pub t_on: Time,
    pub t_off: Time,
    pub frequency: Frequency,
    pub resistance: Resistance,
    pub inductance: Inductance,
    pub capacitance: Capacitance,
}

impl DerivedParameters {
    /// Build from hand-entered values; the period is `t_on + t_off`.
    pub fn manual(
        t_on: f64,
        t_off: f64,
        resistance: f64,
        inductance: f64,
        capacitance: f64,
    ) -> DesignResult<Self> {
        let params = Self {
            period: t_on + t_off,
            t_on,
            t_off,
            resistance,
            inductance,
            capacitance,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> DesignResult<()> {
        ensure_positive(self.t_on, "t_on")?;
        ensure_finite(self.t_off, "t_off")?;
        if self.t_off < 0.0 {
            return Err(DesignError::InvalidParameter {
                what: "t_off",
                value: self.t_off,
            });
        }
        ensure_positive(self.period, "period")?;
        ensure_positive(self.resistance, "resistance")?;
        ensure_positive(self.inductance, "inductance")?;
        ensure_positive(self.capacitance, "capacitance")?;

        let sum = self.t_on + self.t_off;
        if (sum - self.period).abs() > 1e-9 * self.period {
            return Err(DesignError::InvalidParameter {
                what: "period (must equal t_on + t_off)",
                value: self.period,
            });
        }
        Ok(())
    }

    pub fn frequency(&self) -> f64 {
        1.0 / self.period
    }

    /// Fraction of the period the switch conducts.
    pub fn duty_cycle(&self) -> f64 {
        self.t_on / self.period
    }

    pub fn quantities(&self) -> ComponentQuantities {
        ComponentQuantities {
            period: s(self.period),
            t_on: s(self.t_on),
            t_off: s(self.t_off),
            frequency: hz(self.frequency()),
            resistance: ohms(self.resistance),
            inductance: henries(self.inductance),
            capacitance: farads(self.capacitance),
        }
    }
}

/// Size the converter for `spec`.
///
/// The on/off split accounts for both semiconductor drops; capacitance is
/// solved from the target output ripple so that [`crate::check_ripples`]
/// returns that target back.
pub fn synthesize(spec: &DesignSpec) -> DesignResult<DerivedParameters> {
    spec.validate()?;

    let headroom = spec.headroom();
    let k = (spec.output_voltage + spec.diode_drop) / headroom;
    let period = 1.0 / spec.frequency;
    let t_on = period * k / (k + 1.0);
    let t_off = period / (k + 1.0);

    let resistance = spec.output_voltage / spec.load_current;
    let inductance = t_on * headroom / (spec.ripple_ratio * spec.load_current);

    let inductor_ripple = headroom * spec.duty_cycle() / (inductance * spec.frequency);
    let capacitance = inductor_ripple / (8.0 * spec.output_ripple * spec.frequency);

    let params = DerivedParameters {
        period,
        t_on,
        t_off,
        resistance,
        inductance,
        capacitance,
    };
    params.validate()?;

    tracing::debug!(
        period,
        t_on,
        t_off,
        resistance,
        inductance,
        capacitance,
        "synthesized converter parameters"
    );
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(a: f64, b: f64) -> f64 {
        (a - b).abs() / b.abs()
    }

    #[test]
    fn reference_design_values() {
        let p = synthesize(&DesignSpec::default()).unwrap();
        assert!(rel(p.period, 1.0e-4) < 1e-12);
        assert!(rel(p.t_on, 7.76e-5) < 0.01);
        assert!(rel(p.t_off, 2.24e-5) < 0.01);
        assert!(rel(p.resistance, 9.0) < 1e-12);
        assert!(rel(p.inductance, 1.086e-3) < 0.01);
        assert!(rel(p.capacitance, 4.91e-5) < 0.01);
        assert!(rel(p.t_on + p.t_off, p.period) < 1e-12);
    }

    #[test]
    fn infeasible_when_headroom_vanishes() {
        let spec = DesignSpec {
            input_voltage: 9.2,
            ..DesignSpec::default()
        };
        assert!(matches!(
            synthesize(&spec),
            Err(DesignError::InfeasibleDesign { .. })
        ));

        let spec = DesignSpec {
            input_voltage: 5.0,
            ..DesignSpec::default()
        };
        assert!(matches!(
            synthesize(&spec),
            Err(DesignError::InfeasibleDesign { .. })
        ));
    }

    #[test]
    fn manual_parameters_derive_period() {
        let p = DerivedParameters::manual(6e-5, 4e-5, 10.0, 1e-3, 1e-4).unwrap();
        assert!((p.period - 1e-4).abs() < 1e-18);
        assert!((p.frequency() - 10_000.0).abs() < 1e-6);
        assert!((p.duty_cycle() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn manual_parameters_reject_nonpositive_components() {
        assert!(DerivedParameters::manual(6e-5, 4e-5, 0.0, 1e-3, 1e-4).is_err());
        assert!(DerivedParameters::manual(6e-5, 4e-5, 10.0, -1e-3, 1e-4).is_err());
        assert!(DerivedParameters::manual(6e-5, 4e-5, 10.0, 1e-3, 0.0).is_err());
        assert!(DerivedParameters::manual(0.0, 4e-5, 10.0, 1e-3, 1e-4).is_err());
        assert!(DerivedParameters::manual(6e-5, -1e-6, 10.0, 1e-3, 1e-4).is_err());
    }

    #[test]
    fn quantities_match_raw_values() {
        use uom::si::capacitance::microfarad;
        use uom::si::frequency::kilohertz;

        let p = synthesize(&DesignSpec::default()).unwrap();
        let q = p.quantities();
        assert!((q.capacitance.get::<microfarad>() - p.capacitance * 1e6).abs() < 1e-9);
        assert!((q.frequency.get::<kilohertz>() - 10.0).abs() < 1e-9);
    }
}
