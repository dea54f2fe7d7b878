//! Target electrical requirements for the converter.

use crate::error::{DesignError, DesignResult};
use bk_core::{ensure_finite, ensure_positive};
use serde::{Deserialize, Serialize};

/// Design specification for a buck converter.
///
/// All voltages in volts, currents in amperes, frequency in hertz.
/// `output_ripple` is the peak-to-peak output voltage ripple in volts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignSpec {
    /// Input (supply) voltage
    pub input_voltage: f64,
    /// Target output voltage
    pub output_voltage: f64,
    /// Target peak-to-peak output ripple (V)
    pub output_ripple: f64,
    /// Nominal load current
    pub load_current: f64,
    /// Inductor ripple current as a fraction of load current, in (0, 1]
    pub ripple_ratio: f64,
    /// Switching frequency
    pub frequency: f64,
    /// Minimum duty cycle the controller can produce
    pub duty_min: f64,
    /// Maximum duty cycle the controller can produce
    pub duty_max: f64,
    /// Saturation drop across the closed switch
    pub switch_drop: f64,
    /// Forward drop across the freewheeling diode
    pub diode_drop: f64,
}

impl Default for DesignSpec {
    fn default() -> Self {
        Self {
            input_voltage: 12.0,
            output_voltage: 9.0,
            output_ripple: 0.05,
            load_current: 1.0,
            ripple_ratio: 0.2,
            frequency: 10_000.0,
            duty_min: 0.1,
            duty_max: 0.98,
            switch_drop: 0.2,
            diode_drop: 0.7,
        }
    }
}

/// Output voltage range reachable within the duty-cycle limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputBounds {
    pub min: f64,
    pub max: f64,
}

impl OutputBounds {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

impl DesignSpec {
    /// Voltage left across the inductor while the switch conducts.
    pub fn headroom(&self) -> f64 {
        self.input_voltage - self.switch_drop - self.output_voltage
    }

    /// Nominal duty cycle `U_out / (U_in - switch_drop)`.
    pub fn duty_cycle(&self) -> f64 {
        self.output_voltage / (self.input_voltage - self.switch_drop)
    }

    /// Output voltage produced at duty cycle `d` in continuous conduction.
    pub fn output_at_duty(&self, d: f64) -> f64 {
        d * (self.input_voltage - self.switch_drop) - (1.0 - d) * self.diode_drop
    }

    pub fn output_bounds(&self) -> OutputBounds {
        OutputBounds {
            min: self.output_at_duty(self.duty_min),
            max: self.output_at_duty(self.duty_max),
        }
    }

    /// Check every field, then that the target output is reachable.
    ///
    /// A malformed field is reported as such rather than as an unreachable
    /// target.
    pub fn validate(&self) -> DesignResult<()> {
        self.validate_fields()?;

        if self.headroom() <= 0.0 {
            return Err(DesignError::InfeasibleDesign {
                input_voltage: self.input_voltage,
                required: self.switch_drop + self.output_voltage,
            });
        }
        Ok(())
    }

    /// Range checks on each field, without the feasibility check.
    ///
    /// This is all that applies when hand-entered component values replace
    /// synthesis.
    pub fn validate_fields(&self) -> DesignResult<()> {
        ensure_positive(self.input_voltage, "input_voltage")?;
        ensure_positive(self.output_voltage, "output_voltage")?;
        ensure_positive(self.output_ripple, "output_ripple")?;
        ensure_positive(self.load_current, "load_current")?;
        ensure_positive(self.ripple_ratio, "ripple_ratio")?;
        ensure_positive(self.frequency, "frequency")?;
        ensure_finite(self.switch_drop, "switch_drop")?;
        ensure_finite(self.diode_drop, "diode_drop")?;

        if self.ripple_ratio > 1.0 {
            return Err(DesignError::InvalidParameter {
                what: "ripple_ratio",
                value: self.ripple_ratio,
            });
        }
        if self.switch_drop < 0.0 {
            return Err(DesignError::InvalidParameter {
                what: "switch_drop",
                value: self.switch_drop,
            });
        }
        if self.diode_drop < 0.0 {
            return Err(DesignError::InvalidParameter {
                what: "diode_drop",
                value: self.diode_drop,
            });
        }
        for (what, d) in [("duty_min", self.duty_min), ("duty_max", self.duty_max)] {
            if !(0.0..=1.0).contains(&d) {
                return Err(DesignError::InvalidParameter { what, value: d });
            }
        }
        if self.duty_min >= self.duty_max {
            return Err(DesignError::InvalidParameter {
                what: "duty_min (must be below duty_max)",
                value: self.duty_min,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_independent_values() {
        let mut a = DesignSpec::default();
        let b = DesignSpec::default();
        a.input_voltage = 24.0;
        assert_eq!(b.input_voltage, 12.0);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn output_bounds_follow_duty_limits() {
        let spec = DesignSpec::default();
        let bounds = spec.output_bounds();
        // 0.1 * 11.8 - 0.9 * 0.7
        assert!((bounds.min - 0.55).abs() < 1e-12);
        // 0.98 * 11.8 - 0.02 * 0.7
        assert!((bounds.max - 11.55).abs() < 1e-12);
        assert!(bounds.contains(spec.output_voltage));
        assert!(!bounds.contains(12.0));
    }

    #[test]
    fn validate_rejects_ratio_above_one() {
        let spec = DesignSpec {
            ripple_ratio: 1.5,
            ..DesignSpec::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(DesignError::InvalidParameter {
                what: "ripple_ratio",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_inverted_duty_bounds() {
        let spec = DesignSpec {
            duty_min: 0.9,
            duty_max: 0.5,
            ..DesignSpec::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_frequency() {
        let spec = DesignSpec {
            frequency: 0.0,
            ..DesignSpec::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(DesignError::InvalidParameter {
                what: "frequency",
                ..
            })
        ));
    }

    #[test]
    fn validate_flags_unreachable_output() {
        let spec = DesignSpec {
            input_voltage: 9.2,
            ..DesignSpec::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(DesignError::InfeasibleDesign { .. })
        ));
        // Each field is fine on its own.
        assert!(spec.validate_fields().is_ok());
    }

    #[test]
    fn field_checks_reject_nan_input_and_negative_drops() {
        let nan_input = DesignSpec {
            input_voltage: f64::NAN,
            ..DesignSpec::default()
        };
        assert!(matches!(
            nan_input.validate_fields(),
            Err(DesignError::InvalidParameter {
                what: "input_voltage",
                ..
            })
        ));

        let negative_drops = DesignSpec {
            switch_drop: -3.0,
            diode_drop: -5.0,
            ..DesignSpec::default()
        };
        assert!(matches!(
            negative_drops.validate_fields(),
            Err(DesignError::InvalidParameter {
                what: "switch_drop",
                ..
            })
        ));
    }
}
