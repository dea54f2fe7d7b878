//! Settling time of the output voltage.
//!
//! [`settling_time`] scans the simulated waveform and is the reference
//! figure. [`SettlingEstimates`] holds closed-form second-order approximations
//! from the component values; they are diagnostics only and may disagree with
//! the scan and with each other.

use crate::trajectory::Trajectory;
use bk_design::DerivedParameters;
use serde::{Deserialize, Serialize};

/// Default settling band, as a fraction of the target voltage.
pub const DEFAULT_SETTLING_BAND: f64 = 0.02;

/// Time of the first sample after which `values` stays within
/// `band * |target|` of `target` until the end.
///
/// `None` if the last sample is outside the band or the input is empty.
pub fn settling_time(time: &[f64], values: &[f64], target: f64, band: f64) -> Option<f64> {
    let limit = band * target.abs();
    let inside = |v: f64| (v - target).abs() <= limit;

    let n = time.len().min(values.len());
    let mut first_inside = None;
    for i in (0..n).rev() {
        if !inside(values[i]) {
            break;
        }
        first_inside = Some(i);
    }
    first_inside.map(|i| time[i])
}

/// Closed-form estimates from the LC filter loaded by R.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlingEstimates {
    /// `ζ = (1 / 2R) √(L / C)`
    pub damping_ratio: f64,
    /// `ω_n = 1 / √(LC)` (rad/s)
    pub natural_frequency: f64,
    /// Decay of the slowest pole to the band: `-ln(band) / σ`
    pub envelope: f64,
    /// Five undamped time constants, `5 / ω_n`
    pub undamped: f64,
}

impl SettlingEstimates {
    pub fn from_parameters(params: &DerivedParameters, band: f64) -> Self {
        let l = params.inductance;
        let c = params.capacitance;
        let r = params.resistance;

        let damping_ratio = (l / c).sqrt() / (2.0 * r);
        let natural_frequency = 1.0 / (l * c).sqrt();

        // Real part of the slowest pole.
        let sigma = if damping_ratio < 1.0 {
            damping_ratio * natural_frequency
        } else {
            natural_frequency * (damping_ratio - (damping_ratio * damping_ratio - 1.0).sqrt())
        };

        Self {
            damping_ratio,
            natural_frequency,
            envelope: -band.ln() / sigma,
            undamped: 5.0 / natural_frequency,
        }
    }
}

/// Settling diagnostics for one trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlingReport {
    pub band: f64,
    /// From the waveform scan; `None` if the output has not settled
    pub settling_time: Option<f64>,
    pub estimates: SettlingEstimates,
}

pub fn settling_report(
    trajectory: &Trajectory,
    target: f64,
    params: &DerivedParameters,
    band: f64,
) -> SettlingReport {
    SettlingReport {
        band,
        settling_time: settling_time(
            &trajectory.time,
            &trajectory.capacitor_voltage,
            target,
            band,
        ),
        estimates: SettlingEstimates::from_parameters(params, band),
    }
}
