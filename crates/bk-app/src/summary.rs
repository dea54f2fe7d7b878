//! Concise, serializable digest of a recompute.

use bk_design::{DerivedParameters, OutputBounds, RippleReport};
use bk_sim::{IntegrationMethod, SettlingReport, SimStats, SimulationState};
use serde::Serialize;

use crate::context::RecomputeResults;

/// Peak-to-peak spread of one waveform over a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasuredRipple {
    pub inductor_current: f64,
    pub capacitor_voltage: f64,
}

/// What a frontend prints after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub method: IntegrationMethod,
    pub samples: usize,
    pub parameters: DerivedParameters,
    pub expected_ripple: RippleReport,
    /// Ripple over the last simulated period
    pub measured_ripple: Option<MeasuredRipple>,
    pub bounds: OutputBounds,
    pub settling: SettlingReport,
    pub final_state: Option<SimulationState>,
    pub stats: SimStats,
}

fn peak_to_peak(values: &[f64]) -> Option<f64> {
    let (lo, hi) = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| {
        Some(match acc {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        })
    })?;
    Some(hi - lo)
}

impl RunSummary {
    pub fn from_results(results: &RecomputeResults) -> Self {
        let traj = &results.trajectory;
        let tail = traj.tail(1);
        let measured_ripple = match (
            peak_to_peak(&tail.inductor_current),
            peak_to_peak(&tail.capacitor_voltage),
        ) {
            (Some(inductor_current), Some(capacitor_voltage)) => Some(MeasuredRipple {
                inductor_current,
                capacitor_voltage,
            }),
            _ => None,
        };

        Self {
            method: traj.method,
            samples: traj.len(),
            parameters: results.parameters,
            expected_ripple: results.ripple,
            measured_ripple,
            bounds: results.bounds,
            settling: results.settling,
            final_state: traj.last(),
            stats: traj.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_to_peak_of_empty_is_none() {
        assert_eq!(peak_to_peak(&[]), None);
        assert_eq!(peak_to_peak(&[1.0, -2.0, 0.5]), Some(3.0));
    }
}
