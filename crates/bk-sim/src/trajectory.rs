//! Complete converter waveforms for one recompute.

use crate::buck::BuckModel;
use crate::error::{SimError, SimResult};
use crate::grid::TimeGrid;
use crate::sim::{IntegrationMethod, SimOptions, SimStats, run_sim};
use crate::waveforms::{ElementWaveforms, reconstruct};
use bk_design::{DerivedParameters, DesignSpec};
use serde::{Deserialize, Serialize};

/// All converter quantities at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub time: f64,
    pub inductor_current: f64,
    pub capacitor_voltage: f64,
    pub switch_voltage: f64,
    pub diode_voltage: f64,
    pub input_current: f64,
    pub diode_current: f64,
}

/// Time-indexed converter waveforms, stored column-wise.
///
/// Every column has the same length; sample `i` belongs to `time[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub method: IntegrationMethod,
    /// Switching period the grid was built for (s)
    pub period: f64,
    pub time: Vec<f64>,
    pub inductor_current: Vec<f64>,
    pub capacitor_voltage: Vec<f64>,
    pub switch_voltage: Vec<f64>,
    pub diode_voltage: Vec<f64>,
    pub input_current: Vec<f64>,
    pub diode_current: Vec<f64>,
    pub stats: SimStats,
}

impl Trajectory {
    /// Column headers in [`Trajectory::columns`] order.
    pub const COLUMN_NAMES: [&'static str; 7] = [
        "time_s",
        "inductor_current_a",
        "capacitor_voltage_v",
        "switch_voltage_v",
        "diode_voltage_v",
        "input_current_a",
        "diode_current_a",
    ];

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn columns(&self) -> [&[f64]; 7] {
        [
            &self.time,
            &self.inductor_current,
            &self.capacitor_voltage,
            &self.switch_voltage,
            &self.diode_voltage,
            &self.input_current,
            &self.diode_current,
        ]
    }

    pub fn sample(&self, i: usize) -> Option<SimulationState> {
        if i >= self.len() {
            return None;
        }
        Some(SimulationState {
            time: self.time[i],
            inductor_current: self.inductor_current[i],
            capacitor_voltage: self.capacitor_voltage[i],
            switch_voltage: self.switch_voltage[i],
            diode_voltage: self.diode_voltage[i],
            input_current: self.input_current[i],
            diode_current: self.diode_current[i],
        })
    }

    pub fn last(&self) -> Option<SimulationState> {
        self.len().checked_sub(1).and_then(|i| self.sample(i))
    }

    /// Index of the first sample at or after `t` (`len()` if none).
    pub fn index_at(&self, t: f64) -> usize {
        self.time.partition_point(|&ti| ti < t)
    }

    /// Samples in `[start, start + periods * period)`.
    pub fn window(&self, start: f64, periods: usize) -> Trajectory {
        let from = self.index_at(start);
        let to = self
            .index_at(start + periods as f64 * self.period)
            .max(from);
        let slice = |col: &[f64]| col[from..to].to_vec();

        Trajectory {
            method: self.method,
            period: self.period,
            time: slice(&self.time[..]),
            inductor_current: slice(&self.inductor_current[..]),
            capacitor_voltage: slice(&self.capacitor_voltage[..]),
            switch_voltage: slice(&self.switch_voltage[..]),
            diode_voltage: slice(&self.diode_voltage[..]),
            input_current: slice(&self.input_current[..]),
            diode_current: slice(&self.diode_current[..]),
            stats: self.stats,
        }
    }

    /// Window covering the last `periods` whole periods.
    pub fn tail(&self, periods: usize) -> Trajectory {
        let Some(&last) = self.time.last() else {
            return self.window(0.0, 0);
        };
        let dt = if self.len() > 1 {
            self.time[1] - self.time[0]
        } else {
            self.period
        };
        // Half a sample past the end keeps the window edge off a grid point.
        let start = (last + 0.5 * dt - periods as f64 * self.period).max(0.0);
        self.window(start, periods)
    }
}

/// Simulate the converter from rest over `[0, duration)`.
///
/// Returns a fresh trajectory on success; nothing is produced on failure.
pub fn simulate_converter(
    spec: &DesignSpec,
    params: &DerivedParameters,
    duration: f64,
    method: IntegrationMethod,
    opts: &SimOptions,
) -> SimResult<Trajectory> {
    params.validate()?;
    opts.validate()?;

    let grid = TimeGrid::per_period(
        params.period,
        opts.samples_per_period,
        duration,
        opts.max_samples,
    )?;
    let model = BuckModel::new(spec, params);
    let record = run_sim(&model, &grid, method, opts)?;

    let mut columns = record.columns.into_iter();
    let (Some(inductor_current), Some(capacitor_voltage)) = (columns.next(), columns.next())
    else {
        return Err(SimError::InvalidArg {
            what: "converter state must have two components",
        });
    };

    let ElementWaveforms {
        switch_voltage,
        diode_voltage,
        input_current,
        diode_current,
    } = reconstruct(
        &record.t,
        &inductor_current,
        &model.schedule,
        spec.input_voltage,
        spec.switch_drop,
        spec.diode_drop,
    )?;

    Ok(Trajectory {
        method,
        period: params.period,
        time: record.t,
        inductor_current,
        capacitor_voltage,
        switch_voltage,
        diode_voltage,
        input_current,
        diode_current,
        stats: record.stats,
    })
}
