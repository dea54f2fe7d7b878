//! Secondary waveforms of the switching elements.

use crate::error::{SimError, SimResult};
use crate::switching::{SwitchSchedule, SwitchState};

/// Voltages and currents of the switch and diode at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSample {
    pub switch_voltage: f64,
    pub diode_voltage: f64,
    pub input_current: f64,
    pub diode_current: f64,
}

/// Element values for switch state `state` carrying inductor current `i_l`.
pub fn element_sample(
    state: SwitchState,
    i_l: f64,
    input_voltage: f64,
    switch_drop: f64,
    diode_drop: f64,
) -> ElementSample {
    match state {
        SwitchState::On => ElementSample {
            switch_voltage: switch_drop,
            diode_voltage: input_voltage - switch_drop,
            input_current: i_l,
            diode_current: 0.0,
        },
        SwitchState::Off => ElementSample {
            switch_voltage: input_voltage,
            diode_voltage: diode_drop,
            input_current: 0.0,
            diode_current: i_l,
        },
    }
}

/// Column-wise element waveforms, one entry per trajectory sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementWaveforms {
    pub switch_voltage: Vec<f64>,
    pub diode_voltage: Vec<f64>,
    pub input_current: Vec<f64>,
    pub diode_current: Vec<f64>,
}

impl ElementWaveforms {
    pub fn len(&self) -> usize {
        self.switch_voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switch_voltage.is_empty()
    }
}

/// Rebuild element waveforms from sample times and the inductor current.
///
/// The switch state of each sample is classified by the same schedule the
/// integrator used.
pub fn reconstruct(
    times: &[f64],
    inductor_current: &[f64],
    schedule: &SwitchSchedule,
    input_voltage: f64,
    switch_drop: f64,
    diode_drop: f64,
) -> SimResult<ElementWaveforms> {
    if times.len() != inductor_current.len() {
        return Err(SimError::InvalidArg {
            what: "time and inductor current arrays differ in length",
        });
    }

    let n = times.len();
    let mut out = ElementWaveforms {
        switch_voltage: Vec::with_capacity(n),
        diode_voltage: Vec::with_capacity(n),
        input_current: Vec::with_capacity(n),
        diode_current: Vec::with_capacity(n),
    };

    for (&t, &i_l) in times.iter().zip(inductor_current) {
        let sample = element_sample(
            schedule.state_at(t),
            i_l,
            input_voltage,
            switch_drop,
            diode_drop,
        );
        out.switch_voltage.push(sample.switch_voltage);
        out.diode_voltage.push(sample.diode_voltage);
        out.input_current.push(sample.input_current);
        out.diode_current.push(sample.diode_current);
    }

    Ok(out)
}
