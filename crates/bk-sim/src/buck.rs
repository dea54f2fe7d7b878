//! Switched state equations of the buck power stage.

use crate::error::SimResult;
use crate::model::{Segment, TransientModel};
use crate::switching::{SwitchSchedule, SwitchState};
use bk_design::{DerivedParameters, DesignSpec};
use nalgebra::{DMatrix, DVector};

/// Index of the inductor current in the state vector.
pub const I_L: usize = 0;
/// Index of the capacitor (output) voltage in the state vector.
pub const U_C: usize = 1;

/// Buck converter with ideal switching and constant semiconductor drops.
///
/// State is `[I_L, U_C]`, starting from rest.
///
/// ON:  `dI_L/dt = (U_in - U_sw - U_C) / L`
/// OFF: `dI_L/dt = (-U_C - U_d) / L`
/// both: `dU_C/dt = (I_L - U_C / R) / C`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuckModel {
    pub schedule: SwitchSchedule,
    pub input_voltage: f64,
    pub switch_drop: f64,
    pub diode_drop: f64,
    pub resistance: f64,
    pub inductance: f64,
    pub capacitance: f64,
}

impl BuckModel {
    pub fn new(spec: &DesignSpec, params: &DerivedParameters) -> Self {
        Self {
            schedule: SwitchSchedule::new(params.period, params.t_on),
            input_voltage: spec.input_voltage,
            switch_drop: spec.switch_drop,
            diode_drop: spec.diode_drop,
            resistance: params.resistance,
            inductance: params.inductance,
            capacitance: params.capacitance,
        }
    }

    /// `(dI_L/dt, dU_C/dt)` in the given switch state.
    pub fn derivatives(&self, state: SwitchState, i_l: f64, u_c: f64) -> (f64, f64) {
        let inductor_voltage = match state {
            SwitchState::On => self.input_voltage - self.switch_drop - u_c,
            SwitchState::Off => -u_c - self.diode_drop,
        };
        let di_l = inductor_voltage / self.inductance;
        let du_c = (i_l - u_c / self.resistance) / self.capacitance;
        (di_l, du_c)
    }
}

impl TransientModel for BuckModel {
    type Mode = SwitchState;

    fn initial_state(&self) -> DVector<f64> {
        DVector::zeros(2)
    }

    fn mode_at(&self, t: f64) -> SwitchState {
        self.schedule.state_at(t)
    }

    fn segments(&self, t_end: f64) -> impl Iterator<Item = Segment<SwitchState>> {
        self.schedule.segments(t_end)
    }

    fn rhs(&self, mode: SwitchState, x: &DVector<f64>) -> SimResult<DVector<f64>> {
        let (di_l, du_c) = self.derivatives(mode, x[I_L], x[U_C]);
        Ok(DVector::from_vec(vec![di_l, du_c]))
    }

    /// The state matrix is the same in both switch states; only the forcing
    /// term changes.
    fn jacobian(&self, _mode: SwitchState, _x: &DVector<f64>) -> SimResult<DMatrix<f64>> {
        let l = self.inductance;
        let c = self.capacitance;
        let r = self.resistance;
        Ok(DMatrix::from_row_slice(
            2,
            2,
            &[0.0, -1.0 / l, 1.0 / c, -1.0 / (r * c)],
        ))
    }
}
