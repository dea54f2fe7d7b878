//! Switch state timing for a fixed-frequency PWM signal.
//!
//! Every component that needs to know whether the switch conducts at a given
//! instant goes through [`classify`], so the integrator and the waveform
//! reconstruction can never disagree about a transition.

use crate::model::Segment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conduction state of the power switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn is_on(self) -> bool {
        matches!(self, SwitchState::On)
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchState::On => write!(f, "ON"),
            SwitchState::Off => write!(f, "OFF"),
        }
    }
}

/// Switch state at absolute time `t`: ON iff `t mod period < t_on`.
///
/// `t = 0` is ON for any positive `t_on`.
pub fn classify(t: f64, period: f64, t_on: f64) -> SwitchState {
    if t.rem_euclid(period) < t_on {
        SwitchState::On
    } else {
        SwitchState::Off
    }
}

/// Periodic switching pattern: ON on `[kT, kT + t_on)`, OFF on `[kT + t_on, (k+1)T)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchSchedule {
    pub period: f64,
    pub t_on: f64,
}

impl SwitchSchedule {
    pub fn new(period: f64, t_on: f64) -> Self {
        Self { period, t_on }
    }

    pub fn state_at(&self, t: f64) -> SwitchState {
        classify(t, self.period, self.t_on)
    }

    /// Constant-state intervals covering `[0, t_end)`, produced lazily.
    ///
    /// Consecutive segments share their boundary value exactly, and the state of
    /// each segment is the one [`classify`] reports at its midpoint.
    pub fn segments(&self, t_end: f64) -> SwitchSegments {
        SwitchSegments {
            schedule: *self,
            t_end,
            start: 0.0,
            period_index: 0,
            on_phase: true,
        }
    }
}

/// Iterator over the constant-state intervals of a [`SwitchSchedule`].
#[derive(Debug, Clone)]
pub struct SwitchSegments {
    schedule: SwitchSchedule,
    t_end: f64,
    start: f64,
    period_index: u64,
    on_phase: bool,
}

impl Iterator for SwitchSegments {
    type Item = Segment<SwitchState>;

    fn next(&mut self) -> Option<Self::Item> {
        // Boundaries are k*T + t_on and (k+1)*T from the period counter.
        while self.start < self.t_end {
            let base = self.period_index as f64 * self.schedule.period;
            let boundary = if self.on_phase {
                base + self.schedule.t_on
            } else {
                self.period_index += 1;
                self.period_index as f64 * self.schedule.period
            };
            self.on_phase = !self.on_phase;

            let end = boundary.min(self.t_end);
            if end > self.start {
                let segment = Segment {
                    start: self.start,
                    end,
                    mode: self.schedule.state_at(0.5 * (self.start + end)),
                };
                self.start = end;
                return Some(segment);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: f64 = 1.0e-4;
    const T_ON: f64 = 7.76e-5;

    #[test]
    fn zero_is_on() {
        assert_eq!(classify(0.0, T, T_ON), SwitchState::On);
        assert_eq!(classify(0.0, T, 1e-12), SwitchState::On);
    }

    #[test]
    fn transitions_at_on_time() {
        assert_eq!(classify(T_ON * 0.999, T, T_ON), SwitchState::On);
        assert_eq!(classify(T_ON * 1.001, T, T_ON), SwitchState::Off);
        assert_eq!(classify(T * 0.999, T, T_ON), SwitchState::Off);
        assert_eq!(classify(T * 1.001, T, T_ON), SwitchState::On);
    }

    #[test]
    fn segments_tile_the_interval() {
        let sched = SwitchSchedule::new(T, T_ON);
        let t_end = 3.5 * T;
        let segs: Vec<_> = sched.segments(t_end).collect();

        assert_eq!(segs.first().map(|s| s.start), Some(0.0));
        assert_eq!(segs.last().map(|s| s.end), Some(t_end));
        for pair in segs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_ne!(pair[0].mode, pair[1].mode);
        }
        // 3 full periods (6 segments) + truncated ON
        assert_eq!(segs.len(), 7);
        assert_eq!(segs[0].mode, SwitchState::On);
        assert_eq!(segs[1].mode, SwitchState::Off);
        assert_eq!(segs[6].mode, SwitchState::On);
    }

    #[test]
    fn always_on_schedule_has_no_off_segments() {
        let sched = SwitchSchedule::new(T, T);
        let segs: Vec<_> = sched.segments(2.0 * T).collect();
        assert!(segs.iter().all(|s| s.mode == SwitchState::On));
        assert_eq!(segs.last().map(|s| s.end), Some(2.0 * T));
    }

    #[test]
    fn segments_are_produced_lazily() {
        // Ten million periods; only the first few are ever materialized.
        let sched = SwitchSchedule::new(T, T_ON);
        let mut segs = sched.segments(1.0e7 * T);
        let first = segs.next().unwrap();
        assert_eq!((first.start, first.end, first.mode), (0.0, T_ON, SwitchState::On));
        let third = segs.nth(1).unwrap();
        assert_eq!(third.start, T);
        assert_eq!(third.mode, SwitchState::On);
    }

    #[test]
    fn segment_starts_land_on_period_multiples() {
        let sched = SwitchSchedule::new(T, T_ON);
        for (k, seg) in sched
            .segments(2000.0 * T)
            .filter(|s| s.mode == SwitchState::On)
            .enumerate()
        {
            assert_eq!(seg.start, k as f64 * T);
        }
    }
}
