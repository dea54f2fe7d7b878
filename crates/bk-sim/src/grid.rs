//! Uniform sampling grid shared by every integration back-end.

use crate::error::{SimError, SimResult};

/// Relative distance to an integer below which `duration / dt` counts as whole.
const WHOLE_STEP_EPS: f64 = 1e-9;

/// Sample times `t_i = i * dt` for `i in 0..len`, all strictly below the duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    dt: f64,
    len: usize,
}

impl TimeGrid {
    /// Grid with spacing `dt` covering `[0, duration)`.
    ///
    /// A duration that is an integer multiple of `dt` up to rounding yields
    /// exactly that many samples, so `duration = 20 T` with `dt = T/1000`
    /// always gives 20 000 samples.
    pub fn uniform(dt: f64, duration: f64, max_samples: usize) -> SimResult<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "time step must be positive and finite",
            });
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "simulation duration must be positive and finite",
            });
        }

        let ratio = duration / dt;
        let nearest = ratio.round();
        let steps = if (ratio - nearest).abs() <= WHOLE_STEP_EPS * nearest.max(1.0) {
            nearest
        } else {
            ratio.ceil()
        };

        if steps > max_samples as f64 {
            return Err(SimError::SampleLimit {
                requested: if steps >= usize::MAX as f64 {
                    usize::MAX
                } else {
                    steps as usize
                },
                max: max_samples,
            });
        }

        Ok(Self {
            dt,
            len: (steps as usize).max(1),
        })
    }

    /// Grid with `samples_per_period` samples in each switching period.
    pub fn per_period(
        period: f64,
        samples_per_period: usize,
        duration: f64,
        max_samples: usize,
    ) -> SimResult<Self> {
        if samples_per_period == 0 {
            return Err(SimError::InvalidArg {
                what: "samples per period must be at least 1",
            });
        }
        Self::uniform(period / samples_per_period as f64, duration, max_samples)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn time(&self, i: usize) -> f64 {
        i as f64 * self.dt
    }

    /// Time just past the last sample; integration runs over `[0, end)`.
    pub fn end(&self) -> f64 {
        self.len as f64 * self.dt
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.time(i)).collect()
    }
}
