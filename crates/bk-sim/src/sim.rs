//! Simulation runner and result recording.

use crate::error::{SimError, SimResult};
use crate::grid::TimeGrid;
use crate::implicit::{Bdf2, RadauIIA};
use crate::integrator::{AdaptiveStepper, Dopri5, ForwardEuler, Integrator};
use crate::model::TransientModel;
use crate::newton::NewtonConfig;
use bk_core::Tolerances;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Integration back-end selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Fixed-step forward Euler on the sampling grid (1 rhs call per sample).
    #[default]
    ForwardEuler,
    /// Dormand–Prince 5(4), explicit adaptive.
    Rk45,
    /// Variable-step BDF2, implicit.
    Bdf,
    /// Two-stage Radau IIA, implicit and L-stable.
    Radau,
}

impl IntegrationMethod {
    pub const ALL: [IntegrationMethod; 4] = [
        IntegrationMethod::ForwardEuler,
        IntegrationMethod::Rk45,
        IntegrationMethod::Bdf,
        IntegrationMethod::Radau,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IntegrationMethod::ForwardEuler => "forward_euler",
            IntegrationMethod::Rk45 => "rk45",
            IntegrationMethod::Bdf => "bdf",
            IntegrationMethod::Radau => "radau",
        }
    }

    pub fn is_adaptive(self) -> bool {
        !matches!(self, IntegrationMethod::ForwardEuler)
    }
}

impl fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntegrationMethod {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward_euler" | "euler" => Ok(IntegrationMethod::ForwardEuler),
            "rk45" | "dopri5" => Ok(IntegrationMethod::Rk45),
            "bdf" | "bdf2" => Ok(IntegrationMethod::Bdf),
            "radau" => Ok(IntegrationMethod::Radau),
            _ => Err(SimError::InvalidArg {
                what: "unknown integration method",
            }),
        }
    }
}

/// Default adaptive step attempts allowed per grid sample.
pub const STEPS_PER_SAMPLE: usize = 20;
/// Default adaptive step attempts allowed per constant-mode segment.
pub const STEPS_PER_SEGMENT: usize = 20;

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq)]
pub struct SimOptions {
    /// Grid density (samples per switching period)
    pub samples_per_period: usize,
    /// Local error tolerances for adaptive back-ends
    pub tolerances: Tolerances,
    /// First trial step (seconds); defaults to the grid spacing
    pub initial_step: Option<f64>,
    /// Upper bound on adaptive steps (seconds)
    pub max_step: Option<f64>,
    /// Smallest step an adaptive back-end may take before giving up (seconds)
    pub min_step: f64,
    /// Maximum number of grid samples (memory guard)
    pub max_samples: usize,
    /// Consecutive rejected attempts allowed for a single step
    pub max_rejections: usize,
    /// Total step attempts allowed in one adaptive run.
    ///
    /// `None` sizes the budget from the run: [`STEPS_PER_SAMPLE`] per grid
    /// sample plus [`STEPS_PER_SEGMENT`] per constant-mode segment.
    pub max_steps: Option<usize>,
    /// Newton settings for the implicit back-ends
    pub newton: NewtonConfig,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            samples_per_period: 1000,
            tolerances: Tolerances {
                abs: 1e-9,
                rel: 1e-6,
            },
            initial_step: None,
            max_step: None,
            min_step: 1e-15,
            max_samples: 5_000_000,
            max_rejections: 50,
            max_steps: None,
            newton: NewtonConfig::default(),
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if self.samples_per_period == 0 {
            return Err(SimError::InvalidArg {
                what: "samples_per_period must be at least 1",
            });
        }
        if !(self.tolerances.abs > 0.0 && self.tolerances.rel >= 0.0)
            || !self.tolerances.abs.is_finite()
            || !self.tolerances.rel.is_finite()
        {
            return Err(SimError::InvalidArg {
                what: "tolerances must be finite, abs > 0, rel >= 0",
            });
        }
        for step in [self.initial_step, self.max_step].into_iter().flatten() {
            if !step.is_finite() || step <= 0.0 {
                return Err(SimError::InvalidArg {
                    what: "step bounds must be positive",
                });
            }
        }
        if !self.min_step.is_finite() || self.min_step < 0.0 {
            return Err(SimError::InvalidArg {
                what: "min_step must be non-negative",
            });
        }
        if self.max_samples == 0 || self.max_rejections == 0 || self.max_steps == Some(0) {
            return Err(SimError::InvalidArg {
                what: "max_samples, max_rejections and max_steps must be positive",
            });
        }
        Ok(())
    }
}

/// Step counters of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    /// Constant-mode segments walked (adaptive back-ends only)
    pub segments: usize,
}

/// Record of simulation results, sampled on the grid.
#[derive(Clone, Debug)]
pub struct SimRecord {
    /// Time points (seconds)
    pub t: Vec<f64>,
    /// One column per state component, each `t.len()` long
    pub columns: Vec<Vec<f64>>,
    pub stats: SimStats,
}

impl SimRecord {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// State vector at sample `i`.
    pub fn state(&self, i: usize) -> Option<DVector<f64>> {
        if i >= self.len() {
            return None;
        }
        Some(DVector::from_iterator(
            self.columns.len(),
            self.columns.iter().map(|c| c[i]),
        ))
    }
}

/// Run a transient simulation sampled on `grid`.
///
/// Every back-end returns exactly `grid.len()` samples starting from the
/// model's initial state.
pub fn run_sim<M: TransientModel>(
    model: &M,
    grid: &TimeGrid,
    method: IntegrationMethod,
    opts: &SimOptions,
) -> SimResult<SimRecord> {
    opts.validate()?;
    if grid.len() > opts.max_samples {
        return Err(SimError::SampleLimit {
            requested: grid.len(),
            max: opts.max_samples,
        });
    }

    let _span = tracing::info_span!("run_sim", method = %method, samples = grid.len()).entered();

    let mut stats = SimStats::default();
    let columns = match method {
        IntegrationMethod::ForwardEuler => run_fixed(model, &ForwardEuler, grid, &mut stats)?,
        IntegrationMethod::Rk45 => run_adaptive(model, &mut Dopri5, grid, opts, &mut stats)?,
        IntegrationMethod::Bdf => {
            run_adaptive(model, &mut Bdf2::new(opts.newton), grid, opts, &mut stats)?
        }
        IntegrationMethod::Radau => {
            run_adaptive(model, &mut RadauIIA::new(opts.newton), grid, opts, &mut stats)?
        }
    };

    tracing::debug!(
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        segments = stats.segments,
        "simulation finished"
    );

    Ok(SimRecord {
        t: grid.times(),
        columns,
        stats,
    })
}

fn ensure_state_finite(x: &DVector<f64>, t: f64) -> SimResult<()> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SimError::NonFinite { what: "state", t })
    }
}

fn push_sample(columns: &mut [Vec<f64>], x: &DVector<f64>) {
    for (col, v) in columns.iter_mut().zip(x.iter()) {
        col.push(*v);
    }
}

/// Fixed-step driver: one integrator step per grid interval, mode taken at the
/// start of the step.
fn run_fixed<M: TransientModel, I: Integrator>(
    model: &M,
    integrator: &I,
    grid: &TimeGrid,
    stats: &mut SimStats,
) -> SimResult<Vec<Vec<f64>>> {
    let mut x = model.initial_state();
    ensure_state_finite(&x, 0.0)?;

    let mut columns = vec![Vec::with_capacity(grid.len()); x.len()];
    push_sample(&mut columns, &x);

    for i in 1..grid.len() {
        let t = grid.time(i - 1);
        x = integrator.step(model, model.mode_at(t), &x, grid.dt())?;
        ensure_state_finite(&x, grid.time(i))?;
        push_sample(&mut columns, &x);
        stats.accepted_steps += 1;
    }

    Ok(columns)
}

/// Step-size factor from a normalized error estimate.
fn step_factor(error: f64, order: usize) -> f64 {
    const SAFETY: f64 = 0.9;
    const MIN_FACTOR: f64 = 0.2;
    const MAX_FACTOR: f64 = 5.0;

    if error <= 0.0 {
        return MAX_FACTOR;
    }
    (SAFETY * error.powf(-1.0 / (order as f64 + 1.0))).clamp(MIN_FACTOR, MAX_FACTOR)
}

/// Cubic Hermite interpolation on `[t0, t0 + h]` at fraction `s`.
fn hermite(
    x0: &DVector<f64>,
    f0: &DVector<f64>,
    x1: &DVector<f64>,
    f1: &DVector<f64>,
    h: f64,
    s: f64,
) -> DVector<f64> {
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;
    x0 * h00 + f0 * (h10 * h) + x1 * h01 + f1 * (h11 * h)
}

/// Adaptive driver.
///
/// Walks the model's constant-mode segments so that no step crosses a
/// discontinuity; multistep history is reset at each boundary. Grid samples
/// inside an accepted step are filled by Hermite interpolation between its
/// end points.
fn run_adaptive<M: TransientModel, S: AdaptiveStepper>(
    model: &M,
    stepper: &mut S,
    grid: &TimeGrid,
    opts: &SimOptions,
    stats: &mut SimStats,
) -> SimResult<Vec<Vec<f64>>> {
    let mut x = model.initial_state();
    ensure_state_finite(&x, 0.0)?;

    let mut columns = vec![Vec::with_capacity(grid.len()); x.len()];
    push_sample(&mut columns, &x);
    let mut next = 1;

    let order = stepper.error_order();
    let max_step = opts.max_step.unwrap_or(f64::INFINITY);
    let mut h = opts.initial_step.unwrap_or(grid.dt()).min(max_step);
    let budget = |segments: usize| {
        opts.max_steps
            .unwrap_or(STEPS_PER_SAMPLE * grid.len() + STEPS_PER_SEGMENT * segments)
    };

    for seg in model.segments(grid.end()) {
        if seg.is_empty() {
            continue;
        }
        stats.segments += 1;
        stepper.reset();

        let mut t = seg.start;
        while t < seg.end {
            let remaining = seg.end - t;
            let mut step = h.min(max_step);
            // Absorb a leftover sliver into this step.
            if step * 1.01 >= remaining {
                step = remaining;
            }
            if step < opts.min_step && remaining > opts.min_step {
                return Err(SimError::StepSizeUnderflow { t, h: step });
            }

            let mut rejections = 0;
            let attempt = loop {
                let attempts = stats.accepted_steps + stats.rejected_steps;
                if attempts >= budget(stats.segments) {
                    return Err(SimError::ConvergenceFailed {
                        what: format!(
                            "step budget of {} attempts exhausted at t = {} s",
                            attempts, t
                        ),
                    });
                }

                let outcome = match stepper.attempt(model, seg.mode, &x, step, opts.tolerances) {
                    Ok(a) if a.x_new.iter().all(|v| v.is_finite()) => Some(a),
                    Ok(_) => None,
                    Err(SimError::ConvergenceFailed { .. }) => None,
                    Err(e) => return Err(e),
                };

                let shrink = match outcome {
                    Some(a) if a.error <= 1.0 => break a,
                    Some(a) => step_factor(a.error, order).min(0.9),
                    None => 0.25,
                };

                rejections += 1;
                stats.rejected_steps += 1;
                if rejections > opts.max_rejections {
                    return Err(SimError::ConvergenceFailed {
                        what: format!("{} consecutive step rejections at t = {} s", rejections, t),
                    });
                }
                step *= shrink;
                if step < opts.min_step && remaining > opts.min_step {
                    return Err(SimError::StepSizeUnderflow { t, h: step });
                }
            };

            let t_new = if step >= remaining { seg.end } else { t + step };
            let span = t_new - t;

            if next < grid.len() && grid.time(next) < t_new {
                let f0 = model.rhs(seg.mode, &x)?;
                let f1 = model.rhs(seg.mode, &attempt.x_new)?;
                while next < grid.len() && grid.time(next) < t_new {
                    let s = ((grid.time(next) - t) / span).clamp(0.0, 1.0);
                    let sample = hermite(&x, &f0, &attempt.x_new, &f1, span, s);
                    ensure_state_finite(&sample, grid.time(next))?;
                    push_sample(&mut columns, &sample);
                    next += 1;
                }
            }

            stepper.accept(&x, step);
            stats.accepted_steps += 1;
            h = step * step_factor(attempt.error, order);
            x = attempt.x_new;
            t = t_new;
        }
    }

    // Rounding can leave the last grid point at the very end of the span.
    while next < grid.len() {
        push_sample(&mut columns, &x);
        next += 1;
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Segment;

    /// dx/dt = -x
    struct Decay;

    impl TransientModel for Decay {
        type Mode = ();

        fn initial_state(&self) -> DVector<f64> {
            DVector::from_element(1, 1.0)
        }

        fn mode_at(&self, _t: f64) -> Self::Mode {}

        fn rhs(&self, _mode: (), x: &DVector<f64>) -> SimResult<DVector<f64>> {
            Ok(-x)
        }
    }

    /// dx/dt = +1 on [0, 0.5), -1 afterwards.
    struct Tent;

    impl TransientModel for Tent {
        type Mode = bool;

        fn initial_state(&self) -> DVector<f64> {
            DVector::from_element(1, 0.0)
        }

        fn mode_at(&self, t: f64) -> bool {
            t < 0.5
        }

        fn segments(&self, t_end: f64) -> impl Iterator<Item = Segment<bool>> {
            [
                Segment {
                    start: 0.0,
                    end: 0.5_f64.min(t_end),
                    mode: true,
                },
                Segment {
                    start: 0.5_f64.min(t_end),
                    end: t_end,
                    mode: false,
                },
            ]
            .into_iter()
        }

        fn rhs(&self, up: bool, _x: &DVector<f64>) -> SimResult<DVector<f64>> {
            Ok(DVector::from_element(1, if up { 1.0 } else { -1.0 }))
        }
    }

    /// Blows up in finite time: dx/dt = x^2 from x = 1.
    struct Blowup;

    impl TransientModel for Blowup {
        type Mode = ();

        fn initial_state(&self) -> DVector<f64> {
            DVector::from_element(1, 1.0)
        }

        fn mode_at(&self, _t: f64) -> Self::Mode {}

        fn rhs(&self, _mode: (), x: &DVector<f64>) -> SimResult<DVector<f64>> {
            Ok(x.map(|v| v * v))
        }
    }

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.samples_per_period, 1000);
        assert_eq!(opts.max_samples, 5_000_000);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn sim_options_invalid() {
        let opts = SimOptions {
            tolerances: Tolerances { abs: 0.0, rel: 0.0 },
            ..SimOptions::default()
        };
        assert!(matches!(opts.validate(), Err(SimError::InvalidArg { .. })));
    }

    #[test]
    fn method_names_round_trip() {
        for method in IntegrationMethod::ALL {
            assert_eq!(method.to_string().parse::<IntegrationMethod>(), Ok(method));
        }
        assert_eq!(
            "Euler".parse::<IntegrationMethod>(),
            Ok(IntegrationMethod::ForwardEuler)
        );
        assert!("lsoda".parse::<IntegrationMethod>().is_err());
    }

    #[test]
    fn euler_first_sample_is_initial_state() {
        let grid = TimeGrid::uniform(0.1, 1.0, 100).unwrap();
        let rec = run_sim(&Decay, &grid, IntegrationMethod::ForwardEuler, &SimOptions::default())
            .unwrap();
        assert_eq!(rec.len(), 10);
        assert_eq!(rec.columns[0][0], 1.0);
        assert!((rec.columns[0][1] - 0.9).abs() < 1e-15);
        assert!((rec.columns[0][9] - 0.9_f64.powi(9)).abs() < 1e-12);
    }

    #[test]
    fn adaptive_methods_sample_the_grid() {
        let grid = TimeGrid::uniform(0.01, 2.0, 1000).unwrap();
        for method in [
            IntegrationMethod::Rk45,
            IntegrationMethod::Bdf,
            IntegrationMethod::Radau,
        ] {
            let rec = run_sim(&Decay, &grid, method, &SimOptions::default()).unwrap();
            assert_eq!(rec.len(), grid.len());
            assert_eq!(rec.columns[0].len(), grid.len());
            for (t, x) in rec.t.iter().zip(&rec.columns[0]) {
                assert!((x - (-t).exp()).abs() < 1e-4, "{method} at t = {t}: {x}");
            }
        }
    }

    #[test]
    fn adaptive_steps_stop_at_mode_changes() {
        let grid = TimeGrid::uniform(0.01, 1.0, 1000).unwrap();
        for method in [IntegrationMethod::Rk45, IntegrationMethod::Radau] {
            let rec = run_sim(&Tent, &grid, method, &SimOptions::default()).unwrap();
            assert_eq!(rec.stats.segments, 2);
            let peak = rec.columns[0].iter().cloned().fold(f64::MIN, f64::max);
            assert!((peak - 0.5).abs() < 1e-9, "{method}: peak {peak}");
            let last = rec.columns[0][rec.len() - 1];
            assert!((last - 0.01).abs() < 1e-9, "{method}: last {last}");
        }
    }

    #[test]
    fn euler_blowup_is_reported_as_non_finite() {
        let grid = TimeGrid::uniform(0.5, 200.0, 1000).unwrap();
        let err = run_sim(&Blowup, &grid, IntegrationMethod::ForwardEuler, &SimOptions::default())
            .unwrap_err();
        assert!(matches!(err, SimError::NonFinite { .. }));
        assert!(err.is_divergence());
    }

    #[test]
    fn adaptive_blowup_is_a_divergence() {
        // The exact solution 1/(1-t) is singular at t = 1.
        let grid = TimeGrid::uniform(0.01, 2.0, 1000).unwrap();
        let err = run_sim(&Blowup, &grid, IntegrationMethod::Rk45, &SimOptions::default())
            .unwrap_err();
        assert!(err.is_divergence(), "{err:?}");
    }

    #[test]
    fn sample_cap_is_checked_before_running() {
        let grid = TimeGrid::uniform(0.01, 1.0, 1000).unwrap();
        let opts = SimOptions {
            max_samples: 10,
            ..SimOptions::default()
        };
        let err = run_sim(&Decay, &grid, IntegrationMethod::Rk45, &opts).unwrap_err();
        assert!(matches!(err, SimError::SampleLimit { .. }));
    }

    #[test]
    fn adaptive_run_stops_at_step_budget() {
        let grid = TimeGrid::uniform(0.01, 1.0, 1000).unwrap();
        let opts = SimOptions {
            max_steps: Some(5),
            initial_step: Some(1e-3),
            max_step: Some(1e-3),
            ..SimOptions::default()
        };
        for method in [
            IntegrationMethod::Rk45,
            IntegrationMethod::Bdf,
            IntegrationMethod::Radau,
        ] {
            let err = run_sim(&Decay, &grid, method, &opts).unwrap_err();
            assert!(matches!(err, SimError::ConvergenceFailed { .. }), "{method}: {err:?}");
            assert!(err.is_divergence());
        }

        // The derived budget leaves plenty of room for a smooth problem.
        let rec = run_sim(&Decay, &grid, IntegrationMethod::Rk45, &SimOptions::default()).unwrap();
        let attempts = rec.stats.accepted_steps + rec.stats.rejected_steps;
        assert!(attempts < STEPS_PER_SAMPLE * grid.len());
    }

    #[test]
    fn zero_step_budget_is_rejected() {
        let opts = SimOptions {
            max_steps: Some(0),
            ..SimOptions::default()
        };
        assert!(matches!(opts.validate(), Err(SimError::InvalidArg { .. })));
    }

    #[test]
    fn hermite_reproduces_cubic_end_points() {
        let x0 = DVector::from_element(1, 1.0);
        let x1 = DVector::from_element(1, 2.0);
        let f = DVector::from_element(1, 0.0);
        assert_eq!(hermite(&x0, &f, &x1, &f, 1.0, 0.0)[0], 1.0);
        assert_eq!(hermite(&x0, &f, &x1, &f, 1.0, 1.0)[0], 2.0);
        assert!((hermite(&x0, &f, &x1, &f, 1.0, 0.5)[0] - 1.5).abs() < 1e-15);
    }
}
