//! Side-by-side runs of several integration methods.

use bk_core::relative_difference;
use bk_sim::IntegrationMethod;
use rayon::prelude::*;

use crate::context::{SimulationInputs, recompute};
use crate::error::AppResult;
use crate::summary::RunSummary;

/// Outcome for one method.
#[derive(Debug)]
pub struct MethodRun {
    pub method: IntegrationMethod,
    pub elapsed_s: f64,
    pub result: AppResult<RunSummary>,
}

/// Final-sample deviation of one method from a reference run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    pub method: IntegrationMethod,
    pub inductor_current: f64,
    pub capacitor_voltage: f64,
}

/// Run `inputs` once per method, in parallel, each with its own inputs copy.
///
/// Results come back in the order of `methods`.
pub fn compare_methods(inputs: &SimulationInputs, methods: &[IntegrationMethod]) -> Vec<MethodRun> {
    tracing::info!(
        methods = methods.len(),
        threads = rayon::current_num_threads(),
        "comparing integration methods"
    );

    methods
        .par_iter()
        .map(|&method| {
            let run_inputs = SimulationInputs {
                method,
                ..inputs.clone()
            };
            let started = std::time::Instant::now();
            let result = recompute(&run_inputs).map(|r| RunSummary::from_results(&r));
            MethodRun {
                method,
                elapsed_s: started.elapsed().as_secs_f64(),
                result,
            }
        })
        .collect()
}

/// Relative final-sample deviation of every successful run from `reference`.
///
/// Empty if the reference run is missing or failed.
pub fn deviations_from(runs: &[MethodRun], reference: IntegrationMethod) -> Vec<Deviation> {
    let Some(base) = runs
        .iter()
        .find(|r| r.method == reference)
        .and_then(|r| r.result.as_ref().ok())
        .and_then(|s| s.final_state)
    else {
        return Vec::new();
    };

    runs.iter()
        .filter(|r| r.method != reference)
        .filter_map(|r| {
            let last = r.result.as_ref().ok()?.final_state?;
            Some(Deviation {
                method: r.method,
                inductor_current: relative_difference(last.inductor_current, base.inductor_current),
                capacitor_voltage: relative_difference(
                    last.capacitor_voltage,
                    base.capacitor_voltage,
                ),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_methods_agree_within_five_percent() {
        let inputs = SimulationInputs {
            duration: 2.0e-3,
            ..SimulationInputs::default()
        };
        let runs = compare_methods(&inputs, &IntegrationMethod::ALL);
        assert_eq!(runs.len(), 4);
        for (run, method) in runs.iter().zip(IntegrationMethod::ALL) {
            assert_eq!(run.method, method);
            assert!(run.result.is_ok(), "{method}: {:?}", run.result);
        }

        let devs = deviations_from(&runs, IntegrationMethod::ForwardEuler);
        assert_eq!(devs.len(), 3);
        for d in devs {
            assert!(d.inductor_current < 0.05, "{d:?}");
            assert!(d.capacitor_voltage < 0.05, "{d:?}");
        }
    }

    #[test]
    fn failed_reference_gives_no_deviations() {
        let inputs = SimulationInputs {
            duration: -1.0,
            ..SimulationInputs::default()
        };
        let runs = compare_methods(&inputs, &IntegrationMethod::ALL);
        assert!(runs.iter().all(|r| r.result.is_err()));
        assert!(deviations_from(&runs, IntegrationMethod::ForwardEuler).is_empty());
    }
}
