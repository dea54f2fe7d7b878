//! Smoke test for the bk-app service layer.

use bk_app::{
    ErrorKind, RunSummary, SimulationContext, inputs_from_project, load_project,
    project_from_inputs, save_project,
};
use bk_design::{DerivedParameters, DesignSpec};
use bk_sim::IntegrationMethod;

#[test]
fn project_file_drives_a_recompute() {
    let path = std::env::temp_dir().join("bk_app_smoke_project.yaml");
    let mut project = bk_project::Project::new("Smoke");
    project.simulation.duration_s = 2.0e-3;
    project.simulation.method = IntegrationMethod::Rk45;
    save_project(&path, &project).unwrap();

    let loaded = load_project(&path).unwrap();
    let mut ctx = SimulationContext::new(inputs_from_project(&loaded).unwrap());
    let results = ctx.recompute().unwrap();

    let summary = RunSummary::from_results(results);
    assert_eq!(summary.method, IntegrationMethod::Rk45);
    assert_eq!(summary.samples, 20_000);
    assert!(summary.final_state.is_some());
    assert!(summary.measured_ripple.is_some());

    let again = project_from_inputs("Smoke", ctx.inputs());
    assert_eq!(again, loaded);
}

#[test]
fn failed_recompute_leaves_previous_trajectory_intact() {
    let mut ctx = SimulationContext::default();
    ctx.set_duration(1.0e-3).unwrap();
    let before = ctx.trajectory().cloned().unwrap();

    // Unreachable output voltage.
    let infeasible = DesignSpec {
        input_voltage: 9.0,
        ..DesignSpec::default()
    };
    assert_eq!(
        ctx.set_spec(infeasible).unwrap_err().kind(),
        ErrorKind::InfeasibleDesign
    );
    assert_eq!(ctx.trajectory(), Some(&before));

    // Numerically unstable for the explicit method.
    let stiff = DerivedParameters::manual(5e-5, 5e-5, 9.0, 1e-9, 1e-9).unwrap();
    assert_eq!(
        ctx.set_manual_parameters(stiff).unwrap_err().kind(),
        ErrorKind::SimulationDivergence
    );
    assert_eq!(ctx.trajectory(), Some(&before));
    assert!(!ctx.is_manual());

    // Too many samples.
    assert_eq!(
        ctx.set_duration(1.0e3).unwrap_err().kind(),
        ErrorKind::InvalidParameter
    );
    assert_eq!(ctx.trajectory(), Some(&before));
}

#[test]
fn steady_state_ripple_is_close_to_design() {
    let mut ctx = SimulationContext::default();
    let results = ctx.set_duration(0.02).unwrap();
    let summary = RunSummary::from_results(results);

    let measured = summary.measured_ripple.unwrap();
    let expected = summary.expected_ripple;
    assert!(
        (measured.inductor_current - expected.inductor_ripple).abs()
            < 0.2 * expected.inductor_ripple,
        "{measured:?} vs {expected:?}"
    );
    let last = summary.final_state.unwrap();
    assert!((last.capacitor_voltage - 9.0).abs() < 0.5, "{last:?}");
    assert!(summary.settling.settling_time.is_some());
}
