use bk_app::{
    AppError, AppResult, ParameterSource, RunSummary, SimulationContext, compare_methods,
    deviations_from, inputs_from_project, load_project, save_project,
};
use bk_design::{check_ripples, synthesize};
use bk_project::Project;
use bk_sim::{IntegrationMethod, Trajectory};
use clap::{Parser, Subcommand};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bk-cli")]
#[command(about = "Buck converter sizing and transient simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a project file with the default design
    Init {
        /// Output path (.yaml, .yml or .json)
        project_path: PathBuf,
        /// Project name
        #[arg(long, default_value = "buck")]
        name: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate project file syntax and values
    Validate {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Print component values, expected ripple and output bounds
    Design {
        /// Path to the project file (defaults to the built-in design)
        project_path: Option<PathBuf>,
    },
    /// Run a transient simulation
    Simulate {
        /// Path to the project file
        project_path: PathBuf,
        /// Integration method (forward_euler, rk45, bdf, radau)
        #[arg(long)]
        method: Option<IntegrationMethod>,
        /// Simulated time in seconds
        #[arg(long)]
        duration: Option<f64>,
        /// Write all waveforms to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run every integration method and compare final samples
    Compare {
        /// Path to the project file
        project_path: PathBuf,
        /// Simulated time in seconds
        #[arg(long)]
        duration: Option<f64>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            project_path,
            name,
            force,
        } => cmd_init(&project_path, &name, force),
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Design { project_path } => cmd_design(project_path.as_deref()),
        Commands::Simulate {
            project_path,
            method,
            duration,
            csv,
            json,
        } => cmd_simulate(&project_path, method, duration, csv.as_deref(), json),
        Commands::Compare {
            project_path,
            duration,
        } => cmd_compare(&project_path, duration),
    }
}

fn cmd_init(project_path: &Path, name: &str, force: bool) -> AppResult<()> {
    if project_path.exists() && !force {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists (use --force)", project_path.display()),
        )));
    }
    save_project(project_path, &Project::new(name))?;
    println!("✓ Wrote {}", project_path.display());
    Ok(())
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    load_project(project_path)?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_design(project_path: Option<&Path>) -> AppResult<()> {
    let project = match project_path {
        Some(path) => load_project(path)?,
        None => Project::new("default"),
    };
    let inputs = inputs_from_project(&project)?;
    let (params, source) = match inputs.source {
        ParameterSource::Manual(params) => (params, "manual"),
        ParameterSource::Synthesized => (synthesize(&inputs.spec)?, "synthesized"),
    };
    let ripple = check_ripples(&inputs.spec, &params);
    let bounds = inputs.spec.output_bounds();

    println!("Design: {}", project.name);
    println!("  Source:        {}", source);
    println!("  Frequency:     {:.1} Hz", params.frequency());
    println!("  Period:        {:.4e} s", params.period);
    println!("  t_on / t_off:  {:.4e} s / {:.4e} s", params.t_on, params.t_off);
    println!("  Duty cycle:    {:.4}", params.duty_cycle());
    println!("  R:             {:.4} Ω", params.resistance);
    println!("  L:             {:.4e} H", params.inductance);
    println!("  C:             {:.4e} F", params.capacitance);
    println!(
        "  ΔI_L:          {:.4} A",
        ripple.inductor_ripple_current().value
    );
    println!("  ΔU_out:        {:.4} V", ripple.output_ripple_voltage().value);
    println!("  f_cutoff:      {:.1} Hz", ripple.cutoff().value);
    println!(
        "  U_out range:   {:.3} V .. {:.3} V (duty {} .. {})",
        bounds.min, bounds.max, inputs.spec.duty_min, inputs.spec.duty_max
    );
    Ok(())
}

fn cmd_simulate(
    project_path: &Path,
    method: Option<IntegrationMethod>,
    duration: Option<f64>,
    csv: Option<&Path>,
    json: bool,
) -> AppResult<()> {
    let project = load_project(project_path)?;
    tracing::info!(project = %project.name, path = %project_path.display(), "loaded project");
    let mut inputs = inputs_from_project(&project)?;
    if let Some(method) = method {
        inputs.method = method;
    }
    if let Some(duration) = duration {
        inputs.duration = duration;
    }

    let mut ctx = SimulationContext::new(inputs);
    let results = ctx.recompute()?;
    let summary = RunSummary::from_results(results);

    if let Some(path) = csv {
        write_csv(path, &results.trajectory)?;
        eprintln!(
            "✓ Exported {} samples to {}",
            results.trajectory.len(),
            path.display()
        );
    }

    if json {
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| AppError::Io(io::Error::other(e)))?;
        println!("{}", text);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn cmd_compare(project_path: &Path, duration: Option<f64>) -> AppResult<()> {
    let project = load_project(project_path)?;
    let mut inputs = inputs_from_project(&project)?;
    if let Some(duration) = duration {
        inputs.duration = duration;
    }

    let runs = compare_methods(&inputs, &IntegrationMethod::ALL);

    println!(
        "{:<14} {:>10} {:>12} {:>12} {:>9} {:>9}",
        "method", "time [s]", "I_L [A]", "U_C [V]", "steps", "rejected"
    );
    for run in &runs {
        match &run.result {
            Ok(summary) => {
                let (i_l, u_c) = summary
                    .final_state
                    .map_or((f64::NAN, f64::NAN), |s| {
                        (s.inductor_current, s.capacitor_voltage)
                    });
                println!(
                    "{:<14} {:>10.3} {:>12.6} {:>12.6} {:>9} {:>9}",
                    run.method,
                    run.elapsed_s,
                    i_l,
                    u_c,
                    summary.stats.accepted_steps,
                    summary.stats.rejected_steps
                );
            }
            Err(e) => println!("{:<14} failed: {}", run.method, e),
        }
    }

    let deviations = deviations_from(&runs, IntegrationMethod::ForwardEuler);
    if !deviations.is_empty() {
        println!();
        println!("Relative deviation from {}:", IntegrationMethod::ForwardEuler);
        for d in deviations {
            println!(
                "  {:<12} I_L {:.3e}  U_C {:.3e}",
                d.method, d.inductor_current, d.capacitor_voltage
            );
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "✓ Simulation completed: {} samples with {}",
        summary.samples, summary.method
    );
    if summary.method.is_adaptive() {
        println!(
            "  Steps:         {} accepted, {} rejected",
            summary.stats.accepted_steps, summary.stats.rejected_steps
        );
    }
    if let Some(last) = summary.final_state {
        println!(
            "  Final:         t = {:.4e} s, I_L = {:.4} A, U_C = {:.4} V",
            last.time, last.inductor_current, last.capacitor_voltage
        );
    }
    println!(
        "  Expected:      ΔI_L = {:.4} A, ΔU_out = {:.4} V, f_c = {:.1} Hz",
        summary.expected_ripple.inductor_ripple,
        summary.expected_ripple.output_ripple,
        summary.expected_ripple.cutoff_frequency
    );
    if let Some(m) = summary.measured_ripple {
        println!(
            "  Last period:   ΔI_L = {:.4} A, ΔU_C = {:.4} V",
            m.inductor_current, m.capacitor_voltage
        );
    }
    match summary.settling.settling_time {
        Some(t) => println!(
            "  Settling:      {:.4e} s (±{:.1}% band)",
            t,
            summary.settling.band * 100.0
        ),
        None => println!(
            "  Settling:      not settled (±{:.1}% band)",
            summary.settling.band * 100.0
        ),
    }
    let est = summary.settling.estimates;
    println!(
        "  Estimates:     ζ = {:.3}, ω_n = {:.1} rad/s, envelope {:.4e} s, 5/ω_n {:.4e} s",
        est.damping_ratio, est.natural_frequency, est.envelope, est.undamped
    );
}

fn write_csv(path: &Path, trajectory: &Trajectory) -> AppResult<()> {
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(std::fs::File::create(path)?);
        writeln!(out, "{}", Trajectory::COLUMN_NAMES.join(","))?;
        let columns = trajectory.columns();
        for i in 0..trajectory.len() {
            let row: Vec<String> = columns.iter().map(|c| c[i].to_string()).collect();
            writeln!(out, "{}", row.join(","))?;
        }
        out.flush()
    };
    write().map_err(|source| AppError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}
