use clap::{Parser, Subcommand};
use ma_model::ChemModel;
use ma_project::{CompiledProblem, ProblemDef};
use ma_solver::EquilibriumSolution;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ma-cli")]
#[command(about = "massaction CLI - chemical equilibrium solver", long_about = None)]
struct Cli {
    /// Log solver progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate problem file syntax and structure
    Validate {
        /// Path to the problem YAML or JSON file
        problem_path: PathBuf,
    },
    /// List species in a problem
    Species {
        /// Path to the problem YAML or JSON file
        problem_path: PathBuf,
    },
    /// Solve for equilibrium concentrations
    Solve {
        /// Path to the problem YAML or JSON file
        problem_path: PathBuf,
        /// Print a JSON report instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Project error: {0}")]
    Project(#[from] ma_project::ProjectError),

    #[error("Solver error: {0}")]
    Solver(#[from] ma_solver::SolverError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { problem_path } => cmd_validate(&problem_path),
        Commands::Species { problem_path } => cmd_species(&problem_path),
        Commands::Solve { problem_path, json } => cmd_solve(&problem_path, json),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_validate(problem_path: &Path) -> CliResult<()> {
    println!("Validating problem: {}", problem_path.display());
    let problem = ma_project::load(problem_path)?;
    let compiled = ma_project::compile(&problem)?;
    println!("✓ Problem is valid");
    print_summary(&problem, &compiled);

    let equations = compiled.reactions.len() + compiled.constraints.len() + compiled.sweeps.len();
    let species = compiled.model.num_species();
    if equations != species {
        println!(
            "  warning: {} equations for {} species; solve will fail",
            equations, species
        );
    }
    Ok(())
}

fn print_summary(problem: &ProblemDef, compiled: &CompiledProblem) {
    println!("  Name: {}", problem.name);
    println!("  Species: {}", compiled.model.num_species());
    println!("  Reactions: {}", compiled.reactions.len());
    println!("  Constraints: {}", compiled.constraints.len());
    if compiled.is_sweep() {
        let points = compiled.sweeps.first().map(|s| s.len()).unwrap_or(0);
        println!(
            "  Sweeps: {} ({} points)",
            compiled.sweeps.len(),
            points
        );
    }
}

fn cmd_species(problem_path: &Path) -> CliResult<()> {
    let problem = ma_project::load(problem_path)?;
    if problem.species.is_empty() {
        println!("No species found in problem");
    } else {
        println!("Species in problem:");
        for (i, name) in problem.species.iter().enumerate() {
            println!("  {:>3}  {}", i, name);
        }
    }
    Ok(())
}

fn cmd_solve(problem_path: &Path, json: bool) -> CliResult<()> {
    let problem = ma_project::load(problem_path)?;
    let compiled = ma_project::compile(&problem)?;

    let start = Instant::now();
    let solutions = compiled.solve()?;
    let elapsed = start.elapsed();
    info!(
        points = solutions.len(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "solve finished"
    );

    if json {
        let report = SolveReport::new(&compiled, &solutions);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Solved: {}", problem.name);
    for (i, solution) in solutions.iter().enumerate() {
        if compiled.is_sweep() {
            let targets: Vec<String> = sweep_targets(&compiled, i)
                .iter()
                .map(|t| format!("{:.3e}", t))
                .collect();
            println!("Point {} (targets {}):", i, targets.join(", "));
        }
        print_solution(&compiled.model, solution);
    }
    println!("  Time: {:.3} ms", elapsed.as_secs_f64() * 1000.0);
    Ok(())
}

fn print_solution(model: &ChemModel, solution: &EquilibriumSolution) {
    println!(
        "  {} iterations, residual {:.3e}",
        solution.iterations, solution.residual_norm
    );
    println!("  {:<12} {:>14} {:>14}", "species", "ln(c)", "c");
    for species in model.species() {
        let ln_c = solution.ln_concentration(species).unwrap_or(f64::NAN);
        let c = solution.concentration(species).unwrap_or(f64::NAN);
        println!("  {:<12} {:>14.6} {:>14.6e}", model.label(species), ln_c, c);
    }
}

fn sweep_targets(compiled: &CompiledProblem, index: usize) -> Vec<f64> {
    compiled
        .sweeps
        .iter()
        .filter_map(|s| s.targets().get(index).copied())
        .collect()
}

#[derive(Serialize)]
struct SolveReport {
    name: String,
    species: Vec<String>,
    points: Vec<PointReport>,
}

#[derive(Serialize)]
struct PointReport {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sweep_targets: Vec<f64>,
    iterations: usize,
    residual_norm: f64,
    ln_concentrations: Vec<f64>,
    concentrations: Vec<f64>,
}

impl SolveReport {
    fn new(compiled: &CompiledProblem, solutions: &[EquilibriumSolution]) -> Self {
        let species = compiled
            .model
            .species()
            .into_iter()
            .map(|s| compiled.model.label(s))
            .collect();
        let points = solutions
            .iter()
            .enumerate()
            .map(|(i, solution)| PointReport {
                sweep_targets: sweep_targets(compiled, i),
                iterations: solution.iterations,
                residual_norm: solution.residual_norm,
                ln_concentrations: solution.ln_concentrations.clone(),
                concentrations: solution.concentrations(),
            })
            .collect();
        Self {
            name: compiled.name.clone(),
            species,
            points,
        }
    }
}
