//! High-level solver interface.

use crate::error::{SolverError, SolverResult};
use crate::initialization::{InitialGuess, seed_reservoirs};
use crate::jacobian::{JacobianMode, central_difference_jacobian, finite_difference_jacobian};
use crate::newton::{NewtonConfig, newton_solve};
use crate::problem::{EquilibriumProblem, ResidualForm};
use crate::solution::EquilibriumSolution;
use ma_core::Real;
use ma_model::{ChemModel, Constraint, ConstraintSweep, Reaction};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

/// Everything that controls one solve.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolverConfig {
    pub newton: NewtonConfig,
    pub residual_form: ResidualForm,
    pub jacobian: JacobianMode,
    pub initial_guess: InitialGuess,
}

/// Solve an assembled problem from the configured initial guess.
pub fn solve(
    problem: &EquilibriumProblem,
    config: &SolverConfig,
) -> SolverResult<EquilibriumSolution> {
    let x0 = config.initial_guess.build(problem)?;
    solve_from(problem, config, x0)
}

/// Solve an assembled problem from an explicit starting vector.
pub fn solve_from(
    problem: &EquilibriumProblem,
    config: &SolverConfig,
    x0: DVector<Real>,
) -> SolverResult<EquilibriumSolution> {
    if problem.num_species() == 0 {
        return Ok(EquilibriumSolution {
            model: problem.model(),
            ln_concentrations: Vec::new(),
            residual_norm: 0.0,
            iterations: 0,
        });
    }

    let form = config.residual_form;
    let residual_fn = |x: &DVector<Real>| -> SolverResult<DVector<Real>> {
        problem.residual(x, form)
    };
    let scale_fn = |x: &DVector<Real>| -> SolverResult<DVector<Real>> {
        problem.residual_scales(x, form)
    };
    let jacobian_fn = |x: &DVector<Real>| -> SolverResult<DMatrix<Real>> {
        match config.jacobian {
            JacobianMode::Analytic => problem.jacobian(x, form),
            JacobianMode::FiniteDifference { epsilon } => {
                finite_difference_jacobian(x, &residual_fn, epsilon)
            }
            JacobianMode::CentralDifference { epsilon } => {
                central_difference_jacobian(x, &residual_fn, epsilon)
            }
        }
    };

    debug!(
        form = form.as_str(),
        guess = config.initial_guess.as_str(),
        "starting newton iteration"
    );
    let result = newton_solve(x0, &residual_fn, scale_fn, jacobian_fn, &config.newton)?;

    if let Some(bad) = result.x.iter().position(|v| !v.is_finite()) {
        return Err(SolverError::ConvergenceFailed {
            what: format!("non-finite ln-concentration for species index {}", bad),
        });
    }

    Ok(EquilibriumSolution {
        model: problem.model(),
        ln_concentrations: result.x.iter().copied().collect(),
        residual_norm: result.residual_norm,
        iterations: result.iterations,
    })
}

/// Solve once per sweep point.
///
/// Every sweep contributes its `i`-th target at point `i`; all sweeps must
/// have the same length. The sweep constraints are appended after the fixed
/// ones. Points after the first start from the previous solution.
pub fn solve_sweep(
    model: &ChemModel,
    reactions: &[Reaction],
    ln_k: &[Real],
    constraints: &[Constraint],
    sweeps: &[ConstraintSweep],
    config: &SolverConfig,
) -> SolverResult<Vec<EquilibriumSolution>> {
    let points = match sweeps.first() {
        Some(first) => first.len(),
        None => {
            return Err(SolverError::Dimension {
                what: "a sweep needs at least one swept constraint".to_string(),
            });
        }
    };
    if let Some(odd) = sweeps.iter().find(|s| s.len() != points) {
        return Err(SolverError::Dimension {
            what: format!(
                "sweeps have different lengths ({} and {})",
                points,
                odd.len()
            ),
        });
    }
    for s in sweeps {
        model.ensure_owns(s.model())?;
    }

    info!(points, sweeps = sweeps.len(), "solving constraint sweep");
    let mut solutions: Vec<EquilibriumSolution> = Vec::with_capacity(points);
    for index in 0..points {
        let point = solve_sweep_point(
            model,
            reactions,
            ln_k,
            constraints,
            sweeps,
            config,
            index,
            solutions.last(),
        )
        .map_err(|source| {
            warn!(index, error = %source, "sweep point failed");
            SolverError::SweepPoint {
                index,
                source: Box::new(source),
            }
        })?;
        debug!(index, iterations = point.iterations, "sweep point solved");
        solutions.push(point);
    }
    Ok(solutions)
}

#[allow(clippy::too_many_arguments)]
fn solve_sweep_point(
    model: &ChemModel,
    reactions: &[Reaction],
    ln_k: &[Real],
    constraints: &[Constraint],
    sweeps: &[ConstraintSweep],
    config: &SolverConfig,
    index: usize,
    previous: Option<&EquilibriumSolution>,
) -> SolverResult<EquilibriumSolution> {
    let mut all = constraints.to_vec();
    for s in sweeps {
        let c = s.at(index).ok_or_else(|| SolverError::Dimension {
            what: format!("sweep has no point {}", index),
        })?;
        all.push(c);
    }
    let problem = EquilibriumProblem::new(model, reactions, ln_k, &all)?;

    match previous {
        Some(prev) => {
            let mut x0 = DVector::from_column_slice(&prev.ln_concentrations);
            if config.initial_guess.seeds_reservoirs() {
                seed_reservoirs(&problem, &mut x0);
            }
            solve_from(&problem, config, x0)
        }
        None => solve(&problem, config),
    }
}

/// Solving directly on a model.
pub trait EquilibriumSolve {
    /// ln(c) per species with the default configuration.
    fn solve(
        &self,
        reactions: &[Reaction],
        ln_k: &[Real],
        constraints: &[Constraint],
    ) -> SolverResult<Vec<Real>>;

    fn solve_with(
        &self,
        reactions: &[Reaction],
        ln_k: &[Real],
        constraints: &[Constraint],
        config: &SolverConfig,
    ) -> SolverResult<EquilibriumSolution>;

    fn solve_sweep(
        &self,
        reactions: &[Reaction],
        ln_k: &[Real],
        constraints: &[Constraint],
        sweeps: &[ConstraintSweep],
        config: &SolverConfig,
    ) -> SolverResult<Vec<EquilibriumSolution>>;
}

impl EquilibriumSolve for ChemModel {
    fn solve(
        &self,
        reactions: &[Reaction],
        ln_k: &[Real],
        constraints: &[Constraint],
    ) -> SolverResult<Vec<Real>> {
        self.solve_with(reactions, ln_k, constraints, &SolverConfig::default())
            .map(EquilibriumSolution::into_vec)
    }

    fn solve_with(
        &self,
        reactions: &[Reaction],
        ln_k: &[Real],
        constraints: &[Constraint],
        config: &SolverConfig,
    ) -> SolverResult<EquilibriumSolution> {
        let problem = EquilibriumProblem::new(self, reactions, ln_k, constraints)?;
        solve(&problem, config)
    }

    fn solve_sweep(
        &self,
        reactions: &[Reaction],
        ln_k: &[Real],
        constraints: &[Constraint],
        sweeps: &[ConstraintSweep],
        config: &SolverConfig,
    ) -> SolverResult<Vec<EquilibriumSolution>> {
        solve_sweep(self, reactions, ln_k, constraints, sweeps, config)
    }
}
