//! Turn a validated problem file into solver inputs.

use crate::schema::{InitialGuessDef, ProblemDef, ResidualFormDef, SolverDef, TargetDef, TermsDef};
use crate::{ProjectError, ProjectResult};
use ma_core::Real;
use ma_model::{ChemModel, Constraint, ConstraintSweep, LinearExpr, Reaction};
use ma_solver::{
    EquilibriumSolution, EquilibriumSolve, InitialGuess, NewtonConfig, ResidualForm,
    SolverConfig, SolverResult,
};

/// Everything needed to run the solver on one problem file.
#[derive(Debug, Clone)]
pub struct CompiledProblem {
    pub name: String,
    pub model: ChemModel,
    pub reactions: Vec<Reaction>,
    pub ln_k: Vec<Real>,
    pub constraints: Vec<Constraint>,
    pub sweeps: Vec<ConstraintSweep>,
    pub config: SolverConfig,
}

impl CompiledProblem {
    pub fn is_sweep(&self) -> bool {
        !self.sweeps.is_empty()
    }

    /// One solution, or one per sweep point.
    pub fn solve(&self) -> SolverResult<Vec<EquilibriumSolution>> {
        if self.is_sweep() {
            self.model.solve_sweep(
                &self.reactions,
                &self.ln_k,
                &self.constraints,
                &self.sweeps,
                &self.config,
            )
        } else {
            self.model
                .solve_with(&self.reactions, &self.ln_k, &self.constraints, &self.config)
                .map(|solution| vec![solution])
        }
    }
}

pub fn compile(problem: &ProblemDef) -> ProjectResult<CompiledProblem> {
    let model = ChemModel::with_names(problem.species.iter().cloned())?;

    let mut reactions = Vec::with_capacity(problem.reactions.len());
    let mut ln_k = Vec::with_capacity(problem.reactions.len());
    for (i, def) in problem.reactions.iter().enumerate() {
        let reactants = expression(&model, &def.reactants)?;
        let products = expression(&model, &def.products)?;
        reactions.push(Reaction::new(reactants, products)?);
        ln_k.push(def.resolved_ln_k().ok_or_else(|| ProjectError::Compile {
            what: format!("reaction {} has no unambiguous equilibrium constant", i),
        })?);
    }

    let mut constraints = Vec::new();
    let mut sweeps = Vec::new();
    for (i, def) in problem.constraints.iter().enumerate() {
        let expr = expression(&model, &def.terms)?;
        match def.target() {
            Some(TargetDef::Fixed(value)) => constraints.push(Constraint::new(expr, value)?),
            Some(TargetDef::Swept(values)) => sweeps.push(ConstraintSweep::new(expr, values)?),
            None => {
                return Err(ProjectError::Compile {
                    what: format!("constraint {} has no unambiguous target", i),
                });
            }
        }
    }

    let config = solver_config(problem.solver.as_ref());

    Ok(CompiledProblem {
        name: problem.name.clone(),
        model,
        reactions,
        ln_k,
        constraints,
        sweeps,
        config,
    })
}

fn expression(model: &ChemModel, terms: &TermsDef) -> ProjectResult<LinearExpr> {
    let mut expr = LinearExpr::nil();
    for (name, coef) in terms {
        let species = model
            .species_by_name(name)
            .ok_or_else(|| ProjectError::Compile {
                what: format!("unknown species '{}'", name),
            })?;
        expr = expr + *coef * species;
    }
    Ok(expr)
}

fn solver_config(def: Option<&SolverDef>) -> SolverConfig {
    let Some(def) = def else {
        return SolverConfig::default();
    };

    let mut newton = NewtonConfig::default();
    if let Some(max_iterations) = def.max_iterations {
        newton.max_iterations = max_iterations;
    }
    if let Some(abs_tol) = def.abs_tol {
        newton.abs_tol = abs_tol;
    }
    if let Some(rel_tol) = def.rel_tol {
        newton.rel_tol = rel_tol;
    }
    if let Some(min_step) = def.min_step {
        newton.min_step = min_step;
    }
    newton.max_step = def.max_step;

    let residual_form = match def.residual_form {
        ResidualFormDef::Linear => ResidualForm::Linear,
        ResidualFormDef::LogRatio => ResidualForm::LogRatio,
    };
    let initial_guess = match def.initial_guess {
        InitialGuessDef::Zeros => InitialGuess::Zeros,
        InitialGuessDef::Reservoir => InitialGuess::ReservoirSeeded,
        InitialGuessDef::Provided => {
            InitialGuess::Provided(def.initial_ln_concentrations.clone().unwrap_or_default())
        }
    };

    SolverConfig {
        newton,
        residual_form,
        initial_guess,
        ..SolverConfig::default()
    }
}
