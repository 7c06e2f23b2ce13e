//! Problem file validation logic.

use crate::schema::{ConstraintDef, InitialGuessDef, ProblemDef, ReactionDef, SolverDef, TermsDef};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_problem(problem: &ProblemDef) -> Result<(), ValidationError> {
    if problem.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: problem.version,
        });
    }

    let mut species = HashSet::new();
    for name in &problem.species {
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "species".to_string(),
                value: format!("'{}'", name),
                reason: "species names must not be empty".to_string(),
            });
        }
        if !species.insert(name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: name.clone(),
                context: "species".to_string(),
            });
        }
    }

    for (i, reaction) in problem.reactions.iter().enumerate() {
        validate_reaction(reaction, i, &species)?;
    }
    for (i, constraint) in problem.constraints.iter().enumerate() {
        validate_constraint(constraint, i, &species)?;
    }
    if let Some(solver) = &problem.solver {
        validate_solver(solver, problem.species.len())?;
    }

    Ok(())
}

fn validate_terms(
    terms: &TermsDef,
    species: &HashSet<&str>,
    context: &str,
) -> Result<(), ValidationError> {
    for (name, coef) in terms {
        if !species.contains(name.as_str()) {
            return Err(ValidationError::MissingReference {
                name: name.clone(),
                context: context.to_string(),
            });
        }
        check_finite(&format!("{} coefficient of {}", context, name), *coef)?;
    }
    Ok(())
}

fn validate_reaction(
    reaction: &ReactionDef,
    index: usize,
    species: &HashSet<&str>,
) -> Result<(), ValidationError> {
    let context = format!("reaction {}", index);
    validate_terms(&reaction.reactants, species, &format!("{} reactants", context))?;
    validate_terms(&reaction.products, species, &format!("{} products", context))?;

    if reaction.equilibrium_constant.is_some() {
        return Err(ValidationError::InvalidValue {
            field: format!("{} equilibrium_constant", context),
            value: format!("{:?}", reaction.equilibrium_constant),
            reason: "only version 0 files may give K directly; use ln_k or log10_k".to_string(),
        });
    }
    match (reaction.ln_k, reaction.log10_k) {
        (Some(v), None) => check_finite(&format!("{} ln_k", context), v),
        (None, Some(v)) => check_finite(&format!("{} log10_k", context), v),
        (None, None) => Err(ValidationError::InvalidValue {
            field: context,
            value: "no equilibrium constant".to_string(),
            reason: "exactly one of ln_k or log10_k is required".to_string(),
        }),
        (Some(_), Some(_)) => Err(ValidationError::InvalidValue {
            field: context,
            value: "both ln_k and log10_k".to_string(),
            reason: "exactly one of ln_k or log10_k is required".to_string(),
        }),
    }
}

fn validate_constraint(
    constraint: &ConstraintDef,
    index: usize,
    species: &HashSet<&str>,
) -> Result<(), ValidationError> {
    let context = format!("constraint {}", index);
    if constraint.terms.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: format!("{} terms", context),
            value: "{}".to_string(),
            reason: "a constraint needs at least one term".to_string(),
        });
    }
    validate_terms(&constraint.terms, species, &format!("{} terms", context))?;

    let given = [
        constraint.value.is_some(),
        constraint.values.is_some(),
        constraint.logspace.is_some(),
    ]
    .iter()
    .filter(|b| **b)
    .count();
    if given != 1 {
        return Err(ValidationError::InvalidValue {
            field: context,
            value: format!("{} targets", given),
            reason: "exactly one of value, values or logspace is required".to_string(),
        });
    }

    if let Some(v) = constraint.value {
        check_finite(&format!("{} value", context), v)?;
    }
    if let Some(values) = &constraint.values {
        if values.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("{} values", context),
                value: "[]".to_string(),
                reason: "a sweep needs at least one value".to_string(),
            });
        }
        for v in values {
            check_finite(&format!("{} values", context), *v)?;
        }
    }
    if let Some(ls) = &constraint.logspace {
        check_finite(&format!("{} logspace.start", context), ls.start)?;
        check_finite(&format!("{} logspace.stop", context), ls.stop)?;
        if ls.num < 1 {
            return Err(ValidationError::InvalidValue {
                field: format!("{} logspace.num", context),
                value: ls.num.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_solver(solver: &SolverDef, num_species: usize) -> Result<(), ValidationError> {
    if solver.max_iterations == Some(0) {
        return Err(ValidationError::InvalidValue {
            field: "solver.max_iterations".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    for (field, value) in [
        ("solver.abs_tol", solver.abs_tol),
        ("solver.rel_tol", solver.rel_tol),
        ("solver.min_step", solver.min_step),
        ("solver.max_step", solver.max_step),
    ] {
        if let Some(v) = value.filter(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                value: v.to_string(),
                reason: "must be positive and finite".to_string(),
            });
        }
    }

    match (solver.initial_guess, &solver.initial_ln_concentrations) {
        (InitialGuessDef::Provided, None) => Err(ValidationError::InvalidValue {
            field: "solver.initial_ln_concentrations".to_string(),
            value: "missing".to_string(),
            reason: "required when initial_guess is provided".to_string(),
        }),
        (InitialGuessDef::Provided, Some(values)) => {
            if values.len() != num_species {
                return Err(ValidationError::InvalidValue {
                    field: "solver.initial_ln_concentrations".to_string(),
                    value: format!("{} entries", values.len()),
                    reason: format!("expected one per species ({})", num_species),
                });
            }
            for v in values {
                check_finite("solver.initial_ln_concentrations", *v)?;
            }
            Ok(())
        }
        (_, Some(_)) => Err(ValidationError::InvalidValue {
            field: "solver.initial_ln_concentrations".to_string(),
            value: "present".to_string(),
            reason: "only used when initial_guess is provided".to_string(),
        }),
        (_, None) => Ok(()),
    }
}

fn check_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be finite".to_string(),
        })
    }
}
