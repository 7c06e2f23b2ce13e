//! Linear constraints on real (non-logarithmic) concentrations.

use std::fmt;

use ma_core::{ModelId, Real, SpeciesId};

use crate::error::{ModelError, ModelResult};
use crate::expr::LinearExpr;

/// A conservation law `c · exp(ln_c) == target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    model: ModelId,
    expr: LinearExpr,
    target: Real,
}

impl Constraint {
    pub fn new(expr: impl Into<LinearExpr>, target: Real) -> ModelResult<Self> {
        let expr = expr.into();
        let model = validate_expr(&expr)?;
        check_target(&expr, target)?;
        Ok(Self {
            model,
            expr,
            target,
        })
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn target(&self) -> Real {
        self.target
    }

    /// A single-species constraint pins that species' concentration.
    ///
    /// Returns the species and its fixed concentration `target / coefficient`.
    pub fn reservoir(&self) -> Option<(SpeciesId, Real)> {
        if self.expr.len() != 1 {
            return None;
        }
        let (species, c) = self.expr.terms().next()?;
        Some((species.id(), self.target / c))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.expr, self.target)
    }
}

/// Form the constraint `expr == target`.
pub fn constrain(expr: impl Into<LinearExpr>, target: Real) -> ModelResult<Constraint> {
    Constraint::new(expr, target)
}

/// One expression held to a sequence of targets, one solve per target.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSweep {
    model: ModelId,
    expr: LinearExpr,
    targets: Vec<Real>,
}

impl ConstraintSweep {
    pub fn new(expr: impl Into<LinearExpr>, targets: Vec<Real>) -> ModelResult<Self> {
        let expr = expr.into();
        let model = validate_expr(&expr)?;
        if targets.is_empty() {
            return Err(ModelError::EmptySweep);
        }
        for target in &targets {
            check_target(&expr, *target)?;
        }
        Ok(Self {
            model,
            expr,
            targets,
        })
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn targets(&self) -> &[Real] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The constraint for the `index`-th target.
    pub fn at(&self, index: usize) -> Option<Constraint> {
        let target = *self.targets.get(index)?;
        Some(Constraint {
            model: self.model,
            expr: self.expr.clone(),
            target,
        })
    }
}

/// Form a sweep of `expr` over `targets`.
pub fn sweep(expr: impl Into<LinearExpr>, targets: Vec<Real>) -> ModelResult<ConstraintSweep> {
    ConstraintSweep::new(expr, targets)
}

fn validate_expr(expr: &LinearExpr) -> ModelResult<ModelId> {
    expr.ensure_finite("constraint coefficient")?;
    expr.model()?
        .ok_or(ModelError::ZeroVector { what: "constraint" })
}

/// Positive concentrations can only reach `target` if the expression has a
/// term of the matching sign (both signs for a zero target).
fn check_target(expr: &LinearExpr, target: Real) -> ModelResult<()> {
    if !target.is_finite() {
        return Err(ModelError::NonFinite {
            what: "constraint target",
            value: target,
        });
    }
    let has_pos = expr.terms().any(|(_, c)| c > 0.0);
    let has_neg = expr.terms().any(|(_, c)| c < 0.0);
    let feasible = if target > 0.0 {
        has_pos
    } else if target < 0.0 {
        has_neg
    } else {
        has_pos && has_neg
    };
    if feasible {
        Ok(())
    } else {
        Err(ModelError::Infeasible {
            expr: expr.to_string(),
            target,
        })
    }
}
