//! Operator sugar over the builder functions in `expr`, `reaction` and
//! `constraint`.
//!
//! `a + b`, `a - b`, `-a` and `k * a` build `LinearExpr`s; `lhs >> rhs`
//! forms a `Reaction` (fallible, hence `ModelResult`). Rust's `==` must
//! return `bool`, so constraints use `expr.equals(target)` instead.

use std::ops::{Add, Mul, Neg, Shr, Sub};

use ma_core::Real;

use crate::constraint::{Constraint, ConstraintSweep};
use crate::error::ModelResult;
use crate::expr::{self, LinearExpr};
use crate::reaction::Reaction;
use crate::species::Species;

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        expr::add(&self, &rhs.into())
    }
}

impl<T: Into<LinearExpr>> Add<T> for Species {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        expr::subtract(&self, &rhs.into())
    }
}

impl<T: Into<LinearExpr>> Sub<T> for Species {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        expr::negate(&self)
    }
}

impl Neg for Species {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        -LinearExpr::from(self)
    }
}

impl Mul<LinearExpr> for Real {
    type Output = LinearExpr;

    fn mul(self, rhs: LinearExpr) -> LinearExpr {
        expr::scale(self, &rhs)
    }
}

impl Mul<Species> for Real {
    type Output = LinearExpr;

    fn mul(self, rhs: Species) -> LinearExpr {
        self * LinearExpr::from(rhs)
    }
}

impl Mul<Real> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: Real) -> LinearExpr {
        rhs * self
    }
}

impl Mul<Real> for Species {
    type Output = LinearExpr;

    fn mul(self, rhs: Real) -> LinearExpr {
        rhs * self
    }
}

impl<T: Into<LinearExpr>> Shr<T> for LinearExpr {
    type Output = ModelResult<Reaction>;

    fn shr(self, rhs: T) -> ModelResult<Reaction> {
        Reaction::new(self, rhs)
    }
}

impl<T: Into<LinearExpr>> Shr<T> for Species {
    type Output = ModelResult<Reaction>;

    fn shr(self, rhs: T) -> ModelResult<Reaction> {
        Reaction::new(self, rhs)
    }
}

impl LinearExpr {
    /// `self == target` as a constraint.
    pub fn equals(self, target: Real) -> ModelResult<Constraint> {
        Constraint::new(self, target)
    }

    /// `self == targets[i]` for each `i`, as a sweep.
    pub fn equals_each(self, targets: Vec<Real>) -> ModelResult<ConstraintSweep> {
        ConstraintSweep::new(self, targets)
    }
}

impl Species {
    pub fn equals(self, target: Real) -> ModelResult<Constraint> {
        LinearExpr::from(self).equals(target)
    }

    pub fn equals_each(self, targets: Vec<Real>) -> ModelResult<ConstraintSweep> {
        LinearExpr::from(self).equals_each(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChemModel;

    #[test]
    fn negation_flips_every_sign() {
        let model = ChemModel::new(2);
        let [a, b] = model.species_array().unwrap();
        let e = -(a - 2.0 * b);
        assert_eq!(e.coefficient(a), -1.0);
        assert_eq!(e.coefficient(b), 2.0);
        assert_eq!((-a).coefficient(a), -1.0);
    }

    #[test]
    fn scalar_on_either_side() {
        let model = ChemModel::new(1);
        let [a] = model.species_array().unwrap();
        assert_eq!(a * 3.0, 3.0 * a);
        assert_eq!((a + a) * 0.5, LinearExpr::from(a));
    }

    #[test]
    fn species_reacts_and_constrains_directly() {
        let model = ChemModel::new(2);
        let [a, b] = model.species_array().unwrap();
        let r = (a >> b).unwrap();
        assert_eq!(r.stoichiometry().coefficient(a), -1.0);
        let c = a.equals(5.0).unwrap();
        assert_eq!(c.target(), 5.0);
        let s = b.equals_each(vec![1.0, 2.0]).unwrap();
        assert_eq!(s.len(), 2);
    }
}
