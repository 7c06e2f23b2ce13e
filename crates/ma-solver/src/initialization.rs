//! Initial guess strategies.
//!
//! The default all-zero vector (unit concentrations) works because the
//! reaction rows are scale-free in log space and constraints are usually
//! written in the problem's own units. Targets that are many decades away
//! from 1 converge faster when their reservoir species start at the target.

use crate::error::{SolverError, SolverResult};
use crate::problem::EquilibriumProblem;
use ma_core::Real;
use nalgebra::DVector;

/// Starting point of the Newton iteration.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InitialGuess {
    /// All log-concentrations zero.
    #[default]
    Zeros,
    /// Caller-supplied log-concentrations, one per species.
    Provided(Vec<Real>),
    /// Zeros, except species pinned by a single-species constraint start at
    /// `ln(target / coefficient)`.
    ReservoirSeeded,
}

impl InitialGuess {
    /// Human-readable name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            InitialGuess::Zeros => "zeros",
            InitialGuess::Provided(_) => "provided",
            InitialGuess::ReservoirSeeded => "reservoir",
        }
    }

    /// Build the starting vector for `problem`.
    pub fn build(&self, problem: &EquilibriumProblem) -> SolverResult<DVector<Real>> {
        let n = problem.num_species();
        match self {
            InitialGuess::Zeros => Ok(DVector::zeros(n)),
            InitialGuess::Provided(values) => {
                if values.len() != n {
                    return Err(SolverError::Dimension {
                        what: format!(
                            "initial guess has {} entries for {} species",
                            values.len(),
                            n
                        ),
                    });
                }
                if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                    return Err(SolverError::ConvergenceFailed {
                        what: format!("non-finite initial guess entry {}", bad),
                    });
                }
                Ok(DVector::from_column_slice(values))
            }
            InitialGuess::ReservoirSeeded => {
                let mut x = DVector::zeros(n);
                seed_reservoirs(problem, &mut x);
                Ok(x)
            }
        }
    }

    /// Whether warm starts should re-pin reservoir species.
    pub fn seeds_reservoirs(&self) -> bool {
        matches!(self, InitialGuess::ReservoirSeeded)
    }
}

/// Overwrite reservoir species in `x` with the log of their pinned value.
pub fn seed_reservoirs(problem: &EquilibriumProblem, x: &mut DVector<Real>) {
    for &(index, value) in problem.reservoirs() {
        if value > 0.0 && index < x.len() {
            x[index] = value.ln();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ma_model::{ChemModel, constrain, react};

    fn schottky() -> EquilibriumProblem {
        let model = ChemModel::new(3);
        let [nil_site, vm, vo] = model.species_array().unwrap();
        let reactions = vec![react(nil_site, vm + 2.0 * vo).unwrap()];
        let constraints = vec![
            constrain(4.0 * nil_site, 2.0).unwrap(),
            constrain(2.0 * vo - 4.0 * vm, 0.0).unwrap(),
        ];
        EquilibriumProblem::new(&model, &reactions, &[-25.0], &constraints).unwrap()
    }

    #[test]
    fn zeros_by_default() {
        let problem = schottky();
        let x = InitialGuess::default().build(&problem).unwrap();
        assert_eq!(x, DVector::zeros(3));
    }

    #[test]
    fn reservoir_species_are_seeded() {
        let problem = schottky();
        let x = InitialGuess::ReservoirSeeded.build(&problem).unwrap();
        assert!((x[0] - 0.5_f64.ln()).abs() < 1e-15);
        assert_eq!(x[1], 0.0);
        assert_eq!(x[2], 0.0);
    }

    #[test]
    fn provided_guess_is_checked() {
        let problem = schottky();
        let x = InitialGuess::Provided(vec![1.0, 2.0, 3.0])
            .build(&problem)
            .unwrap();
        assert_eq!(x[2], 3.0);

        let err = InitialGuess::Provided(vec![1.0]).build(&problem).unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));

        let err = InitialGuess::Provided(vec![0.0, f64::NAN, 0.0])
            .build(&problem)
            .unwrap_err();
        assert!(matches!(err, SolverError::ConvergenceFailed { .. }));
    }

    #[test]
    fn names_are_stable() {
        assert_eq!(InitialGuess::Zeros.as_str(), "zeros");
        assert_eq!(InitialGuess::ReservoirSeeded.as_str(), "reservoir");
        assert!(InitialGuess::ReservoirSeeded.seeds_reservoirs());
        assert!(!InitialGuess::Zeros.seeds_reservoirs());
    }
}
