//! Assembly of the square equilibrium system.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::numerical_rank;
use ma_core::{ModelId, Real, saturating_exp};
use ma_model::{ChemModel, Constraint, ModelError, Reaction};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Relative singular-value cutoff for the structural rank checks.
const RANK_TOL: f64 = 1e-12;

/// How a conservation row is turned into a residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResidualForm {
    /// `c · exp(x) − b`.
    #[default]
    Linear,
    /// `ln P − ln(N + b)` for b > 0, `ln(P − b) − ln N` otherwise, where P and
    /// N are the positive and negative parts of `c · exp(x)`. Same roots as
    /// `Linear`, better scaled when targets span many decades.
    LogRatio,
}

impl ResidualForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResidualForm::Linear => "linear",
            ResidualForm::LogRatio => "log_ratio",
        }
    }
}

/// One equation of the system.
#[derive(Debug, Clone, PartialEq)]
pub enum EquationRow {
    /// `ν · x = ln K`, linear in log-concentrations.
    MassAction { nu: DVector<Real>, ln_k: Real },
    /// `c · exp(x) = b`, linear in real concentrations.
    Conservation { coefs: DVector<Real>, target: Real },
}

impl EquationRow {
    fn residual(&self, x: &DVector<Real>, exp_x: &DVector<Real>, form: ResidualForm) -> Real {
        match self {
            EquationRow::MassAction { nu, ln_k } => nu.dot(x) - ln_k,
            EquationRow::Conservation { coefs, target } => match form {
                ResidualForm::Linear => coefs.dot(exp_x) - target,
                ResidualForm::LogRatio => {
                    let (pos, neg) = split_sides(coefs, exp_x, *target);
                    pos.ln() - neg.ln()
                }
            },
        }
    }

    fn jacobian_row(
        &self,
        exp_x: &DVector<Real>,
        form: ResidualForm,
        out: &mut DMatrix<Real>,
        row: usize,
    ) {
        match self {
            EquationRow::MassAction { nu, .. } => {
                out.set_row(row, &nu.transpose());
            }
            EquationRow::Conservation { coefs, target } => {
                let (pos, neg) = match form {
                    ResidualForm::Linear => (1.0, 1.0),
                    ResidualForm::LogRatio => split_sides(coefs, exp_x, *target),
                };
                for (j, (c, e)) in coefs.iter().zip(exp_x.iter()).enumerate() {
                    out[(row, j)] = if *c > 0.0 {
                        c * e / pos
                    } else if *c < 0.0 {
                        c * e / neg
                    } else {
                        0.0
                    };
                }
            }
        }
    }
}

/// Positive and negative sides of `c · exp(x) = b`, with the target moved
/// to whichever side keeps both sums positive.
fn split_sides(coefs: &DVector<Real>, exp_x: &DVector<Real>, target: Real) -> (Real, Real) {
    let mut pos = 0.0;
    let mut neg = 0.0;
    for (c, e) in coefs.iter().zip(exp_x.iter()) {
        if *c > 0.0 {
            pos += c * e;
        } else if *c < 0.0 {
            neg -= c * e;
        }
    }
    if target > 0.0 {
        (pos, neg + target)
    } else {
        (pos - target, neg)
    }
}

/// A validated, square equilibrium system.
///
/// Rows are ordered reactions first, then constraints, matching the order
/// the caller supplied them in.
#[derive(Debug, Clone)]
pub struct EquilibriumProblem {
    model: ModelId,
    num_species: usize,
    num_reactions: usize,
    rows: Vec<EquationRow>,
    /// `(species index, fixed concentration)` of single-species constraints.
    reservoirs: Vec<(usize, Real)>,
}

impl EquilibriumProblem {
    /// Assemble and validate the system.
    ///
    /// Fails fast, before any iteration, on:
    /// - a count mismatch between reactions and `ln_k`, or between equations
    ///   and species (`Dimension`)
    /// - reactions or constraints from another model, non-finite `ln_k`
    ///   (`Composition`)
    /// - species that appear in no equation, linearly dependent reactions,
    ///   linearly dependent constraints (`Singular`)
    pub fn new(
        model: &ChemModel,
        reactions: &[Reaction],
        ln_k: &[Real],
        constraints: &[Constraint],
    ) -> SolverResult<Self> {
        let n = model.num_species();
        let r = reactions.len();
        let m = constraints.len();

        if ln_k.len() != r {
            return Err(SolverError::Dimension {
                what: format!(
                    "{} equilibrium constants given for {} reactions",
                    ln_k.len(),
                    r
                ),
            });
        }
        if r + m != n {
            return Err(SolverError::Dimension {
                what: format!(
                    "{} reactions + {} constraints != {} species",
                    r, m, n
                ),
            });
        }

        let mut rows = Vec::with_capacity(n);
        for (reaction, &lnk) in reactions.iter().zip(ln_k) {
            model.ensure_owns(reaction.model())?;
            if !lnk.is_finite() {
                return Err(ModelError::NonFinite {
                    what: "ln K",
                    value: lnk,
                }
                .into());
            }
            let nu = reaction.stoichiometry().to_dense(n)?;
            rows.push(EquationRow::MassAction {
                nu: DVector::from_vec(nu),
                ln_k: lnk,
            });
        }

        let mut reservoirs = Vec::new();
        for constraint in constraints {
            model.ensure_owns(constraint.model())?;
            let coefs = constraint.expr().to_dense(n)?;
            rows.push(EquationRow::Conservation {
                coefs: DVector::from_vec(coefs),
                target: constraint.target(),
            });
            if let Some((id, value)) = constraint.reservoir() {
                reservoirs.push((id.index(), value));
            }
        }

        let problem = Self {
            model: model.id(),
            num_species: n,
            num_reactions: r,
            rows,
            reservoirs,
        };
        problem.check_structure(model)?;

        debug!(
            species = n,
            reactions = r,
            constraints = m,
            "assembled equilibrium system"
        );
        Ok(problem)
    }

    fn check_structure(&self, model: &ChemModel) -> SolverResult<()> {
        let n = self.num_species;
        if n == 0 {
            return Ok(());
        }
        let matrix = self.coefficient_matrix();

        for j in 0..n {
            if matrix.column(j).iter().all(|v| *v == 0.0) {
                let label = model.species_at(j).map(|s| model.label(s))?;
                return Err(SolverError::Singular {
                    what: format!("species {} appears in no reaction or constraint", label),
                });
            }
        }

        let r = self.num_reactions;
        let m = n - r;
        if r > 0 && numerical_rank(&matrix.rows(0, r).into_owned(), RANK_TOL) < r {
            return Err(SolverError::Singular {
                what: "reactions are linearly dependent".to_string(),
            });
        }
        if m > 0 && numerical_rank(&matrix.rows(r, m).into_owned(), RANK_TOL) < m {
            return Err(SolverError::Singular {
                what: "constraints are linearly dependent".to_string(),
            });
        }
        Ok(())
    }

    /// Stacked `[ν_1; …; ν_r; c_1; …; c_m]`.
    pub fn coefficient_matrix(&self) -> DMatrix<Real> {
        let n = self.num_species;
        let mut matrix = DMatrix::zeros(self.rows.len(), n);
        for (i, row) in self.rows.iter().enumerate() {
            let v = match row {
                EquationRow::MassAction { nu, .. } => nu,
                EquationRow::Conservation { coefs, .. } => coefs,
            };
            matrix.set_row(i, &v.transpose());
        }
        matrix
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn num_species(&self) -> usize {
        self.num_species
    }

    pub fn num_reactions(&self) -> usize {
        self.num_reactions
    }

    pub fn num_constraints(&self) -> usize {
        self.rows.len() - self.num_reactions
    }

    pub fn rows(&self) -> &[EquationRow] {
        &self.rows
    }

    pub fn reservoirs(&self) -> &[(usize, Real)] {
        &self.reservoirs
    }

    /// Residual vector `F(x)`.
    pub fn residual(&self, x: &DVector<Real>, form: ResidualForm) -> SolverResult<DVector<Real>> {
        self.check_len(x)?;
        let exp_x = x.map(saturating_exp);
        Ok(DVector::from_iterator(
            self.rows.len(),
            self.rows.iter().map(|row| row.residual(x, &exp_x, form)),
        ))
    }

    /// Analytic Jacobian `∂F/∂x`.
    ///
    /// Reaction rows are the constant ν; constraint rows are `c ∘ exp(x)`
    /// (divided by the side sums for `LogRatio`).
    pub fn jacobian(&self, x: &DVector<Real>, form: ResidualForm) -> SolverResult<DMatrix<Real>> {
        self.check_len(x)?;
        let exp_x = x.map(saturating_exp);
        let mut jac = DMatrix::zeros(self.rows.len(), self.num_species);
        for (i, row) in self.rows.iter().enumerate() {
            row.jacobian_row(&exp_x, form, &mut jac, i);
        }
        Ok(jac)
    }

    /// Magnitude each residual row is compared against when testing convergence.
    ///
    /// Reaction rows and `LogRatio` constraint rows are already in log units
    /// and get 1. `Linear` constraint rows get `|b| + Σ|c_i|·exp(x_i)`, so a
    /// constraint whose terms are all tiny is still held to a relative tolerance.
    pub fn residual_scales(
        &self,
        x: &DVector<Real>,
        form: ResidualForm,
    ) -> SolverResult<DVector<Real>> {
        self.check_len(x)?;
        let exp_x = x.map(saturating_exp);
        Ok(DVector::from_iterator(
            self.rows.len(),
            self.rows.iter().map(|row| match (row, form) {
                (EquationRow::Conservation { coefs, target }, ResidualForm::Linear) => {
                    target.abs() + coefs.abs().dot(&exp_x)
                }
                _ => 1.0,
            }),
        ))
    }

    /// `c_k · exp(x) − b_k` for every constraint, independent of the residual form.
    pub fn constraint_residuals(&self, x: &DVector<Real>) -> SolverResult<Vec<Real>> {
        self.check_len(x)?;
        let exp_x = x.map(saturating_exp);
        Ok(self.rows[self.num_reactions..]
            .iter()
            .map(|row| row.residual(x, &exp_x, ResidualForm::Linear))
            .collect())
    }

    fn check_len(&self, x: &DVector<Real>) -> SolverResult<()> {
        if x.len() != self.num_species {
            return Err(SolverError::Dimension {
                what: format!(
                    "vector of length {} for {} species",
                    x.len(),
                    self.num_species
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jacobian::central_difference_jacobian;
    use ma_model::{constrain, react};

    fn oxyhydrogen() -> (ChemModel, Vec<Reaction>, Vec<Constraint>) {
        let model = ChemModel::with_names(["H2O", "H2", "O2"]).unwrap();
        let [h2o, h2, o2] = model.species_array().unwrap();
        let reactions = vec![react(h2 + o2, 2.0 * h2o).unwrap()];
        let constraints = vec![
            constrain(2.0 * h2 + 2.0 * h2o, 1.0).unwrap(),
            constrain(h2o + 2.0 * o2, 10.0).unwrap(),
        ];
        (model, reactions, constraints)
    }

    #[test]
    fn rows_are_reactions_then_constraints() {
        let (model, reactions, constraints) = oxyhydrogen();
        let problem = EquilibriumProblem::new(&model, &reactions, &[20.0], &constraints).unwrap();
        assert_eq!(problem.num_reactions(), 1);
        assert_eq!(problem.num_constraints(), 2);
        assert!(matches!(problem.rows()[0], EquationRow::MassAction { .. }));
        assert!(matches!(problem.rows()[2], EquationRow::Conservation { .. }));

        let matrix = problem.coefficient_matrix();
        assert_eq!(matrix.row(0).iter().copied().collect::<Vec<_>>(), vec![2.0, -1.0, -1.0]);
        assert_eq!(matrix.row(2).iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 2.0]);
    }

    #[test]
    fn residual_at_unit_concentrations() {
        let (model, reactions, constraints) = oxyhydrogen();
        let problem = EquilibriumProblem::new(&model, &reactions, &[20.0], &constraints).unwrap();
        let f = problem
            .residual(&DVector::zeros(3), ResidualForm::Linear)
            .unwrap();
        assert_eq!(f[0], -20.0);
        assert!((f[1] - 3.0).abs() < 1e-12);
        assert!((f[2] - (-7.0)).abs() < 1e-12);
    }

    #[test]
    fn analytic_jacobian_matches_finite_differences() {
        let (model, reactions, constraints) = oxyhydrogen();
        let problem = EquilibriumProblem::new(&model, &reactions, &[20.0], &constraints).unwrap();
        let x = DVector::from_vec(vec![-0.3, 1.5, 0.7]);

        for form in [ResidualForm::Linear, ResidualForm::LogRatio] {
            let analytic = problem.jacobian(&x, form).unwrap();
            let numeric =
                central_difference_jacobian(&x, |v| problem.residual(v, form), 1e-6).unwrap();
            for (a, b) in analytic.iter().zip(numeric.iter()) {
                assert!((a - b).abs() < 1e-6, "{:?}: {} vs {}", form, a, b);
            }
        }
    }

    #[test]
    fn linear_constraint_rows_scale_with_their_terms() {
        let (model, reactions, constraints) = oxyhydrogen();
        let problem = EquilibriumProblem::new(&model, &reactions, &[20.0], &constraints).unwrap();
        let x = DVector::from_vec(vec![0.0, -30.0, 0.0]);

        let linear = problem.residual_scales(&x, ResidualForm::Linear).unwrap();
        assert_eq!(linear[0], 1.0);
        assert!((linear[1] - (1.0 + 2.0 * (-30.0f64).exp() + 2.0)).abs() < 1e-12);
        assert!((linear[2] - (10.0 + 1.0 + 2.0)).abs() < 1e-12);

        let log_ratio = problem.residual_scales(&x, ResidualForm::LogRatio).unwrap();
        assert!(log_ratio.iter().all(|s| *s == 1.0));
    }

    #[test]
    fn log_ratio_residual_moves_target_to_matching_side() {
        let coefs = DVector::from_vec(vec![3.4, -0.2, -1.0]);
        let x = DVector::from_vec(vec![3.14, 3.0, 2.9]);
        let e = x.map(f64::exp);

        let below = EquationRow::Conservation {
            coefs: coefs.clone(),
            target: -1.3,
        };
        let expected = (3.4 * e[0] + 1.3).ln() - (0.2 * e[1] + e[2]).ln();
        assert!((below.residual(&x, &e, ResidualForm::LogRatio) - expected).abs() < 1e-12);

        let above = EquationRow::Conservation {
            coefs,
            target: 10.7,
        };
        let expected = (3.4 * e[0]).ln() - (0.2 * e[1] + e[2] + 10.7).ln();
        assert!((above.residual(&x, &e, ResidualForm::LogRatio) - expected).abs() < 1e-12);
    }

    #[test]
    fn dimension_mismatch_fails_before_solving() {
        let (model, reactions, constraints) = oxyhydrogen();
        let err = EquilibriumProblem::new(&model, &reactions, &[20.0], &constraints[..1])
            .unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));

        let err = EquilibriumProblem::new(&model, &reactions, &[20.0, 1.0], &constraints)
            .unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));
    }

    #[test]
    fn foreign_rows_are_composition_errors() {
        let (model, reactions, _) = oxyhydrogen();
        let other = ChemModel::new(3);
        let [x, y, _] = other.species_array().unwrap();
        let foreign = vec![constrain(x, 1.0).unwrap(), constrain(y, 1.0).unwrap()];
        let err = EquilibriumProblem::new(&model, &reactions, &[20.0], &foreign).unwrap_err();
        assert!(matches!(
            err,
            SolverError::Composition(ModelError::CrossModel { .. })
        ));
    }

    #[test]
    fn non_finite_ln_k_is_rejected() {
        let (model, reactions, constraints) = oxyhydrogen();
        let err = EquilibriumProblem::new(&model, &reactions, &[f64::NAN], &constraints)
            .unwrap_err();
        assert!(matches!(
            err,
            SolverError::Composition(ModelError::NonFinite { .. })
        ));
    }

    #[test]
    fn dependent_constraints_are_singular() {
        let model = ChemModel::new(2);
        let [a, b] = model.species_array().unwrap();
        let constraints = vec![constrain(a + b, 1.0).unwrap(), constrain(a + b, 2.0).unwrap()];
        let err = EquilibriumProblem::new(&model, &[], &[], &constraints).unwrap_err();
        assert!(matches!(err, SolverError::Singular { .. }));
    }

    #[test]
    fn dependent_reactions_are_singular() {
        let model = ChemModel::new(3);
        let [a, b, c] = model.species_array().unwrap();
        let reactions = vec![react(a, b).unwrap(), react(2.0 * a, 2.0 * b).unwrap()];
        let constraints = vec![constrain(a + b + c, 1.0).unwrap()];
        let err =
            EquilibriumProblem::new(&model, &reactions, &[0.0, 0.0], &constraints).unwrap_err();
        assert!(matches!(err, SolverError::Singular { .. }));
    }

    #[test]
    fn unused_species_is_singular() {
        let model = ChemModel::with_names(["A", "B", "spectator"]).unwrap();
        let [a, b, _] = model.species_array().unwrap();
        let reactions = vec![react(a, b).unwrap()];
        let constraints = vec![constrain(a + b, 1.0).unwrap(), constrain(a - b, 0.5).unwrap()];
        let err = EquilibriumProblem::new(&model, &reactions, &[0.0], &constraints).unwrap_err();
        match err {
            SolverError::Singular { what } => assert!(what.contains("spectator")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reservoirs_are_collected() {
        let model = ChemModel::new(3);
        let [nil_site, vm, vo] = model.species_array().unwrap();
        let reactions = vec![react(nil_site, vm + 2.0 * vo).unwrap()];
        let constraints = vec![
            constrain(nil_site, 1.0).unwrap(),
            constrain(2.0 * vo - 4.0 * vm, 0.0).unwrap(),
        ];
        let problem = EquilibriumProblem::new(&model, &reactions, &[-25.0], &constraints).unwrap();
        assert_eq!(problem.reservoirs(), &[(0, 1.0)]);
    }

    #[test]
    fn wrong_vector_length_is_dimension_error() {
        let (model, reactions, constraints) = oxyhydrogen();
        let problem = EquilibriumProblem::new(&model, &reactions, &[20.0], &constraints).unwrap();
        let err = problem
            .residual(&DVector::zeros(2), ResidualForm::Linear)
            .unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));
    }
}
