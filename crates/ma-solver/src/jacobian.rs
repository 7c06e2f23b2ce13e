//! Jacobian helpers: finite differences and conditioning checks.

use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};

/// How the solver obtains the Jacobian of the residual.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum JacobianMode {
    /// Closed-form rows (reaction rows constant, constraint rows `c ∘ exp(x)`).
    #[default]
    Analytic,
    /// Forward differences with relative step `epsilon`.
    FiniteDifference { epsilon: f64 },
    /// Central differences with relative step `epsilon`.
    CentralDifference { epsilon: f64 },
}

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let mut x_perturbed = x.clone();
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] += dx;

        let f_perturbed = f(&x_perturbed)?;
        let df = (f_perturbed - &f_x) / dx;

        jac.set_column(j, &df);
    }

    Ok(jac)
}

/// Compute Jacobian using central finite differences (more accurate but 2x cost).
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let m = f(x)?.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let f_minus = f(&x_minus)?;

        let df = (f_plus - f_minus) / (2.0 * dx);

        jac.set_column(j, &df);
    }

    Ok(jac)
}

/// Singular values after scaling every row, then every column, to unit max-norm.
///
/// The scaling makes the result independent of species that sit at trace
/// levels (tiny `exp(x)` columns) and of constraints written in large units.
/// Returns `None` for non-finite input or when the SVD does not converge.
fn equilibrated_singular_values(m: &DMatrix<f64>) -> Option<DVector<f64>> {
    if m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let (rows, cols) = m.shape();
    let mut scaled = m.clone();
    for i in 0..rows {
        let s = scaled.row(i).amax();
        if s > 0.0 {
            for j in 0..cols {
                scaled[(i, j)] /= s;
            }
        }
    }
    for j in 0..cols {
        let s = scaled.column(j).amax();
        if s > 0.0 {
            for i in 0..rows {
                scaled[(i, j)] /= s;
            }
        }
    }
    scaled
        .try_svd(false, false, f64::EPSILON, 10_000)
        .map(|svd| svd.singular_values)
}

/// Ratio of smallest to largest equilibrated singular value (0.0 = singular).
pub fn reciprocal_condition(jac: &DMatrix<f64>) -> f64 {
    if jac.is_empty() {
        return 1.0;
    }
    match equilibrated_singular_values(jac) {
        Some(sv) => {
            let max = sv.max();
            if max > 0.0 { sv.min() / max } else { 0.0 }
        }
        None => 0.0,
    }
}

/// Number of equilibrated singular values above `rel_tol` times the largest.
pub fn numerical_rank(m: &DMatrix<f64>, rel_tol: f64) -> usize {
    if m.is_empty() {
        return 0;
    }
    match equilibrated_singular_values(m) {
        Some(sv) => {
            let cutoff = rel_tol * sv.max();
            sv.iter().filter(|s| **s > cutoff).count()
        }
        None => 0,
    }
}
