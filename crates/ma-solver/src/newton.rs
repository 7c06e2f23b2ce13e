//! Damped Newton solver with singularity detection.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::reciprocal_condition;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

/// Newton solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for the residual 2-norm
    pub abs_tol: f64,
    /// Each row must also satisfy `|r_i| <= rel_tol * scale_i`
    pub rel_tol: f64,
    /// A full Newton step with every component below this (ln units) ends the iteration
    pub min_step: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Largest allowed component of a Newton step (ln units); `None` = unlimited
    pub max_step: Option<f64>,
    /// Equilibrated reciprocal condition number below which the Jacobian is singular
    pub singular_tol: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            abs_tol: 1e-10,
            rel_tol: 1e-10,
            min_step: 1e-10,
            line_search_beta: 0.5,
            max_line_search_iters: 30,
            max_step: None,
            singular_tol: 1e-12,
        }
    }
}

/// Newton iteration result.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Final residual norm
    pub residual_norm: f64,
    /// Number of iterations
    pub iterations: usize,
}

/// Residual test: the 2-norm is below `abs_tol` and every row is small
/// relative to its own scale.
fn is_converged(
    r: &DVector<f64>,
    r_norm: f64,
    scales: &DVector<f64>,
    config: &NewtonConfig,
) -> bool {
    r_norm < config.abs_tol
        && r
            .iter()
            .zip(scales.iter())
            .all(|(ri, si)| ri.abs() <= config.rel_tol * si)
}

/// Newton solver with backtracking line search.
///
/// `scale_fn` gives the magnitude each residual row is measured against, so
/// a row whose terms are all tiny does not pass the test just by being
/// small in absolute terms. The iteration also ends once the full Newton
/// step drops below `min_step`.
///
/// A step is accepted as soon as it strictly reduces the residual norm and
/// yields finite residuals. The Jacobian is checked for (near-)singularity at
/// every iterate before it is factored.
pub fn newton_solve<F, S, J>(
    x0: DVector<f64>,
    residual_fn: F,
    scale_fn: S,
    jacobian_fn: J,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    S: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: Fn(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;
    let mut r_norm = r.norm();
    if !r_norm.is_finite() {
        return Err(SolverError::ConvergenceFailed {
            what: "non-finite residual at the initial guess".to_string(),
        });
    }

    for iter in 0..config.max_iterations {
        if is_converged(&r, r_norm, &scale_fn(&x)?, config) {
            debug!(iterations = iter, residual_norm = r_norm, "newton converged");
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
            });
        }

        let jac = jacobian_fn(&x)?;
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::ConvergenceFailed {
                what: format!("non-finite Jacobian entry at iteration {}", iter),
            });
        }

        let rcond = reciprocal_condition(&jac);
        if rcond < config.singular_tol {
            return Err(SolverError::Singular {
                what: format!(
                    "Jacobian is singular at iteration {} (reciprocal condition {:.3e})",
                    iter, rcond
                ),
            });
        }

        // Solve J * dx = -r
        let mut dx = jac
            .lu()
            .solve(&(-&r))
            .ok_or_else(|| SolverError::Singular {
                what: format!("LU factorisation failed at iteration {}", iter),
            })?;

        if dx.amax() < config.min_step {
            let x_new = &x + &dx;
            let r_new_norm = residual_fn(&x_new)?.norm();
            if r_new_norm.is_finite() {
                debug!(
                    iterations = iter + 1,
                    residual_norm = r_new_norm,
                    "newton step below min_step"
                );
                return Ok(NewtonResult {
                    x: x_new,
                    residual_norm: r_new_norm,
                    iterations: iter + 1,
                });
            }
        }

        if let Some(max_step) = config.max_step {
            let largest = dx.amax();
            if largest > max_step {
                dx *= max_step / largest;
            }
        }

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let x_new = &x + alpha * &dx;
            let r_new = residual_fn(&x_new)?;
            let r_new_norm = r_new.norm();
            if r_new_norm.is_finite() && r_new_norm < r_norm {
                accepted = Some((x_new, r_new, r_new_norm));
                break;
            }
            trace!(iteration = iter, alpha, "backtracking");
            alpha *= config.line_search_beta;
        }

        let Some((x_new, r_new, r_new_norm)) = accepted else {
            return Err(SolverError::ConvergenceFailed {
                what: format!(
                    "line search stagnated at iteration {}, residual = {:.3e}",
                    iter, r_norm
                ),
            });
        };

        trace!(
            iteration = iter,
            alpha,
            residual_norm = r_new_norm,
            "newton step"
        );
        x = x_new;
        r = r_new;
        r_norm = r_new_norm;
    }

    if is_converged(&r, r_norm, &scale_fn(&x)?, config) {
        return Ok(NewtonResult {
            x,
            residual_norm: r_norm,
            iterations: config.max_iterations,
        });
    }

    Err(SolverError::ConvergenceFailed {
        what: format!(
            "maximum iterations {} reached, residual = {:.3e}",
            config.max_iterations, r_norm
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_scale(x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(DVector::from_element(x.len(), 1.0))
    }

    #[test]
    fn simple_quadratic() {
        // Solve x^2 - 4 = 0, x > 0
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
        };
        let jacobian = |x: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, 2.0 * x[0]))
        };

        let x0 = DVector::from_element(1, 3.0);
        let config = NewtonConfig::default();
        let result = newton_solve(x0, residual, unit_scale, jacobian, &config).unwrap();

        assert!((result.x[0] - 2.0).abs() < 1e-9);
        assert!(result.residual_norm < config.abs_tol);
    }

    #[test]
    fn converged_guess_takes_no_iterations() {
        let residual =
            |x: &DVector<f64>| -> SolverResult<DVector<f64>> { Ok(x.map(|v| v - 1.0)) };
        let jacobian =
            |x: &DVector<f64>| -> SolverResult<DMatrix<f64>> { Ok(DMatrix::identity(x.len(), x.len())) };

        let x0 = DVector::from_element(2, 1.0);
        let result = newton_solve(x0, residual, unit_scale, jacobian, &NewtonConfig::default()).unwrap();
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn singular_jacobian_is_reported() {
        // Two identical equations with different right-hand sides.
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0] + x[1] - 1.0, x[0] + x[1] - 2.0]))
        };
        let jacobian = |_: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(2, 2, 1.0))
        };

        let x0 = DVector::zeros(2);
        let err = newton_solve(x0, residual, unit_scale, jacobian, &NewtonConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::Singular { .. }));
    }

    #[test]
    fn iteration_cap_is_reported() {
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
        };
        let jacobian = |x: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, 2.0 * x[0]))
        };

        let config = NewtonConfig {
            max_iterations: 1,
            ..NewtonConfig::default()
        };
        let x0 = DVector::from_element(1, 100.0);
        let err = newton_solve(x0, residual, unit_scale, jacobian, &config).unwrap_err();
        assert!(matches!(err, SolverError::ConvergenceFailed { .. }));
    }

    #[test]
    fn step_cap_limits_first_move() {
        // Linear residual: one uncapped step would solve it exactly.
        let residual =
            |x: &DVector<f64>| -> SolverResult<DVector<f64>> { Ok(x.map(|v| v - 50.0)) };
        let jacobian =
            |x: &DVector<f64>| -> SolverResult<DMatrix<f64>> { Ok(DMatrix::identity(x.len(), x.len())) };

        let config = NewtonConfig {
            max_step: Some(10.0),
            ..NewtonConfig::default()
        };
        let result =
            newton_solve(DVector::zeros(1), residual, unit_scale, jacobian, &config).unwrap();
        assert_eq!(result.iterations, 5);
        assert!((result.x[0] - 50.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_initial_residual_fails_fast() {
        let residual = |_: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, f64::NAN))
        };
        let jacobian = |_: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, 1.0))
        };
        let err =
            newton_solve(DVector::zeros(1), residual, unit_scale, jacobian, &NewtonConfig::default())
                .unwrap_err();
        assert!(matches!(err, SolverError::ConvergenceFailed { .. }));
    }

    #[test]
    fn small_rows_are_measured_against_their_scale() {
        // exp(x) = 1e-15 is within 1e-10 in absolute terms long before x is right.
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(x.map(|v| v.exp() - 1e-15))
        };
        let scale = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(x.map(|v| v.exp() + 1e-15))
        };
        let jacobian = |x: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
            Ok(DMatrix::from_element(1, 1, x[0].exp()))
        };

        let config = NewtonConfig::default();
        let scaled = newton_solve(DVector::zeros(1), residual, scale, jacobian, &config).unwrap();
        assert!((scaled.x[0] - 1e-15f64.ln()).abs() < 1e-8);

        let absolute =
            newton_solve(DVector::zeros(1), residual, unit_scale, jacobian, &config).unwrap();
        assert!(absolute.x[0] > -30.0);
    }

    #[test]
    fn tiny_step_ends_iteration() {
        // Steep residual: |r| stays above abs_tol while the step is already negligible.
        let residual =
            |x: &DVector<f64>| -> SolverResult<DVector<f64>> { Ok(x.map(|v| 1e6 * (v - 1.0))) };
        let jacobian =
            |_: &DVector<f64>| -> SolverResult<DMatrix<f64>> { Ok(DMatrix::from_element(1, 1, 1e6)) };

        let x0 = DVector::from_element(1, 1.0 + 1e-12);
        let result =
            newton_solve(x0, residual, unit_scale, jacobian, &NewtonConfig::default()).unwrap();
        assert_eq!(result.iterations, 1);
        assert!((result.x[0] - 1.0).abs() < 1e-15);
    }
}
