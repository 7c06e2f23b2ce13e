use crate::MaError;

/// Floating point type used throughout the system
pub type Real = f64;

/// Largest exponent for which `f64::exp` stays finite.
pub const EXP_ARG_MAX: Real = 709.0;

/// Below this exponent `f64::exp` is zero (past the subnormal range).
pub const EXP_ARG_MIN: Real = -745.0;

#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, MaError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MaError::NonFinite { what, value: v })
    }
}

/// Exponential that saturates instead of overflowing.
///
/// Very negative arguments go to `0.0` (a vanishing trace species), very
/// positive ones stop at `exp(EXP_ARG_MAX)`. NaN stays NaN.
#[inline]
pub fn saturating_exp(x: Real) -> Real {
    if x.is_nan() {
        return x;
    }
    x.clamp(EXP_ARG_MIN, EXP_ARG_MAX).exp()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn saturating_exp_is_finite_and_non_negative(x in -1.0e9_f64..1.0e9_f64) {
            let e = saturating_exp(x);
            prop_assert!(e.is_finite());
            prop_assert!(e >= 0.0);
        }

        #[test]
        fn saturating_exp_matches_exp_in_range(x in -700.0_f64..700.0_f64) {
            prop_assert!(nearly_equal(saturating_exp(x), x.exp(), Tolerances::default()));
        }
    }
}
