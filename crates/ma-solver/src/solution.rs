//! Converged equilibrium state.

use ma_core::{ModelId, Real, saturating_exp};
use ma_model::Species;

/// Result of one successful solve.
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumSolution {
    /// Model the solution belongs to
    pub model: ModelId,
    /// ln(c) per species, in registration order
    pub ln_concentrations: Vec<Real>,
    /// Final residual 2-norm
    pub residual_norm: Real,
    /// Newton iterations used
    pub iterations: usize,
}

impl EquilibriumSolution {
    /// Real concentrations `exp(ln c)`, saturating to zero for trace species.
    pub fn concentrations(&self) -> Vec<Real> {
        self.ln_concentrations
            .iter()
            .map(|v| saturating_exp(*v))
            .collect()
    }

    /// ln(c) of `species`, `None` if it belongs to another model.
    pub fn ln_concentration(&self, species: Species) -> Option<Real> {
        if species.model() != self.model {
            return None;
        }
        self.ln_concentrations.get(species.index()).copied()
    }

    pub fn concentration(&self, species: Species) -> Option<Real> {
        self.ln_concentration(species).map(saturating_exp)
    }

    pub fn into_vec(self) -> Vec<Real> {
        self.ln_concentrations
    }
}
