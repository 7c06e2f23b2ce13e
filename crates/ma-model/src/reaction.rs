//! Reactions: net stoichiometry between two sides.

use std::fmt;

use ma_core::{ModelId, Real};

use crate::error::{ModelError, ModelResult};
use crate::expr::{LinearExpr, subtract};

/// A reaction `reactants >> products`.
///
/// Only the net vector `products - reactants` enters the mass-action law; the
/// two sides are kept for display. The equilibrium constant is supplied at
/// solve time, not stored here.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    model: ModelId,
    reactants: LinearExpr,
    products: LinearExpr,
    net: LinearExpr,
}

impl Reaction {
    pub fn new(
        reactants: impl Into<LinearExpr>,
        products: impl Into<LinearExpr>,
    ) -> ModelResult<Self> {
        let reactants = reactants.into();
        let products = products.into();
        reactants.ensure_finite("reactant coefficient")?;
        products.ensure_finite("product coefficient")?;

        let net = subtract(&products, &reactants);
        // The sides may carry different models even if one cancels out of `net`.
        let model = match (reactants.model()?, products.model()?) {
            (Some(expected), Some(found)) if expected != found => {
                return Err(ModelError::CrossModel { expected, found });
            }
            (Some(m), _) | (None, Some(m)) => m,
            (None, None) => return Err(ModelError::ZeroVector { what: "reaction" }),
        };
        if net.is_empty() {
            return Err(ModelError::ZeroVector { what: "reaction" });
        }

        Ok(Self {
            model,
            reactants,
            products,
            net,
        })
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn reactants(&self) -> &LinearExpr {
        &self.reactants
    }

    pub fn products(&self) -> &LinearExpr {
        &self.products
    }

    /// Net stoichiometric vector ν = products − reactants.
    pub fn stoichiometry(&self) -> &LinearExpr {
        &self.net
    }

    /// Log-space mass-action residual `ν · ln_c − ln_k`.
    pub fn mass_action_residual(&self, ln_concentrations: &[Real], ln_k: Real) -> ModelResult<Real> {
        let mut sum = -ln_k;
        for (species, nu) in self.net.terms() {
            let ln_c = ln_concentrations
                .get(species.index())
                .ok_or(ModelError::UnknownSpecies {
                    index: species.index(),
                    len: ln_concentrations.len(),
                })?;
            sum += nu * ln_c;
        }
        Ok(sum)
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} >> {}", self.reactants, self.products)
    }
}

/// Form the reaction `reactants >> products`.
pub fn react(
    reactants: impl Into<LinearExpr>,
    products: impl Into<LinearExpr>,
) -> ModelResult<Reaction> {
    Reaction::new(reactants, products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChemModel;

    #[test]
    fn net_vector_is_products_minus_reactants() {
        let model = ChemModel::new(3);
        let [h2o, h2, o2] = model.species_array().unwrap();
        let reaction = (h2 + o2 >> 2.0 * h2o).unwrap();

        assert_eq!(reaction.reactants(), &(h2 + o2));
        assert_eq!(reaction.products(), &(2.0 * h2o));
        let nu = reaction.stoichiometry().to_dense(3).unwrap();
        assert_eq!(nu, vec![2.0, -1.0, -1.0]);
        assert_eq!(reaction.model(), model.id());
    }

    #[test]
    fn mass_action_residual_in_log_space() {
        let model = ChemModel::new(3);
        let [h2o, h2, o2] = model.species_array().unwrap();
        let reaction = react(h2 + o2, 2.0 * h2o).unwrap();

        let ln_c = [10.6, 11.2, 9.3];
        let ln_k = -7.0;
        let expected = 2.0 * ln_c[0] - ln_c[1] - ln_c[2] - ln_k;
        let got = reaction.mass_action_residual(&ln_c, ln_k).unwrap();
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn reaction_setups() {
        let model = ChemModel::new(3);
        let [h2o, h2, o2] = model.species_array().unwrap();

        let r = (h2 >> 1.9 * o2).unwrap();
        assert_eq!(r.stoichiometry().coefficient(h2), -1.0);
        assert_eq!(r.stoichiometry().coefficient(o2), 1.9);

        let r = (0.4 * h2 >> o2).unwrap();
        assert_eq!(r.stoichiometry().coefficient(h2), -0.4);
        assert_eq!(r.stoichiometry().coefficient(o2), 1.0);

        let r = ((h2 + o2) >> 2.0 * h2o).unwrap();
        assert_eq!(r.reactants().len(), 2);
        assert_eq!(r.products().coefficient(h2o), 2.0);
    }

    #[test]
    fn nil_side_is_allowed() {
        let model = ChemModel::new(2);
        let [h, oh] = model.species_array().unwrap();
        let r = react(LinearExpr::nil(), h + oh).unwrap();
        assert_eq!(r.stoichiometry().to_dense(2).unwrap(), vec![1.0, 1.0]);
        assert_eq!(r.to_string(), "nil >> +1*species_0 +1*species_1");
    }

    #[test]
    fn zero_net_vector_is_rejected() {
        let model = ChemModel::new(2);
        let [a, b] = model.species_array().unwrap();
        let err = react(a + b, b + a).unwrap_err();
        assert_eq!(err, ModelError::ZeroVector { what: "reaction" });

        let err = react(LinearExpr::nil(), 0.0 * a).unwrap_err();
        assert_eq!(err, ModelError::ZeroVector { what: "reaction" });
    }

    #[test]
    fn cross_model_sides_are_rejected() {
        let m1 = ChemModel::new(1);
        let m2 = ChemModel::new(1);
        let [a] = m1.species_array().unwrap();
        let [b] = m2.species_array().unwrap();
        assert!(matches!(react(a, b), Err(ModelError::CrossModel { .. })));
        assert!(matches!(react(a + b, a), Err(ModelError::CrossModel { .. })));
    }

    #[test]
    fn non_finite_coefficient_is_rejected() {
        let model = ChemModel::new(2);
        let [a, b] = model.species_array().unwrap();
        assert!(matches!(
            react(f64::NAN * a, b),
            Err(ModelError::NonFinite { .. })
        ));
    }

    #[test]
    fn display_both_sides() {
        let model = ChemModel::new(3);
        let [h2o, h2, o2] = model.species_array().unwrap();
        let reaction = react(h2 + o2, 2.0 * h2o).unwrap();
        assert_eq!(
            reaction.to_string(),
            "+1*species_1 +1*species_2 >> +2*species_0"
        );
    }
}
