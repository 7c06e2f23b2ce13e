//! Linear combinations of species.

use std::collections::BTreeMap;
use std::fmt;

use ma_core::{ModelId, Real, SpeciesId};

use crate::error::{ModelError, ModelResult};
use crate::species::Species;

/// Immutable map from species to a real coefficient.
///
/// A species that is absent has coefficient zero; exact zeros produced by
/// arithmetic are pruned, so two expressions compare equal iff every
/// coefficient matches. The empty expression is `nil`, the "nothing" side
/// of a reaction such as `nil >> H+ + OH-`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearExpr {
    terms: BTreeMap<SpeciesId, Real>,
}

impl LinearExpr {
    /// The empty expression.
    pub fn nil() -> Self {
        Self::default()
    }

    /// Coefficient of `species` (0.0 if absent).
    pub fn coefficient(&self, species: Species) -> Real {
        self.terms.get(&species.id()).copied().unwrap_or(0.0)
    }

    /// Iterate over the non-zero terms in registration order.
    pub fn terms(&self) -> impl Iterator<Item = (Species, Real)> + '_ {
        self.terms.iter().map(|(id, c)| (Species::new(*id), *c))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The single model all terms belong to, `None` for `nil`.
    pub fn model(&self) -> ModelResult<Option<ModelId>> {
        let mut found: Option<ModelId> = None;
        for id in self.terms.keys() {
            match found {
                None => found = Some(id.model()),
                Some(expected) if expected != id.model() => {
                    return Err(ModelError::CrossModel {
                        expected,
                        found: id.model(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(found)
    }

    /// Dense coefficient vector over a registry of `num_species` species.
    pub fn to_dense(&self, num_species: usize) -> ModelResult<Vec<Real>> {
        let mut dense = vec![0.0; num_species];
        for (id, c) in &self.terms {
            let slot = dense
                .get_mut(id.index())
                .ok_or(ModelError::UnknownSpecies {
                    index: id.index(),
                    len: num_species,
                })?;
            *slot = *c;
        }
        Ok(dense)
    }

    pub(crate) fn ensure_finite(&self, what: &'static str) -> ModelResult<()> {
        for c in self.terms.values() {
            if !c.is_finite() {
                return Err(ModelError::NonFinite { what, value: *c });
            }
        }
        Ok(())
    }

    /// Render with a custom label per species.
    pub fn render_with<F>(&self, label: F) -> String
    where
        F: Fn(Species) -> String,
    {
        if self.terms.is_empty() {
            return "nil".to_string();
        }
        let parts: Vec<String> = self
            .terms()
            .map(|(species, c)| {
                let sign = if c > 0.0 { "+" } else { "" };
                format!("{}{}*{}", sign, c, label(species))
            })
            .collect();
        parts.join(" ")
    }

    fn from_terms(terms: BTreeMap<SpeciesId, Real>) -> Self {
        let terms = terms.into_iter().filter(|(_, c)| *c != 0.0).collect();
        Self { terms }
    }
}

impl From<Species> for LinearExpr {
    fn from(species: Species) -> Self {
        species_to_expression(species)
    }
}

impl From<&LinearExpr> for LinearExpr {
    fn from(expr: &LinearExpr) -> Self {
        expr.clone()
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_with(|s| s.to_string()))
    }
}

/// `1 * species`.
pub fn species_to_expression(species: Species) -> LinearExpr {
    let mut terms = BTreeMap::new();
    terms.insert(species.id(), 1.0);
    LinearExpr { terms }
}

/// Union of both maps, coefficients of shared species summed.
pub fn add(a: &LinearExpr, b: &LinearExpr) -> LinearExpr {
    let mut terms = a.terms.clone();
    for (id, c) in &b.terms {
        *terms.entry(*id).or_insert(0.0) += c;
    }
    LinearExpr::from_terms(terms)
}

/// Every coefficient multiplied by `factor`; a zero factor yields `nil`.
pub fn scale(factor: Real, expr: &LinearExpr) -> LinearExpr {
    let terms = expr.terms.iter().map(|(id, c)| (*id, factor * c)).collect();
    LinearExpr::from_terms(terms)
}

pub fn negate(expr: &LinearExpr) -> LinearExpr {
    scale(-1.0, expr)
}

/// `a - b`.
pub fn subtract(a: &LinearExpr, b: &LinearExpr) -> LinearExpr {
    add(a, &negate(b))
}
