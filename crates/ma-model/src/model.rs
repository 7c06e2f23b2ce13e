//! Species registry.

use ma_core::{ModelId, SpeciesId};

use crate::constraint::Constraint;
use crate::error::{ModelError, ModelResult};
use crate::expr::LinearExpr;
use crate::reaction::Reaction;
use crate::species::Species;

/// Owner of a set of species.
///
/// Species are numbered in registration order starting at zero. The registry
/// only grows; handles stay valid for the lifetime of the model.
#[derive(Debug, Clone)]
pub struct ChemModel {
    id: ModelId,
    names: Vec<Option<String>>,
}

impl ChemModel {
    /// Create a model with `num_species` unnamed species.
    pub fn new(num_species: usize) -> Self {
        Self {
            id: ModelId::fresh(),
            names: vec![None; num_species],
        }
    }

    /// Create a model with one named species per entry.
    pub fn with_names<I, S>(names: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut model = Self::new(0);
        for name in names {
            model.add_named_species(name)?;
        }
        Ok(model)
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn num_species(&self) -> usize {
        self.names.len()
    }

    /// Register an unnamed species.
    pub fn add_species(&mut self) -> Species {
        self.push(None)
    }

    /// Register a species under a display name unique within this model.
    pub fn add_named_species(&mut self, name: impl Into<String>) -> ModelResult<Species> {
        let name = name.into();
        if self.species_by_name(&name).is_some() {
            return Err(ModelError::DuplicateName { name });
        }
        Ok(self.push(Some(name)))
    }

    fn push(&mut self, name: Option<String>) -> Species {
        let index = self.names.len() as u32;
        self.names.push(name);
        Species::new(SpeciesId::new(self.id, index))
    }

    /// Handles to all species, in registration order.
    pub fn species(&self) -> Vec<Species> {
        (0..self.names.len())
            .map(|i| Species::new(SpeciesId::new(self.id, i as u32)))
            .collect()
    }

    /// Handles as a fixed-size array, for destructuring.
    pub fn species_array<const N: usize>(&self) -> ModelResult<[Species; N]> {
        if N != self.names.len() {
            return Err(ModelError::UnknownSpecies {
                index: N,
                len: self.names.len(),
            });
        }
        Ok(std::array::from_fn(|i| {
            Species::new(SpeciesId::new(self.id, i as u32))
        }))
    }

    pub fn species_at(&self, index: usize) -> ModelResult<Species> {
        if index >= self.names.len() {
            return Err(ModelError::UnknownSpecies {
                index,
                len: self.names.len(),
            });
        }
        Ok(Species::new(SpeciesId::new(self.id, index as u32)))
    }

    pub fn species_by_name(&self, name: &str) -> Option<Species> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .map(|i| Species::new(SpeciesId::new(self.id, i as u32)))
    }

    /// Display name, if the species was registered with one.
    pub fn name(&self, species: Species) -> Option<&str> {
        if species.model() != self.id {
            return None;
        }
        self.names.get(species.index())?.as_deref()
    }

    /// Display name or `species_<index>`.
    pub fn label(&self, species: Species) -> String {
        self.name(species)
            .map(str::to_string)
            .unwrap_or_else(|| species.to_string())
    }

    /// Check that `model` refers to this registry.
    pub fn ensure_owns(&self, model: ModelId) -> ModelResult<()> {
        if model == self.id {
            Ok(())
        } else {
            Err(ModelError::CrossModel {
                expected: self.id,
                found: model,
            })
        }
    }

    pub fn format_expr(&self, expr: &LinearExpr) -> String {
        expr.render_with(|s| self.label(s))
    }

    pub fn format_reaction(&self, reaction: &Reaction) -> String {
        format!(
            "{} >> {}",
            self.format_expr(reaction.reactants()),
            self.format_expr(reaction.products())
        )
    }

    pub fn format_constraint(&self, constraint: &Constraint) -> String {
        format!(
            "{} == {}",
            self.format_expr(constraint.expr()),
            constraint.target()
        )
    }
}
