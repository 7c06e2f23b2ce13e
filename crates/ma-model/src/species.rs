//! Species handles.

use ma_core::{ModelId, SpeciesId};

/// Handle to one species of a `ChemModel`.
///
/// A handle is a plain copyable value. It stays valid for the lifetime of the
/// model that issued it and can be combined with other handles and scalars
/// into `LinearExpr`s.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Species {
    id: SpeciesId,
}

impl Species {
    pub(crate) fn new(id: SpeciesId) -> Self {
        Self { id }
    }

    pub fn id(self) -> SpeciesId {
        self.id
    }

    /// Registration order within the owning model.
    pub fn index(self) -> usize {
        self.id.index()
    }

    pub fn model(self) -> ModelId {
        self.id.model()
    }
}

impl std::fmt::Debug for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Species({:?})", self.id)
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
