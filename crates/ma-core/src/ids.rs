use core::fmt;
use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};

static NEXT_MODEL: AtomicU32 = AtomicU32::new(0);

/// Identity of one `ChemModel`.
///
/// Every model draws a fresh id at construction so that species handles
/// from two models never compare equal, even when their indices do.
/// `NonZero` keeps `Option<ModelId>` the same size as `ModelId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(NonZeroU32);

impl ModelId {
    /// Allocate a new, process-unique model id.
    pub fn fresh() -> Self {
        let raw = NEXT_MODEL.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU32::MIN.saturating_add(raw))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelId({})", self.get())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.get())
    }
}

/// Stable handle of a species: owning model plus zero-based index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId {
    model: ModelId,
    index: u32,
}

impl SpeciesId {
    pub fn new(model: ModelId, index: u32) -> Self {
        Self { model, index }
    }

    pub fn model(self) -> ModelId {
        self.model
    }

    /// Zero-based position in the owning model's registry.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpeciesId({}:{})", self.model.get(), self.index)
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "species_{}", self.index)
    }
}
