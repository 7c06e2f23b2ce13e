//! Model-specific error types.

use ma_core::{MaError, ModelId, Real};

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while composing expressions into reactions and constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Terms from two different models were combined.
    CrossModel { expected: ModelId, found: ModelId },

    /// A reaction or constraint whose coefficient vector is all zero.
    ZeroVector { what: &'static str },

    /// A constraint that no set of positive concentrations can satisfy.
    Infeasible { expr: String, target: Real },

    /// A coefficient or target that is NaN or infinite.
    NonFinite { what: &'static str, value: Real },

    /// A species index outside the registry it is evaluated against.
    UnknownSpecies { index: usize, len: usize },

    /// A constraint sweep without any target value.
    EmptySweep,

    /// Two species registered under the same display name.
    DuplicateName { name: String },
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::CrossModel { expected, found } => {
                write!(
                    f,
                    "Expression mixes species of {} and {}",
                    expected, found
                )
            }
            ModelError::ZeroVector { what } => {
                write!(f, "The {} has no species with a nonzero coefficient", what)
            }
            ModelError::Infeasible { expr, target } => {
                write!(
                    f,
                    "Constraint {} == {} cannot hold for positive concentrations",
                    expr, target
                )
            }
            ModelError::NonFinite { what, value } => {
                write!(f, "Non-finite {}: {}", what, value)
            }
            ModelError::UnknownSpecies { index, len } => {
                write!(
                    f,
                    "Species index {} outside registry of {} species",
                    index, len
                )
            }
            ModelError::EmptySweep => write!(f, "Constraint sweep has no target values"),
            ModelError::DuplicateName { name } => {
                write!(f, "Species name '{}' registered twice", name)
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<ModelError> for MaError {
    fn from(err: ModelError) -> Self {
        MaError::Composition {
            what: err.to_string(),
        }
    }
}
