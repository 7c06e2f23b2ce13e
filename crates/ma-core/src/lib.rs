//! ma-core: shared foundation for massaction.
//!
//! Contains:
//! - numeric (Real + tolerances + saturating exponential)
//! - ids (model and species identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;

pub use error::{MaError, MaResult};
pub use ids::*;
pub use numeric::*;
