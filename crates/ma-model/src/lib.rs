//! ma-model: the symbolic layer of massaction.
//!
//! Provides:
//! - A species registry (`ChemModel`) handing out stable species handles
//! - Immutable linear expressions over species
//! - Reactions (net stoichiometry) and constraints (linear conservation laws)
//! - Operator sugar on top of the explicit builder functions
//!
//! # Example
//!
//! ```
//! use ma_model::{ChemModel, react, constrain};
//!
//! let model = ChemModel::with_names(["H2O", "H2", "O2"]).unwrap();
//! let [h2o, h2, o2] = model.species_array().unwrap();
//!
//! let reaction = react(h2 + o2, 2.0 * h2o).unwrap();
//! let hydrogen = constrain(2.0 * h2 + 2.0 * h2o, 1.0).unwrap();
//!
//! assert_eq!(reaction.stoichiometry().coefficient(h2o), 2.0);
//! assert_eq!(hydrogen.target(), 1.0);
//! ```

pub mod constraint;
pub mod error;
pub mod expr;
pub mod model;
mod ops;
pub mod reaction;
pub mod species;

pub use constraint::{Constraint, ConstraintSweep, constrain, sweep};
pub use error::{ModelError, ModelResult};
pub use expr::{LinearExpr, add, negate, scale, species_to_expression, subtract};
pub use model::ChemModel;
pub use reaction::{Reaction, react};
pub use species::Species;
