//! Equilibrium solver for mass-action systems.
//!
//! The unknowns are the log-concentrations of every species in a
//! `ChemModel`. Each reaction contributes one equation that is linear in
//! log space (its mass-action law); each constraint contributes one equation
//! that is linear in real concentrations. The stacked square system is driven
//! to zero by a damped Newton iteration with an analytic Jacobian.

pub mod error;
pub mod initialization;
pub mod jacobian;
pub mod newton;
pub mod problem;
pub mod solution;
pub mod solve;

pub use error::{SolverError, SolverResult};
pub use initialization::InitialGuess;
pub use jacobian::JacobianMode;
pub use newton::{NewtonConfig, NewtonResult};
pub use problem::{EquationRow, EquilibriumProblem, ResidualForm};
pub use solution::EquilibriumSolution;
pub use solve::{EquilibriumSolve, SolverConfig, solve, solve_from, solve_sweep};
