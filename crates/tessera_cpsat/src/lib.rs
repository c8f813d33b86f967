//! A small constraint-programming toolkit for integer and boolean models.
//!
//! Models are assembled with [`CpModelBuilder`] (boolean and bounded integer
//! variables, linear constraints with enforcement literals, cardinality
//! helpers, max-equality, hints, and a linear objective) and solved through
//! the [`CpBackend`] trait. [`BranchAndBound`] is the built-in engine.

#![warn(missing_docs)]

pub mod backend;
pub mod expr;
pub mod model;
pub mod params;
pub mod response;
pub mod search;

pub use backend::CpBackend;
pub use expr::{BoolVar, IntVar, LinearExpr, Literal};
pub use model::{Comparison, ConstraintId, CpModel, CpModelBuilder, HintTarget};
pub use params::SolverParams;
pub use response::{SolverResponse, SolverStatus};
pub use search::BranchAndBound;
