//! The seam between model construction and the search engine.

use crate::model::CpModel;
use crate::params::SolverParams;
use crate::response::SolverResponse;

/// A constraint-optimization engine.
///
/// Implementations must be deterministic for a fixed seed when the search is
/// not cut short by a time limit.
pub trait CpBackend: Send + Sync {
    /// Human-readable engine name.
    fn name(&self) -> &'static str;

    /// Solves `model`, minimizing its objective if one is set.
    fn solve(&self, model: &CpModel, params: &SolverParams) -> SolverResponse;
}
