//! Solver parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters passed to a [`CpBackend`](crate::CpBackend).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverParams {
    /// Seed for randomized tie-breaking. Identical seeds give identical
    /// results when no time limit interrupts the search.
    pub seed: u64,
    /// Wall-clock budget; the best solution found so far is returned when it
    /// runs out.
    pub time_limit: Option<Duration>,
    /// Number of independent search workers.
    pub num_workers: usize,
    /// Emit an event for every improving solution.
    pub log_search_progress: bool,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            seed: 0,
            time_limit: None,
            num_workers: 1,
            log_search_progress: false,
        }
    }
}
