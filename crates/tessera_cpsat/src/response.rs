//! Solve outcomes.

use crate::expr::{BoolVar, IntVar, LinearExpr, Literal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a solve ended.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    /// A solution was found and proven optimal.
    Optimal,
    /// A solution was found but the search stopped before proving optimality.
    Feasible,
    /// The search space was exhausted without finding a solution.
    Infeasible,
    /// The search stopped before finding a solution or proving there is none.
    Unknown,
    /// The model is malformed.
    ModelInvalid,
}

impl SolverStatus {
    /// Returns `true` if the response carries a solution.
    pub fn has_solution(self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolverStatus::Optimal => "OPTIMAL",
            SolverStatus::Feasible => "FEASIBLE",
            SolverStatus::Infeasible => "INFEASIBLE",
            SolverStatus::Unknown => "UNKNOWN",
            SolverStatus::ModelInvalid => "MODEL_INVALID",
        };
        f.write_str(s)
    }
}

/// The result of a solve.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverResponse {
    /// Final status.
    pub status: SolverStatus,
    /// Objective value of the returned solution, if any. Zero for models
    /// without an objective.
    pub objective_value: Option<i64>,
    /// Search branches explored across all workers.
    pub num_branches: u64,
    /// Dead ends hit across all workers.
    pub num_conflicts: u64,
    /// Wall-clock time spent.
    pub wall_time: Duration,
    /// Worker that produced the solution.
    pub winning_worker: Option<usize>,
    /// Message for [`SolverStatus::ModelInvalid`].
    pub validation_error: Option<String>,
    pub(crate) values: Vec<i64>,
}

impl SolverResponse {
    pub(crate) fn without_solution(status: SolverStatus, wall_time: Duration) -> Self {
        Self {
            status,
            objective_value: None,
            num_branches: 0,
            num_conflicts: 0,
            wall_time,
            winning_worker: None,
            validation_error: None,
            values: Vec::new(),
        }
    }

    /// Value of an integer variable in the solution.
    ///
    /// # Panics
    ///
    /// Panics if the response has no solution.
    pub fn value(&self, var: IntVar) -> i64 {
        self.values[var.index()]
    }

    /// Value of a boolean variable in the solution.
    pub fn bool_value(&self, var: BoolVar) -> bool {
        self.values[var.index()] != 0
    }

    /// Truth value of a literal in the solution.
    pub fn literal_value(&self, lit: Literal) -> bool {
        self.bool_value(lit.var()) != lit.is_negated()
    }

    /// Evaluates an expression in the solution.
    pub fn eval(&self, expr: &LinearExpr) -> i64 {
        expr.eval(&self.values)
    }

    /// Returns the full assignment, indexed by variable.
    pub fn values(&self) -> &[i64] {
        &self.values
    }
}
