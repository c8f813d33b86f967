//! Routing parameters and results.

use crate::traffic::{FlowId, TrafficFlows};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tessera_cpsat::{SolverParams, SolverStatus};
use tessera_noc::LinkId;

/// Default number of rescaled bandwidth units per link.
pub const DEFAULT_BANDWIDTH_RESOLUTION: i64 = 128;

/// Largest accepted bandwidth resolution. Link loads are compared against
/// `resolution + 1`, which must stay representable.
pub const MAX_BANDWIDTH_RESOLUTION: i64 = i32::MAX as i64;

/// Default wall-clock budget per solve.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(600);

/// Parameters of a [`noc_sat_route`](crate::noc_sat_route) call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SatRoutingParams {
    /// Units a link's capacity is divided into; demands are rounded down to
    /// whole units.
    pub bandwidth_resolution: i64,
    /// Solver seed.
    pub seed: u64,
    /// Run a second solve minimizing aggregate bandwidth with the latency
    /// overrun of the first solve held fixed.
    pub minimize_aggregate_bandwidth: bool,
    /// Wall-clock budget per solve.
    pub time_limit: Option<Duration>,
    /// Solver workers.
    pub num_workers: usize,
    /// Log every improving solution.
    pub log_search_progress: bool,
}

impl Default for SatRoutingParams {
    fn default() -> Self {
        Self {
            bandwidth_resolution: DEFAULT_BANDWIDTH_RESOLUTION,
            seed: 0,
            minimize_aggregate_bandwidth: false,
            time_limit: Some(DEFAULT_TIME_LIMIT),
            num_workers: 1,
            log_search_progress: false,
        }
    }
}

impl SatRoutingParams {
    pub(crate) fn solver_params(&self) -> SolverParams {
        SolverParams {
            seed: self.seed,
            time_limit: self.time_limit,
            num_workers: self.num_workers.max(1),
            log_search_progress: self.log_search_progress,
        }
    }
}

/// The result of a routing call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    /// How the solve ended.
    pub status: SolverStatus,
    /// One ordered link sequence per flow, indexed by [`FlowId`]. Empty unless
    /// `status` carries a solution.
    pub routes: Vec<Vec<LinkId>>,
    /// Weighted objective of the returned routing.
    pub objective: Option<i64>,
    /// Links flagged congested by the solver.
    pub congested_links: Vec<LinkId>,
    /// Latency-constrained flows routed over budget, with the excess hops.
    pub latency_overruns: Vec<(FlowId, i64)>,
}

impl RoutingOutcome {
    /// An outcome without routes.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            routes: Vec::new(),
            objective: None,
            congested_links: Vec::new(),
            latency_overruns: Vec::new(),
        }
    }

    /// Returns `true` if the outcome carries a route for every flow.
    pub fn is_routed(&self) -> bool {
        self.status.has_solution()
    }

    /// Stores the routes in `flows`, so the next call starts from them.
    pub fn apply_to(&self, flows: &mut TrafficFlows) {
        if !self.is_routed() {
            return;
        }
        for (id, route) in flows.ids().collect::<Vec<_>>().into_iter().zip(&self.routes) {
            flows.set_route(id, route.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_common::Interner;

    #[test]
    fn default_params() {
        let p = SatRoutingParams::default();
        assert_eq!(p.bandwidth_resolution, 128);
        assert!(!p.minimize_aggregate_bandwidth);
        assert_eq!(p.time_limit, Some(Duration::from_secs(600)));
        assert_eq!(
            p.solver_params(),
            SolverParams {
                time_limit: Some(DEFAULT_TIME_LIMIT),
                ..SolverParams::default()
            }
        );
    }

    #[test]
    fn zero_workers_clamped() {
        let p = SatRoutingParams {
            num_workers: 0,
            ..SatRoutingParams::default()
        };
        assert_eq!(p.solver_params().num_workers, 1);
    }

    #[test]
    fn apply_stores_routes() {
        let interner = Interner::new();
        let n = interner.get_or_intern("n");
        let mut flows = TrafficFlows::new();
        let a = flows.add_flow(n, n, n, 1.0, None);
        let b = flows.add_flow(n, n, n, 1.0, None);
        let outcome = RoutingOutcome {
            routes: vec![vec![LinkId::from_raw(2)], vec![]],
            ..RoutingOutcome::empty(SolverStatus::Optimal)
        };
        outcome.apply_to(&mut flows);
        assert_eq!(flows.route(a), &[LinkId::from_raw(2)]);
        assert!(flows.route(b).is_empty());
    }

    #[test]
    fn unrouted_outcome_leaves_flows_alone() {
        let interner = Interner::new();
        let n = interner.get_or_intern("n");
        let mut flows = TrafficFlows::new();
        let a = flows.add_flow(n, n, n, 1.0, None);
        flows.set_route(a, vec![LinkId::from_raw(5)]);
        RoutingOutcome::empty(SolverStatus::Infeasible).apply_to(&mut flows);
        assert_eq!(flows.route(a), &[LinkId::from_raw(5)]);
    }

    #[test]
    fn outcome_serializes_status() {
        let json = serde_json::to_value(RoutingOutcome::empty(SolverStatus::Unknown)).unwrap();
        assert_eq!(json["status"], "UNKNOWN");
        assert_eq!(json["routes"], serde_json::json!([]));
    }
}
