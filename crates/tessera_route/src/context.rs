//! The explicit context a routing call works against.

use crate::traffic::{RouterPlacement, TrafficFlows};
use tessera_common::Interner;
use tessera_noc::{NocTopology, TurnModel};

/// Everything [`noc_sat_route`](crate::noc_sat_route) reads.
///
/// Borrowed immutably for the duration of the call.
#[derive(Clone, Copy)]
pub struct RoutingContext<'a> {
    /// The router/link graph.
    pub topology: &'a NocTopology,
    /// The flows to route.
    pub flows: &'a TrafficFlows,
    /// Where each router cluster sits on the device.
    pub placement: &'a RouterPlacement,
    /// The deadlock-avoidance discipline supplying forbidden turns.
    pub turn_model: &'a dyn TurnModel,
    /// Resolves flow and cluster names for messages.
    pub interner: &'a Interner,
}

impl<'a> RoutingContext<'a> {
    /// Bundles the routing inputs.
    pub fn new(
        topology: &'a NocTopology,
        flows: &'a TrafficFlows,
        placement: &'a RouterPlacement,
        turn_model: &'a dyn TurnModel,
        interner: &'a Interner,
    ) -> Self {
        Self {
            topology,
            flows,
            placement,
            turn_model,
            interner,
        }
    }
}

impl std::fmt::Debug for RoutingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingContext")
            .field("routers", &self.topology.router_count())
            .field("links", &self.topology.link_count())
            .field("flows", &self.flows.len())
            .field("placed", &self.placement.len())
            .field("turn_model", &self.turn_model.name())
            .finish()
    }
}
