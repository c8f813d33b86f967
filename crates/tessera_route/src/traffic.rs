//! The flow registry: traffic flows between router clusters and the
//! placement of those clusters onto router tiles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tessera_common::Ident;
use tessera_noc::{GridLocation, LinkId};

/// Dense index of a flow in a [`TrafficFlows`] registry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct FlowId(u32);

impl FlowId {
    /// Creates an ID from a raw `u32` index.
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A logical stream of traffic between two router clusters.
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficFlow {
    /// Position in the registry.
    pub id: FlowId,
    /// Flow name, for reporting.
    pub name: Ident,
    /// Router cluster the traffic originates from.
    pub source: Ident,
    /// Router cluster the traffic is delivered to.
    pub sink: Ident,
    /// Demanded bandwidth, in the same unit as the link bandwidth.
    pub bandwidth: f64,
    /// Maximum end-to-end latency. `None` or a non-positive value means the
    /// flow is unconstrained.
    pub max_latency: Option<f64>,
    /// Previously computed route, used to warm-start the solver.
    pub route: Vec<LinkId>,
}

impl TrafficFlow {
    /// Returns `true` if the flow carries a positive latency bound.
    pub fn is_latency_constrained(&self) -> bool {
        self.max_latency.is_some_and(|l| l > 0.0)
    }
}

/// All traffic flows of a design, indexed by [`FlowId`].
#[derive(Clone, Debug, Default)]
pub struct TrafficFlows {
    flows: Vec<TrafficFlow>,
}

impl TrafficFlows {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a flow without a previous route and returns its ID.
    pub fn add_flow(
        &mut self,
        name: Ident,
        source: Ident,
        sink: Ident,
        bandwidth: f64,
        max_latency: Option<f64>,
    ) -> FlowId {
        let id = FlowId::from_raw(self.flows.len() as u32);
        self.flows.push(TrafficFlow {
            id,
            name,
            source,
            sink,
            bandwidth,
            max_latency,
            route: Vec::new(),
        });
        id
    }

    /// Returns the flow with the given ID.
    pub fn flow(&self, id: FlowId) -> &TrafficFlow {
        &self.flows[id.index()]
    }

    /// All flows in registration order.
    pub fn flows(&self) -> &[TrafficFlow] {
        &self.flows
    }

    /// Number of flows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Returns `true` if no flow is registered.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Iterator over every flow ID in registration order.
    pub fn ids(&self) -> impl Iterator<Item = FlowId> + '_ {
        (0..self.flows.len() as u32).map(FlowId::from_raw)
    }

    /// Stores a route for a flow; the next routing call uses it as a hint.
    pub fn set_route(&mut self, id: FlowId, route: Vec<LinkId>) {
        self.flows[id.index()].route = route;
    }

    /// The stored route of a flow.
    pub fn route(&self, id: FlowId) -> &[LinkId] {
        &self.flows[id.index()].route
    }

    /// Distinct router clusters referenced by any flow, in first-use order.
    pub fn router_clusters(&self) -> Vec<Ident> {
        let mut seen = Vec::new();
        for flow in &self.flows {
            for cluster in [flow.source, flow.sink] {
                if !seen.contains(&cluster) {
                    seen.push(cluster);
                }
            }
        }
        seen
    }
}

/// Where each router cluster has been placed on the device.
#[derive(Clone, Debug, Default)]
pub struct RouterPlacement {
    locations: HashMap<Ident, GridLocation>,
}

impl RouterPlacement {
    /// Creates an empty placement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a cluster at a router tile anchor, replacing any previous
    /// location.
    pub fn place(&mut self, cluster: Ident, location: GridLocation) {
        self.locations.insert(cluster, location);
    }

    /// Location of a cluster, if placed.
    pub fn location(&self, cluster: Ident) -> Option<GridLocation> {
        self.locations.get(&cluster).copied()
    }

    /// Number of placed clusters.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Returns `true` if nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
