//! Post-routing analysis: link loads, congestion and per-flow latency.

use crate::model::{hop_budget, rescale_bandwidth};
use crate::traffic::{FlowId, TrafficFlows};
use serde::{Deserialize, Serialize};
use tessera_noc::{LinkId, NocTopology};

/// Load on one link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkUsage {
    /// The link.
    pub link: LinkId,
    /// Sum of the raw demands of the flows using the link.
    pub bandwidth: f64,
    /// Sum of the rescaled demands of the flows using the link.
    pub rescaled_load: i64,
    /// Number of flows using the link.
    pub flows: usize,
    /// `rescaled_load` exceeds the resolution.
    pub congested: bool,
}

/// Metrics of one routed flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    /// The flow.
    pub flow: FlowId,
    /// Links on the route.
    pub hops: usize,
    /// End-to-end latency of the route.
    pub latency: f64,
    /// Links allowed by the flow's latency bound, if it has one.
    pub hop_budget: Option<i64>,
    /// Links used beyond the budget.
    pub overrun: i64,
}

/// Link and flow metrics for a complete routing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingReport {
    /// Per-link usage, indexed by [`LinkId`].
    pub links: Vec<LinkUsage>,
    /// Per-flow metrics, indexed by [`FlowId`].
    pub flows: Vec<FlowReport>,
}

impl RoutingReport {
    /// Links whose load exceeds capacity.
    pub fn congested_links(&self) -> Vec<LinkId> {
        self.links
            .iter()
            .filter(|u| u.congested)
            .map(|u| u.link)
            .collect()
    }

    /// Sum of all flow overruns.
    pub fn total_overrun(&self) -> i64 {
        self.flows.iter().map(|f| f.overrun).sum()
    }

    /// Sum of the rescaled load over every link.
    pub fn aggregate_bandwidth(&self) -> i64 {
        self.links.iter().map(|u| u.rescaled_load).sum()
    }
}

/// Measures `routes` (one per flow, indexed by [`FlowId`]) against the
/// topology.
///
/// Latency of a route with `n` links is `n × (link latency + router latency)
/// + router latency`.
pub fn analyze_routes(
    topology: &NocTopology,
    flows: &TrafficFlows,
    routes: &[Vec<LinkId>],
    bandwidth_resolution: i64,
) -> RoutingReport {
    let mut links: Vec<LinkUsage> = topology
        .link_ids()
        .map(|link| LinkUsage {
            link,
            bandwidth: 0.0,
            rescaled_load: 0,
            flows: 0,
            congested: false,
        })
        .collect();
    let per_hop = topology.link_latency() + topology.router_latency();

    let mut flow_reports = Vec::with_capacity(flows.len());
    for (flow, route) in flows.flows().iter().zip(routes) {
        let rescaled =
            rescale_bandwidth(flow.bandwidth, topology.link_bandwidth(), bandwidth_resolution);
        for link in route {
            let usage = &mut links[link.index()];
            usage.bandwidth += flow.bandwidth;
            usage.rescaled_load += rescaled;
            usage.flows += 1;
        }
        let budget = hop_budget(
            flow.max_latency,
            topology.link_latency(),
            topology.router_latency(),
        );
        let hops = route.len();
        flow_reports.push(FlowReport {
            flow: flow.id,
            hops,
            latency: hops as f64 * per_hop + topology.router_latency(),
            hop_budget: budget,
            overrun: budget.map_or(0, |b| (hops as i64 - b).max(0)),
        });
    }
    for usage in &mut links {
        usage.congested = usage.rescaled_load > bandwidth_resolution;
    }

    RoutingReport {
        links,
        flows: flow_reports,
    }
}
