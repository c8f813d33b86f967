//! Formulation of flow routing as a constraint model.
//!
//! Every (flow, link) pair gets a boolean that is true when the flow uses the
//! link. Flow conservation, geometric progress and the turn model restrict
//! the booleans to deadlock-free source-to-sink paths; per-link congestion
//! indicators and per-flow latency overrun counters feed the objective.

use crate::error::RoutingError;
use tessera_common::is_close;
use tessera_cpsat::{BoolVar, CpModel, CpModelBuilder, IntVar, LinearExpr, Literal, SolverResponse};
use tessera_noc::{LinkDirection, LinkId, NocTopology, RouterId};

/// Lower bound on the largest representable latency overrun.
pub const MIN_OVERRUN_BOUND: i64 = 20;

/// Floors `value`, treating values within float tolerance of an integer as
/// that integer.
fn tolerant_floor(value: f64) -> f64 {
    let nearest = value.round();
    if is_close(value, nearest) {
        nearest
    } else {
        value.floor()
    }
}

/// Converts a bandwidth demand into integer units of `1 / resolution` of the
/// link capacity, rounding down.
pub fn rescale_bandwidth(bandwidth: f64, link_bandwidth: f64, resolution: i64) -> i64 {
    tolerant_floor(bandwidth / link_bandwidth * resolution as f64) as i64
}

/// The number of links a flow may use before exceeding `max_latency`.
///
/// A path of `n` links costs `n × (link_latency + router_latency) +
/// router_latency`. Returns `None` for unconstrained flows (no bound, a
/// non-positive bound, or zero per-hop latency). The budget is never
/// negative.
pub fn hop_budget(max_latency: Option<f64>, link_latency: f64, router_latency: f64) -> Option<i64> {
    let max_latency = max_latency.filter(|&l| l > 0.0)?;
    let per_hop = link_latency + router_latency;
    if per_hop <= 0.0 {
        return None;
    }
    Some(tolerant_floor((max_latency - router_latency) / per_hop).max(0.0) as i64)
}

/// A flow with its endpoints resolved to routers and its demand rescaled.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedFlow {
    pub(crate) name: String,
    pub(crate) source: RouterId,
    pub(crate) sink: RouterId,
    pub(crate) rescaled_bandwidth: i64,
    pub(crate) hop_budget: Option<i64>,
}

impl ResolvedFlow {
    pub(crate) fn is_local(&self) -> bool {
        self.source == self.sink
    }
}

/// What the model minimizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RoutingObjective {
    /// Latency overrun first, congested links second, aggregate bandwidth last.
    Weighted,
    /// Aggregate bandwidth only, with the total overrun pinned.
    AggregateBandwidth { total_overrun: i64 },
}

/// Objective weights that keep the three terms strictly prioritized.
///
/// With `B` the largest possible aggregate bandwidth and `L` the link count,
/// one congested link costs `B + 1` and one overrun hop costs
/// `(B + 1)·L + B + 1`, so each term outweighs every lower term combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ObjectiveWeights {
    pub(crate) congestion: i64,
    pub(crate) latency: i64,
}

impl ObjectiveWeights {
    pub(crate) fn compute(
        flows: &[ResolvedFlow],
        link_count: usize,
        overrun_bound: i64,
    ) -> Result<Self, RoutingError> {
        let links = link_count as i64;
        let bw_max = flows
            .iter()
            .try_fold(0i64, |acc, f| {
                f.rescaled_bandwidth.checked_mul(links)?.checked_add(acc)
            })
            .ok_or(RoutingError::ObjectiveOverflow)?;
        let congestion = bw_max.checked_add(1).ok_or(RoutingError::ObjectiveOverflow)?;
        let latency = congestion
            .checked_mul(links)
            .and_then(|v| v.checked_add(congestion))
            .ok_or(RoutingError::ObjectiveOverflow)?;

        // The objective's largest value must also fit.
        let constrained = flows.iter().filter(|f| f.hop_budget.is_some()).count() as i64;
        latency
            .checked_mul(overrun_bound)
            .and_then(|v| v.checked_mul(constrained))
            .and_then(|v| v.checked_add(congestion.checked_mul(links)?))
            .and_then(|v| v.checked_add(bw_max))
            .ok_or(RoutingError::ObjectiveOverflow)?;

        Ok(Self {
            congestion,
            latency,
        })
    }
}

/// A built routing model and the handles needed to read a solution back.
#[derive(Debug)]
pub(crate) struct RoutingModel {
    pub(crate) model: CpModel,
    flow_links: Vec<Vec<BoolVar>>,
    congested: Vec<BoolVar>,
    overruns: Vec<Option<IntVar>>,
    overrun_total: LinearExpr,
    weighted_objective: LinearExpr,
}

impl RoutingModel {
    /// Builds the model.
    ///
    /// `directions[l]` is the direction of link `l`; `hints[f]` is a route
    /// suggested for flow `f` (may be empty).
    pub(crate) fn build(
        topology: &NocTopology,
        flows: &[ResolvedFlow],
        directions: &[LinkDirection],
        illegal_turns: &[(LinkId, LinkId)],
        hints: &[Vec<LinkId>],
        resolution: i64,
        objective: RoutingObjective,
    ) -> Result<Self, RoutingError> {
        let link_count = topology.link_count();
        let overrun_bound = MIN_OVERRUN_BOUND.max(link_count as i64);
        let weights = ObjectiveWeights::compute(flows, link_count, overrun_bound)?;
        let mut b = CpModelBuilder::new();

        let flow_links: Vec<Vec<BoolVar>> = flows
            .iter()
            .map(|_| (0..link_count).map(|_| b.new_bool_var()).collect())
            .collect();
        let congested: Vec<BoolVar> = (0..link_count).map(|_| b.new_bool_var()).collect();

        // Hop counts, bounded below by the compressed Manhattan distance so the
        // objective has a useful lower bound before any path is fixed.
        let hops: Vec<IntVar> = flows
            .iter()
            .zip(&flow_links)
            .map(|(flow, vars)| {
                let min = if flow.is_local() {
                    0
                } else {
                    manhattan_distance(topology, flow.source, flow.sink)
                };
                let h = b.new_int_var(min, min.max(link_count as i64));
                b.add_eq(vars.iter().copied().collect::<LinearExpr>(), h);
                h
            })
            .collect();

        // Latency overrun: max(0, links used − budget).
        let mut overrun_total = LinearExpr::new();
        let mut overruns = Vec::with_capacity(flows.len());
        for (flow, &h) in flows.iter().zip(&hops) {
            let Some(budget) = flow.hop_budget else {
                overruns.push(None);
                continue;
            };
            let overrun = b.new_int_var(0, overrun_bound);
            b.add_max_equality(overrun, [LinearExpr::from(h) - budget, LinearExpr::constant(0)]);
            overrun_total += overrun;
            overruns.push(Some(overrun));
        }

        for &(first, second) in illegal_turns {
            for vars in &flow_links {
                b.add_bool_or([!vars[first.index()], !vars[second.index()]]);
            }
        }

        // Congested exactly when the rescaled load exceeds the resolution.
        for (l, &c) in congested.iter().enumerate() {
            let load = LinearExpr::weighted_sum(
                flows
                    .iter()
                    .zip(&flow_links)
                    .map(|(flow, vars)| (vars[l], flow.rescaled_bandwidth)),
            );
            let within = b.add_le(load.clone(), resolution);
            b.only_enforce_if(within, [!c]);
            let over = b.add_ge(load, resolution + 1);
            b.only_enforce_if(over, [c.literal()]);
        }

        for (flow, vars) in flows.iter().zip(&flow_links) {
            if flow.is_local() {
                for &x in vars {
                    b.add_eq(x, 0);
                }
                continue;
            }
            add_flow_conservation(&mut b, topology, flow, vars);
            add_geometric_progress(&mut b, topology, flow, vars, directions);
        }

        // Heaviest flows are routed first.
        let mut order: Vec<usize> = (0..flows.len()).filter(|&f| !flows[f].is_local()).collect();
        order.sort_by_key(|&f| std::cmp::Reverse(flows[f].rescaled_bandwidth));
        for f in order {
            add_path_branching(&mut b, topology, &flows[f], &flow_links[f]);
        }

        for (route, vars) in hints.iter().zip(&flow_links) {
            for link in route {
                if let Some(&x) = vars.get(link.index()) {
                    b.add_hint(x, 1);
                }
            }
        }

        let aggregate_bandwidth = LinearExpr::weighted_sum(
            flows
                .iter()
                .zip(&hops)
                .map(|(flow, &h)| (h, flow.rescaled_bandwidth)),
        );
        let congested_total: LinearExpr = congested.iter().copied().collect();
        let weighted_objective = overrun_total.clone() * weights.latency
            + congested_total * weights.congestion
            + aggregate_bandwidth.clone();

        match objective {
            RoutingObjective::Weighted => b.minimize(weighted_objective.clone()),
            RoutingObjective::AggregateBandwidth { total_overrun } => {
                b.add_eq(overrun_total.clone(), total_overrun);
                b.minimize(aggregate_bandwidth);
            }
        }

        let model = b.build();
        tracing::debug!(
            variables = model.num_vars(),
            constraints = model.num_constraints(),
            illegal_turns = illegal_turns.len(),
            "routing model built"
        );
        Ok(Self {
            model,
            flow_links,
            congested,
            overruns,
            overrun_total,
            weighted_objective,
        })
    }

    /// Links a flow uses in `response`, in link-id order.
    pub(crate) fn selected_links(&self, response: &SolverResponse, flow: usize) -> Vec<LinkId> {
        self.flow_links[flow]
            .iter()
            .enumerate()
            .filter(|&(_, &x)| response.bool_value(x))
            .map(|(l, _)| LinkId::from_raw(l as u32))
            .collect()
    }

    /// Links whose congestion indicator is set in `response`.
    pub(crate) fn congested_links(&self, response: &SolverResponse) -> Vec<LinkId> {
        self.congested
            .iter()
            .enumerate()
            .filter(|&(_, &c)| response.bool_value(c))
            .map(|(l, _)| LinkId::from_raw(l as u32))
            .collect()
    }

    /// Per-flow overrun values in `response`; `None` for unconstrained flows.
    pub(crate) fn overruns(&self, response: &SolverResponse) -> Vec<Option<i64>> {
        self.overruns
            .iter()
            .map(|o| o.map(|v| response.value(v)))
            .collect()
    }

    pub(crate) fn total_overrun(&self, response: &SolverResponse) -> i64 {
        response.eval(&self.overrun_total)
    }

    /// The weighted objective evaluated in `response`, whichever objective
    /// the model minimized.
    pub(crate) fn weighted_objective(&self, response: &SolverResponse) -> i64 {
        response.eval(&self.weighted_objective)
    }
}

/// One link out of the source, one into the sink, and through every other
/// router at most one link in, matched by exactly as many out.
fn add_flow_conservation(
    b: &mut CpModelBuilder,
    topology: &NocTopology,
    flow: &ResolvedFlow,
    vars: &[BoolVar],
) {
    let lits = |links: &[LinkId]| -> Vec<Literal> {
        links.iter().map(|l| vars[l.index()].literal()).collect()
    };
    for router in topology.router_ids() {
        let incoming = lits(topology.incoming_links(router));
        let outgoing = lits(topology.outgoing_links(router));
        if router == flow.source {
            b.add_exactly_one(outgoing);
            b.add_eq(incoming.into_iter().collect::<LinearExpr>(), 0);
        } else if router == flow.sink {
            b.add_exactly_one(incoming);
            b.add_eq(outgoing.into_iter().collect::<LinearExpr>(), 0);
        } else {
            b.add_at_most_one(incoming.iter().copied());
            b.add_at_most_one(outgoing.iter().copied());
            let inflow: LinearExpr = incoming.into_iter().collect();
            let outflow: LinearExpr = outgoing.into_iter().collect();
            b.add_eq(inflow, outflow);
        }
    }
}

/// Lets the search grow the flow's path hop by hop from its source, trying
/// the links that get closest to the sink first.
fn add_path_branching(
    b: &mut CpModelBuilder,
    topology: &NocTopology,
    flow: &ResolvedFlow,
    vars: &[BoolVar],
) {
    let mut arcs = Vec::with_capacity(vars.len());
    for router in topology.router_ids() {
        let mut outgoing = topology.outgoing_links(router).to_vec();
        outgoing.sort_by_key(|&l| manhattan_distance(topology, topology.link(l).sink, flow.sink));
        arcs.extend(outgoing.into_iter().map(|l| {
            (router.index(), topology.link(l).sink.index(), vars[l.index()])
        }));
    }
    b.add_path_strategy(flow.source.index(), arcs);
}

/// Hops between two routers in compressed coordinates.
fn manhattan_distance(topology: &NocTopology, a: RouterId, b: RouterId) -> i64 {
    let (ax, ay) = topology.compressed_location(a);
    let (bx, by) = topology.compressed_location(b);
    i64::from((bx - ax).abs() + (by - ay).abs())
}

/// Net eastward and northward links equal the compressed displacement from
/// source to sink.
fn add_geometric_progress(
    b: &mut CpModelBuilder,
    topology: &NocTopology,
    flow: &ResolvedFlow,
    vars: &[BoolVar],
    directions: &[LinkDirection],
) {
    let (sx, sy) = topology.compressed_location(flow.source);
    let (tx, ty) = topology.compressed_location(flow.sink);
    let mut horizontal = LinearExpr::new();
    let mut vertical = LinearExpr::new();
    for (&x, &dir) in vars.iter().zip(directions) {
        match dir {
            LinkDirection::East => horizontal.add_term(x, 1),
            LinkDirection::West => horizontal.add_term(x, -1),
            LinkDirection::North => vertical.add_term(x, 1),
            LinkDirection::South => vertical.add_term(x, -1),
        };
    }
    b.add_eq(horizontal, tx - sx);
    b.add_eq(vertical, ty - sy);
}
