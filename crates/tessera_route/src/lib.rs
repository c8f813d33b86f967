//! Constraint-based routing of traffic flows over a Network-on-Chip.
//!
//! Given a [`NocTopology`](tessera_noc::NocTopology) and a registry of
//! [`TrafficFlows`], [`noc_sat_route`] selects one deadlock-free path per flow
//! by solving a constraint model:
//!
//! 1. **Resolve**: map each flow's router clusters to routers through the
//!    [`RouterPlacement`] and rescale its demand to integer units.
//! 2. **Model**: one boolean per (flow, link), flow conservation, geometric
//!    progress, forbidden turns, congestion indicators and latency overrun
//!    counters under a prioritized objective.
//! 3. **Solve**: hand the model to a [`CpBackend`], optionally followed by a
//!    bandwidth refinement solve.
//! 4. **Extract**: order each flow's selected links into a route.
//!
//! [`analyze_routes`] measures any set of routes after the fact.

#![warn(missing_docs)]

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod model;
pub mod outcome;
pub mod report;
pub mod traffic;

pub use context::RoutingContext;
pub use error::RoutingError;
pub use extract::order_route;
pub use model::{hop_budget, rescale_bandwidth};
pub use outcome::{
    RoutingOutcome, SatRoutingParams, DEFAULT_BANDWIDTH_RESOLUTION, DEFAULT_TIME_LIMIT,
    MAX_BANDWIDTH_RESOLUTION,
};
pub use report::{analyze_routes, FlowReport, LinkUsage, RoutingReport};
pub use traffic::{FlowId, RouterPlacement, TrafficFlow, TrafficFlows};

use model::{ResolvedFlow, RoutingModel, RoutingObjective};
use tessera_common::{Ident, InternalError};
use tessera_cpsat::{CpBackend, SolverResponse, SolverStatus};
use tessera_diagnostics::DiagnosticSink;
use tessera_noc::{LinkDirection, LinkId, NocTopology, RouterId};

/// Routes every flow in `ctx` and returns one ordered link sequence per flow.
///
/// Infeasible problems and solves that stop without a solution are not
/// errors: the outcome carries the status and no routes, and a diagnostic is
/// emitted. Errors are reserved for inputs the model cannot express and for
/// defects in the model itself.
pub fn noc_sat_route(
    ctx: &RoutingContext<'_>,
    params: &SatRoutingParams,
    backend: &dyn CpBackend,
    sink: &DiagnosticSink,
) -> Result<RoutingOutcome, RoutingError> {
    let span = tracing::info_span!(
        "noc_sat_route",
        flows = ctx.flows.len(),
        links = ctx.topology.link_count(),
        backend = backend.name()
    );
    let _enter = span.enter();

    let resolution = params.bandwidth_resolution;
    if !(1..=MAX_BANDWIDTH_RESOLUTION).contains(&resolution) {
        return Err(RoutingError::InvalidResolution(resolution));
    }
    let link_bandwidth = ctx.topology.link_bandwidth();
    if !(link_bandwidth > 0.0) {
        return Err(RoutingError::NonPositiveLinkBandwidth(link_bandwidth));
    }
    if ctx.flows.is_empty() {
        return Ok(RoutingOutcome::empty(SolverStatus::Optimal));
    }

    let flows = resolve_flows(ctx, resolution, sink)?;
    let directions = link_directions(ctx.topology)?;
    let turns = ctx.turn_model.illegal_turns(ctx.topology);
    tracing::debug!(
        turn_model = ctx.turn_model.name(),
        illegal_turns = turns.len(),
        "collected forbidden turns"
    );
    let hints: Vec<Vec<LinkId>> = ctx.flows.flows().iter().map(|f| f.route.clone()).collect();
    let solver_params = params.solver_params();

    let model = RoutingModel::build(
        ctx.topology,
        &flows,
        &directions,
        &turns,
        &hints,
        resolution,
        RoutingObjective::Weighted,
    )?;
    let response = backend.solve(&model.model, &solver_params);
    log_solve("primary", &response);
    match ensure_valid(response)? {
        response if response.status.has_solution() => {
            let mut routes = extract_routes(ctx.topology, &flows, &model, &response)?;
            let mut status = response.status;
            let mut chosen = (model, response);

            if params.minimize_aggregate_bandwidth {
                let total_overrun = chosen.0.total_overrun(&chosen.1);
                let refined_model = RoutingModel::build(
                    ctx.topology,
                    &flows,
                    &directions,
                    &turns,
                    &routes,
                    resolution,
                    RoutingObjective::AggregateBandwidth { total_overrun },
                )?;
                let refined = ensure_valid(backend.solve(&refined_model.model, &solver_params))?;
                log_solve("bandwidth refinement", &refined);
                if refined.status.has_solution() {
                    routes = extract_routes(ctx.topology, &flows, &refined_model, &refined)?;
                    if refined.status == SolverStatus::Feasible {
                        status = SolverStatus::Feasible;
                    }
                    chosen = (refined_model, refined);
                } else {
                    sink.emit(diagnostics::note_refinement_fallback(refined.status));
                }
            }

            let (model, response) = chosen;
            Ok(finish(ctx, &flows, &model, &response, status, routes, sink))
        }
        response => {
            if response.status == SolverStatus::Infeasible {
                sink.emit(diagnostics::warn_infeasible(flows.len()));
            } else {
                sink.emit(diagnostics::warn_no_solution());
            }
            Ok(RoutingOutcome::empty(response.status))
        }
    }
}

fn finish(
    ctx: &RoutingContext<'_>,
    flows: &[ResolvedFlow],
    model: &RoutingModel,
    response: &SolverResponse,
    status: SolverStatus,
    routes: Vec<Vec<LinkId>>,
    sink: &DiagnosticSink,
) -> RoutingOutcome {
    let objective = model.weighted_objective(response);
    if status == SolverStatus::Feasible {
        sink.emit(diagnostics::note_not_proven_optimal(objective));
    }

    let congested_links = model.congested_links(response);
    if !congested_links.is_empty() {
        let described: Vec<String> = congested_links
            .iter()
            .map(|&l| describe_link(ctx.topology, l))
            .collect();
        sink.emit(diagnostics::warn_congested_links(&described));
    }

    let latency_overruns: Vec<(FlowId, i64)> = model
        .overruns(response)
        .into_iter()
        .enumerate()
        .filter_map(|(f, o)| match o {
            Some(hops) if hops > 0 => Some((FlowId::from_raw(f as u32), hops)),
            _ => None,
        })
        .collect();
    if !latency_overruns.is_empty() {
        let named: Vec<(String, i64)> = latency_overruns
            .iter()
            .map(|&(f, hops)| (flows[f.index()].name.clone(), hops))
            .collect();
        sink.emit(diagnostics::warn_latency_overrun(&named));
    }

    RoutingOutcome {
        status,
        routes,
        objective: Some(objective),
        congested_links,
        latency_overruns,
    }
}

fn log_solve(phase: &str, response: &SolverResponse) {
    tracing::info!(
        phase,
        status = %response.status,
        objective = ?response.objective_value,
        branches = response.num_branches,
        wall_time_ms = response.wall_time.as_millis() as u64,
        "solve finished"
    );
}

/// A model the solver rejects was built wrong.
fn ensure_valid(response: SolverResponse) -> Result<SolverResponse, RoutingError> {
    if response.status == SolverStatus::ModelInvalid {
        let reason = response.validation_error.unwrap_or_default();
        return Err(InternalError::new(format!("routing model is invalid: {reason}")).into());
    }
    Ok(response)
}

fn resolve_flows(
    ctx: &RoutingContext<'_>,
    resolution: i64,
    sink: &DiagnosticSink,
) -> Result<Vec<ResolvedFlow>, RoutingError> {
    let topology = ctx.topology;
    ctx.flows
        .flows()
        .iter()
        .map(|flow| {
            let name = ctx.interner.resolve(flow.name).to_string();
            if !flow.bandwidth.is_finite() || flow.bandwidth < 0.0 {
                return Err(RoutingError::InvalidFlowBandwidth {
                    flow: name,
                    bandwidth: flow.bandwidth,
                });
            }
            let source = resolve_cluster(ctx, &name, flow.source)?;
            let dest = resolve_cluster(ctx, &name, flow.sink)?;

            let rescaled_bandwidth =
                rescale_bandwidth(flow.bandwidth, topology.link_bandwidth(), resolution);
            if rescaled_bandwidth == 0 && flow.bandwidth > 0.0 {
                sink.emit(diagnostics::warn_zero_rescaled_bandwidth(
                    &name,
                    flow.bandwidth,
                    resolution,
                ));
            }
            if source == dest {
                sink.emit(diagnostics::note_local_flow(&name));
            }
            Ok(ResolvedFlow {
                name,
                source,
                sink: dest,
                rescaled_bandwidth,
                hop_budget: hop_budget(
                    flow.max_latency,
                    topology.link_latency(),
                    topology.router_latency(),
                ),
            })
        })
        .collect()
}

fn resolve_cluster(
    ctx: &RoutingContext<'_>,
    flow: &str,
    cluster: Ident,
) -> Result<RouterId, RoutingError> {
    let cluster_name = || ctx.interner.resolve(cluster).to_string();
    let location = ctx
        .placement
        .location(cluster)
        .ok_or_else(|| RoutingError::UnplacedCluster {
            flow: flow.to_string(),
            cluster: cluster_name(),
        })?;
    ctx.topology
        .router_at_location(location)
        .ok_or_else(|| RoutingError::NoRouterAtLocation {
            cluster: cluster_name(),
            location,
        })
}

fn link_directions(topology: &NocTopology) -> Result<Vec<LinkDirection>, RoutingError> {
    topology
        .link_ids()
        .map(|l| {
            topology
                .link_direction(l)
                .ok_or(RoutingError::UnclassifiableLink(l))
        })
        .collect()
}

fn extract_routes(
    topology: &NocTopology,
    flows: &[ResolvedFlow],
    model: &RoutingModel,
    response: &SolverResponse,
) -> Result<Vec<Vec<LinkId>>, RoutingError> {
    flows
        .iter()
        .enumerate()
        .map(|(f, flow)| {
            let selected = model.selected_links(response, f);
            order_route(topology, &flow.name, flow.source, flow.sink, &selected)
                .map_err(RoutingError::from)
        })
        .collect()
}

fn describe_link(topology: &NocTopology, link: LinkId) -> String {
    let l = topology.link(link);
    format!(
        "{link} (router {} -> {})",
        topology.router(l.source).user_id,
        topology.router(l.sink).user_id
    )
}
