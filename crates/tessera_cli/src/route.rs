//! `tessera route`: routes every traffic flow of a project.
//!
//! The pipeline:
//!
//! 1. Load `tessera.toml` and build the NoC topology
//! 2. Merge command-line overrides into the `[routing]` settings
//! 3. Solve with the branch-and-bound backend
//! 4. Measure the routes and print them with the diagnostics

use serde::Serialize;
use tessera_config::{resolve_routing, RoutingOverrides};
use tessera_cpsat::{BranchAndBound, SolverStatus};
use tessera_diagnostics::{DiagnosticSink, Severity};
use tessera_noc::{LinkId, NocTopology};
use tessera_route::{
    analyze_routes, noc_sat_route, RoutingContext, RoutingOutcome, RoutingReport, TrafficFlow,
};

use crate::diagnostics;
use crate::pipeline::{load_project, render_diagnostics, sat_params, turn_model_kind, Project};
use crate::{GlobalArgs, ReportFormat, RouteArgs};

/// The printed result of a routing run.
#[derive(Debug, Serialize)]
pub struct RouteReport {
    /// How the solve ended.
    pub status: SolverStatus,
    /// Weighted objective of the routing.
    pub objective: Option<i64>,
    /// Name of the turn model used.
    pub turn_model: String,
    /// One entry per flow, in declaration order. Empty without a routing.
    pub flows: Vec<RoutedFlow>,
    /// Links whose rescaled load exceeds the resolution.
    pub congested_links: Vec<CongestedLink>,
    /// Sum of the hops beyond each flow's budget.
    pub total_overrun: i64,
    /// Sum of rescaled load over all links.
    pub aggregate_bandwidth: i64,
}

/// A routed flow, with routers named by their user ids.
#[derive(Debug, Serialize)]
pub struct RoutedFlow {
    /// Flow name.
    pub name: String,
    /// Source cluster.
    pub source: String,
    /// Sink cluster.
    pub sink: String,
    /// Routers visited, source first.
    pub routers: Vec<u32>,
    /// Links taken, in order.
    pub links: Vec<u32>,
    /// End-to-end latency.
    pub latency: f64,
    /// Links allowed by the latency bound.
    pub hop_budget: Option<i64>,
    /// Links beyond the budget.
    pub overrun: i64,
}

/// A link carrying more than its capacity.
#[derive(Debug, Serialize)]
pub struct CongestedLink {
    /// Link id.
    pub link: u32,
    /// User id of the upstream router.
    pub from: u32,
    /// User id of the downstream router.
    pub to: u32,
    /// Rescaled load on the link.
    pub rescaled_load: i64,
    /// Flows sharing the link.
    pub flows: usize,
}

/// Runs the `tessera route` command.
///
/// Returns exit code 0 if every flow was routed without errors, 1 otherwise.
pub fn run(args: &RouteArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let sink = DiagnosticSink::new();
    let report = route_project(args, global, &sink)?;
    let diagnostics = sink.diagnostics();

    match args.format {
        ReportFormat::Text => {
            render_diagnostics(&diagnostics, global.color);
            if let Some(ref r) = report {
                print_text(r, global.quiet);
            }
        }
        ReportFormat::Json => {
            let json = serde_json::json!({
                "routing": report,
                "diagnostics": diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    let failed = diagnostics.iter().any(|d| d.severity == Severity::Error)
        || !report.as_ref().is_some_and(|r| r.status.has_solution());
    Ok(if failed { 1 } else { 0 })
}

/// Loads, solves and measures the project, emitting findings to `sink`.
///
/// Returns `None` when the project has errors that prevent routing.
pub fn route_project(
    args: &RouteArgs,
    global: &GlobalArgs,
    sink: &DiagnosticSink,
) -> Result<Option<RouteReport>, Box<dyn std::error::Error>> {
    let Some(project) = load_project(global, sink)? else {
        return Ok(None);
    };

    let overrides = RoutingOverrides {
        bandwidth_resolution: args.resolution,
        seed: args.seed,
        time_limit_secs: args.time_limit,
        workers: args.workers,
        minimize_aggregate_bandwidth: args.minimize_aggregate_bandwidth.then_some(true),
        turn_model: args.turn_model.map(Into::into),
        log_search_progress: args.log_search_progress.then_some(true),
    };
    let routing = match resolve_routing(&project.config, &overrides) {
        Ok(routing) => routing,
        Err(e) => {
            sink.emit(diagnostics::config_error(&e));
            return Ok(None);
        }
    };
    let params = sat_params(&routing)?;
    let turn_model = turn_model_kind(routing.turn_model);

    let ctx = RoutingContext::new(
        &project.topology,
        &project.flows,
        &project.placement,
        turn_model.model(),
        &project.interner,
    );
    let outcome = match noc_sat_route(&ctx, &params, &BranchAndBound, sink) {
        Ok(outcome) => outcome,
        Err(e) => match diagnostics::routing_error(&e) {
            Some(diag) => {
                sink.emit(diag);
                return Ok(None);
            }
            None => return Err(e.into()),
        },
    };

    let analysis = analyze_routes(
        &project.topology,
        &project.flows,
        &outcome.routes,
        params.bandwidth_resolution,
    );
    Ok(Some(build_report(
        &project,
        &outcome,
        &analysis,
        &turn_model.to_string(),
    )))
}

fn build_report(
    project: &Project,
    outcome: &RoutingOutcome,
    analysis: &RoutingReport,
    turn_model: &str,
) -> RouteReport {
    let topology = &project.topology;
    let flows = project
        .flows
        .flows()
        .iter()
        .zip(&outcome.routes)
        .zip(&analysis.flows)
        .map(|((flow, route), metrics)| RoutedFlow {
            name: project.interner.resolve(flow.name).to_string(),
            source: project.interner.resolve(flow.source).to_string(),
            sink: project.interner.resolve(flow.sink).to_string(),
            routers: visited_routers(project, flow, route),
            links: route.iter().map(|l| l.as_raw()).collect(),
            latency: metrics.latency,
            hop_budget: metrics.hop_budget,
            overrun: metrics.overrun,
        })
        .collect();

    let congested_links = analysis
        .links
        .iter()
        .filter(|u| u.congested)
        .map(|u| {
            let link = topology.link(u.link);
            CongestedLink {
                link: u.link.as_raw(),
                from: topology.router(link.source).user_id,
                to: topology.router(link.sink).user_id,
                rescaled_load: u.rescaled_load,
                flows: u.flows,
            }
        })
        .collect();

    RouteReport {
        status: outcome.status,
        objective: outcome.objective,
        turn_model: turn_model.to_string(),
        flows,
        congested_links,
        total_overrun: analysis.total_overrun(),
        aggregate_bandwidth: analysis.aggregate_bandwidth(),
    }
}

/// User ids of the routers on `route`. A local flow visits its one router.
fn visited_routers(project: &Project, flow: &TrafficFlow, route: &[LinkId]) -> Vec<u32> {
    let topology: &NocTopology = &project.topology;
    match route.first() {
        Some(&first) => std::iter::once(topology.link(first).source)
            .chain(route.iter().map(|&l| topology.link(l).sink))
            .map(|r| topology.router(r).user_id)
            .collect(),
        None => project
            .placement
            .location(flow.source)
            .and_then(|loc| topology.router_at_location(loc))
            .map(|r| vec![topology.router(r).user_id])
            .unwrap_or_default(),
    }
}

fn print_text(report: &RouteReport, quiet: bool) {
    for flow in &report.flows {
        let path: Vec<String> = flow.routers.iter().map(|r| r.to_string()).collect();
        let mut line = format!(
            "{} ({} -> {}): {}  [{} hops, latency {}",
            flow.name,
            flow.source,
            flow.sink,
            path.join(" -> "),
            flow.links.len(),
            flow.latency
        );
        if flow.overrun > 0 {
            line.push_str(&format!(", {} over budget", flow.overrun));
        }
        line.push(']');
        println!("{line}");
    }
    if !quiet {
        let objective = report
            .objective
            .map_or_else(|| "none".to_string(), |o| o.to_string());
        eprintln!(
            "   Result: {} (objective {objective}, turn model {}), {} congested link(s), total overrun {}",
            report.status,
            report.turn_model,
            report.congested_links.len(),
            report.total_overrun
        );
    }
}
