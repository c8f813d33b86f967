//! `tessera check`: validates a project without routing it.
//!
//! Loads `tessera.toml`, builds the NoC topology, and confirms that every
//! flow endpoint lands on a router and every link is horizontal or vertical.

use serde::Serialize;
use tessera_diagnostics::{DiagnosticSink, Severity};
use tessera_route::RoutingError;

use crate::diagnostics;
use crate::pipeline::{load_project, render_diagnostics, Project};
use crate::{CheckArgs, GlobalArgs, ReportFormat};

/// What a successful check found.
#[derive(Debug, Serialize)]
pub struct CheckSummary {
    /// Routers in the topology.
    pub routers: usize,
    /// Directed links in the topology.
    pub links: usize,
    /// Declared traffic flows.
    pub flows: usize,
    /// Placed router clusters.
    pub clusters: usize,
    /// Content hash of the topology.
    pub fingerprint: String,
}

/// Runs the `tessera check` command.
///
/// Returns exit code 0 if the project is routable input, 1 otherwise.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let sink = DiagnosticSink::new();
    let summary = check_project(global, &sink)?;
    let diagnostics = sink.diagnostics();

    match args.format {
        ReportFormat::Text => {
            render_diagnostics(&diagnostics, global.color);
            if let Some(ref s) = summary {
                if !global.quiet {
                    eprintln!(
                        "   Checked {} routers, {} links, {} flows, {} clusters (topology {})",
                        s.routers, s.links, s.flows, s.clusters, s.fingerprint
                    );
                }
            }
        }
        ReportFormat::Json => {
            let json = serde_json::json!({
                "summary": summary,
                "diagnostics": diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    Ok(if errors > 0 { 1 } else { 0 })
}

/// Loads the project and checks it, emitting every problem to `sink`.
///
/// Returns `None` when the topology could not be built.
pub fn check_project(
    global: &GlobalArgs,
    sink: &DiagnosticSink,
) -> Result<Option<CheckSummary>, Box<dyn std::error::Error>> {
    let Some(project) = load_project(global, sink)? else {
        return Ok(None);
    };
    check_endpoints(&project, sink);
    check_links(&project, sink);

    let topology = &project.topology;
    Ok(Some(CheckSummary {
        routers: topology.router_count(),
        links: topology.link_count(),
        flows: project.flows.len(),
        clusters: project.placement.len(),
        fingerprint: topology.fingerprint().to_string(),
    }))
}

fn check_endpoints(project: &Project, sink: &DiagnosticSink) {
    let interner = &project.interner;
    let mut seen = Vec::new();
    for flow in project.flows.flows() {
        for cluster in [flow.source, flow.sink] {
            if seen.contains(&cluster) {
                continue;
            }
            seen.push(cluster);
            let err = match project.placement.location(cluster) {
                None => RoutingError::UnplacedCluster {
                    flow: interner.resolve(flow.name).to_string(),
                    cluster: interner.resolve(cluster).to_string(),
                },
                Some(location) if project.topology.router_at_location(location).is_none() => {
                    RoutingError::NoRouterAtLocation {
                        cluster: interner.resolve(cluster).to_string(),
                        location,
                    }
                }
                Some(_) => continue,
            };
            if let Some(diag) = diagnostics::routing_error(&err) {
                sink.emit(diag);
            }
        }
    }
}

fn check_links(project: &Project, sink: &DiagnosticSink) {
    let topology = &project.topology;
    for link in topology.link_ids() {
        if topology.link_direction(link).is_none() {
            if let Some(diag) = diagnostics::routing_error(&RoutingError::UnclassifiableLink(link)) {
                sink.emit(diag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{global_for, write_project, LINE};
    use tempfile::TempDir;

    fn check(toml: &str) -> (Option<CheckSummary>, Vec<String>) {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), toml);
        let sink = DiagnosticSink::new();
        let summary = check_project(&global_for(tmp.path()), &sink).unwrap();
        let codes = sink
            .diagnostics()
            .iter()
            .map(|d| d.code.to_string())
            .collect();
        (summary, codes)
    }

    #[test]
    fn valid_project_is_summarized() {
        let (summary, codes) = check(LINE);
        let summary = summary.unwrap();
        assert!(codes.is_empty(), "{codes:?}");
        assert_eq!(summary.routers, 3);
        assert_eq!(summary.links, 4);
        assert_eq!(summary.flows, 1);
        assert_eq!(summary.clusters, 2);
        assert_eq!(summary.fingerprint.len(), 32);
    }

    #[test]
    fn cluster_off_router_is_reported() {
        let (summary, codes) = check(&LINE.replace("mem = { x = 6, y = 0 }", "mem = { x = 5, y = 0 }"));
        assert!(summary.is_some());
        assert_eq!(codes, vec!["R011"]);
    }

    #[test]
    fn diagonal_link_is_reported() {
        let toml = LINE
            .replace("width = 7\nheight = 1", "width = 7\nheight = 4")
            .replace("x = 6\ny = 0", "x = 6\ny = 3")
            .replace("x = 6.0\ny = 0.0", "x = 6.0\ny = 3.0")
            .replace("mem = { x = 6, y = 0 }", "mem = { x = 6, y = 3 }");
        let (_, codes) = check(&toml);
        // Both directions of the 11 <-> 12 link.
        assert_eq!(codes, vec!["R015", "R015"]);
    }

    #[test]
    fn too_few_logical_routers_stops_the_check() {
        let toml = LINE.replace("x = 3\ny = 0", "x = 3\ny = 0\n\n[[device.tiles]]\ntile_type = \"noc_router\"\nx = 5\ny = 0");
        let (summary, codes) = check(&toml);
        assert!(summary.is_none());
        assert_eq!(codes, vec!["N003"]);
    }

    #[test]
    fn run_returns_exit_code() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), LINE);
        let args = CheckArgs {
            format: ReportFormat::Json,
        };
        assert_eq!(run(&args, &global_for(tmp.path())).unwrap(), 0);

        write_project(tmp.path(), "[device]\nwidth = 0\n");
        assert_eq!(run(&args, &global_for(tmp.path())).unwrap(), 1);
    }

    #[test]
    fn missing_project_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let args = CheckArgs {
            format: ReportFormat::Text,
        };
        assert!(run(&args, &global_for(&tmp.path().join("absent"))).is_err());
    }
}
