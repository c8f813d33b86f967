//! Shared pipeline helpers for CLI commands.
//!
//! Locates and loads `tessera.toml`, builds the device grid and NoC topology
//! from it, and registers the traffic flows and cluster placement that
//! `check` and `route` both need.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tessera_common::Interner;
use tessera_config::{
    ConfigError, DeviceConfig, NocConfig, ProjectConfig, RoutingConfig, TurnModelName,
    CONFIG_FILE_NAME,
};
use tessera_diagnostics::{Diagnostic, DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use tessera_noc::{
    setup_noc, DeviceGrid, GridLocation, LinkId, LogicalRouter, NocArchitecture, NocTopology,
    PhysicalTileType, TopologyError, TurnModelKind,
};
use tessera_route::{RouterPlacement, SatRoutingParams, TrafficFlows};

use crate::diagnostics;
use crate::GlobalArgs;

/// Everything built from a project before routing.
pub struct Project {
    /// The validated configuration.
    pub config: ProjectConfig,
    /// The NoC topology bound to the device grid.
    pub topology: NocTopology,
    /// Flow and cluster names.
    pub interner: Interner,
    /// The flows in declaration order.
    pub flows: TrafficFlows,
    /// Cluster locations.
    pub placement: RouterPlacement,
}

/// Walks up from `start` looking for the nearest directory containing `tessera.toml`.
///
/// Returns the directory containing `tessera.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the configuration file from global CLI args.
///
/// If `--config` names a file, that file is used; if it names a directory,
/// its `tessera.toml` is. Otherwise walks up from the current directory.
pub fn resolve_config_file(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p)
        } else if p.is_dir() {
            Ok(p.join(CONFIG_FILE_NAME))
        } else {
            Err(format!("config path '{config_path}' does not exist").into())
        }
    } else {
        let cwd = std::env::current_dir()?;
        Ok(find_project_root(&cwd)?.join(CONFIG_FILE_NAME))
    }
}

/// Reads and validates a configuration file.
pub fn load_project_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    tessera_config::load_config_from_str(&content)
}

/// Loads the project and builds its topology, flows and placement.
///
/// Configuration and topology problems are emitted to `sink` as error
/// diagnostics and yield `Ok(None)`; only an unresolvable project path is
/// returned as an error.
pub fn load_project(
    global: &GlobalArgs,
    sink: &DiagnosticSink,
) -> Result<Option<Project>, Box<dyn std::error::Error>> {
    let path = resolve_config_file(global)?;
    tracing::debug!(path = %path.display(), "loading project");

    let config = match load_project_config(&path) {
        Ok(config) => config,
        Err(e) => {
            sink.emit(diagnostics::config_error(&e).with_note(format!("in {}", path.display())));
            return Ok(None);
        }
    };
    let topology = match build_topology(&config) {
        Ok(topology) => topology,
        Err(e) => {
            sink.emit(diagnostics::topology_error(&e));
            return Ok(None);
        }
    };
    let interner = Interner::new();
    let (flows, placement) = build_traffic(&config, &topology, &interner, sink);
    Ok(Some(Project {
        config,
        topology,
        interner,
        flows,
        placement,
    }))
}

/// Builds the physical tile grid described by `[device]`.
pub fn build_grid(device: &DeviceConfig) -> Result<DeviceGrid, TopologyError> {
    let mut grid = DeviceGrid::new(device.width, device.height, device.layers, &device.fill);
    for ty in &device.tile_types {
        grid.add_tile_type(PhysicalTileType::new(&ty.name, ty.width, ty.height));
    }
    for tile in &device.tiles {
        let ty = grid
            .tile_type_by_name(&tile.tile_type)
            .ok_or_else(|| TopologyError::UnknownTileType(tile.tile_type.clone()))?;
        grid.place_tile(ty, to_coord(tile.x), to_coord(tile.y), to_coord(tile.layer))?;
    }
    Ok(grid)
}

/// Values past `i32::MAX` are out of bounds for every grid.
fn to_coord(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Converts `[noc]` into the architecture description.
pub fn build_architecture(noc: &NocConfig) -> NocArchitecture {
    NocArchitecture {
        router_tile_name: noc.router_tile_name.clone(),
        link_bandwidth: noc.link_bandwidth,
        link_latency: noc.link_latency,
        router_latency: noc.router_latency,
        routers: noc
            .routers
            .iter()
            .map(|r| LogicalRouter {
                id: r.id,
                x: r.x,
                y: r.y,
                layer: r.layer,
                connections: r.connections.clone(),
            })
            .collect(),
    }
}

/// Builds the grid and binds the architecture to it.
pub fn build_topology(config: &ProjectConfig) -> Result<NocTopology, TopologyError> {
    let grid = build_grid(&config.device)?;
    setup_noc(&grid, &build_architecture(&config.noc))
}

/// Registers the flows and cluster placement.
///
/// Stored routes become warm-start hints. A stored route that references a
/// link the topology does not have is dropped with a warning.
pub fn build_traffic(
    config: &ProjectConfig,
    topology: &NocTopology,
    interner: &Interner,
    sink: &DiagnosticSink,
) -> (TrafficFlows, RouterPlacement) {
    let mut placement = RouterPlacement::new();
    for (cluster, loc) in &config.placement {
        placement.place(
            interner.get_or_intern(cluster),
            GridLocation::with_layer(loc.x, loc.y, loc.layer),
        );
    }

    let mut flows = TrafficFlows::new();
    for flow in &config.flows {
        let id = flows.add_flow(
            interner.get_or_intern(&flow.name),
            interner.get_or_intern(&flow.source),
            interner.get_or_intern(&flow.sink),
            flow.bandwidth,
            flow.max_latency,
        );
        if flow.route.is_empty() {
            continue;
        }
        match flow
            .route
            .iter()
            .find(|&&l| l as usize >= topology.link_count())
        {
            Some(&link) => sink.emit(diagnostics::warn_stale_route(&flow.name, link)),
            None => flows.set_route(id, flow.route.iter().map(|&l| LinkId::from_raw(l)).collect()),
        }
    }
    (flows, placement)
}

/// Maps the configured turn model to its implementation.
pub fn turn_model_kind(name: TurnModelName) -> TurnModelKind {
    match name {
        TurnModelName::Xy => TurnModelKind::Xy,
        TurnModelName::WestFirst => TurnModelKind::WestFirst,
        TurnModelName::NorthLast => TurnModelKind::NorthLast,
        TurnModelName::NegativeFirst => TurnModelKind::NegativeFirst,
    }
}

/// Converts resolved `[routing]` settings into solver parameters.
pub fn sat_params(routing: &RoutingConfig) -> Result<SatRoutingParams, Box<dyn std::error::Error>> {
    let time_limit = routing
        .time_limit_secs
        .map(Duration::try_from_secs_f64)
        .transpose()
        .map_err(|e| format!("invalid time limit: {e}"))?;
    Ok(SatRoutingParams {
        bandwidth_resolution: routing.bandwidth_resolution,
        seed: routing.seed,
        minimize_aggregate_bandwidth: routing.minimize_aggregate_bandwidth,
        time_limit,
        num_workers: routing.workers,
        log_search_progress: routing.log_search_progress,
    })
}

/// Renders diagnostics to stderr using the terminal renderer.
///
/// Returns the number of diagnostics rendered.
pub fn render_diagnostics(diagnostics: &[Diagnostic], color: bool) -> usize {
    let renderer = TerminalRenderer::new(color);
    for diag in diagnostics {
        eprintln!("{}", renderer.render(diag));
    }
    diagnostics.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{global_for, write_project, LINE};
    use std::fs;
    use tempfile::TempDir;

    // -- find_project_root tests --

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), LINE);
        let root = find_project_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), LINE);
        let sub = tmp.path().join("nested").join("deeper");
        fs::create_dir_all(&sub).unwrap();
        let root = find_project_root(&sub).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = find_project_root(tmp.path());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("could not find tessera.toml"));
    }

    // -- resolve_config_file tests --

    #[test]
    fn config_flag_accepts_file_or_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("alt.toml");
        fs::write(&file, LINE).unwrap();
        assert_eq!(resolve_config_file(&global_for(&file)).unwrap(), file);
        assert_eq!(
            resolve_config_file(&global_for(tmp.path())).unwrap(),
            tmp.path().join(CONFIG_FILE_NAME)
        );
    }

    #[test]
    fn config_flag_missing_path_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        let err = resolve_config_file(&global_for(&missing)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    // -- project loading tests --

    #[test]
    fn load_project_builds_topology_and_flows() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), LINE);
        let sink = DiagnosticSink::new();
        let project = load_project(&global_for(tmp.path()), &sink)
            .unwrap()
            .expect("valid project");
        assert!(sink.diagnostics().is_empty());
        assert_eq!(project.topology.router_count(), 3);
        assert_eq!(project.topology.link_count(), 4);
        assert_eq!(project.flows.len(), 1);
        assert_eq!(project.placement.len(), 2);

        let f0 = project.flows.flows()[0].id;
        assert_eq!(
            project.flows.route(f0),
            &[LinkId::from_raw(0), LinkId::from_raw(2)]
        );
        assert_eq!(project.interner.resolve(project.flows.flow(f0).source), "cpu");
    }

    #[test]
    fn invalid_config_is_reported_as_diagnostic() {
        let tmp = TempDir::new().unwrap();
        let toml = LINE.replace("link_bandwidth = 100.0", "link_bandwidth = -1.0");
        write_project(tmp.path(), &toml);
        let sink = DiagnosticSink::new();
        let project = load_project(&global_for(tmp.path()), &sink).unwrap();
        assert!(project.is_none());
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.to_string(), "C006");
        assert!(diags[0].notes[0].contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn topology_error_is_reported_as_diagnostic() {
        let tmp = TempDir::new().unwrap();
        // Router 11 now sits exactly between the tiles at x = 0 and x = 3.
        let toml = LINE.replace("x = 3.0", "x = 1.5");
        write_project(tmp.path(), &toml);
        let sink = DiagnosticSink::new();
        assert!(load_project(&global_for(tmp.path()), &sink)
            .unwrap()
            .is_none());
        assert_eq!(sink.diagnostics()[0].code.to_string(), "N004");
    }

    #[test]
    fn stale_route_is_dropped_with_warning() {
        let config =
            tessera_config::load_config_from_str(&LINE.replace("route = [0, 2]", "route = [0, 9]"))
                .unwrap();
        let topology = build_topology(&config).unwrap();
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let (flows, _) = build_traffic(&config, &topology, &interner, &sink);
        assert!(flows.flows()[0].route.is_empty());
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("link 9"));
    }

    // -- conversion tests --

    #[test]
    fn grid_places_declared_tiles() {
        let config = tessera_config::load_config_from_str(LINE).unwrap();
        let grid = build_grid(&config.device).unwrap();
        assert_eq!(grid.width(), 7);
        assert_eq!(grid.tile_name_at(3, 0, 0), "noc_router");
        assert_eq!(grid.tile_name_at(4, 0, 0), "clb");
    }

    #[test]
    fn architecture_keeps_router_declarations() {
        let config = tessera_config::load_config_from_str(LINE).unwrap();
        let arch = build_architecture(&config.noc);
        assert_eq!(arch.routers.len(), 3);
        assert_eq!(arch.routers[1].id, 11);
        assert_eq!(arch.declared_link_count(), 4);
    }

    #[test]
    fn turn_model_names_map_to_kinds() {
        assert_eq!(turn_model_kind(TurnModelName::Xy), TurnModelKind::Xy);
        assert_eq!(
            turn_model_kind(TurnModelName::NegativeFirst),
            TurnModelKind::NegativeFirst
        );
    }

    #[test]
    fn sat_params_carry_routing_settings() {
        let routing = RoutingConfig {
            bandwidth_resolution: 100,
            seed: 5,
            time_limit_secs: Some(1.5),
            workers: 2,
            ..RoutingConfig::default()
        };
        let params = sat_params(&routing).unwrap();
        assert_eq!(params.bandwidth_resolution, 100);
        assert_eq!(params.seed, 5);
        assert_eq!(params.time_limit, Some(Duration::from_millis(1500)));
        assert_eq!(params.num_workers, 2);
        assert!(!params.minimize_aggregate_bandwidth);
    }

    #[test]
    fn huge_time_limit_is_rejected() {
        let routing = RoutingConfig {
            time_limit_secs: Some(1e300),
            ..RoutingConfig::default()
        };
        assert!(sat_params(&routing).is_err());
    }
}
