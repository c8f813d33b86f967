//! Diagnostics for fatal project problems.
//!
//! Configuration errors map to `C` codes and topology errors to `N` codes,
//! one code per error kind. Routing input errors reuse the `R` category from
//! `R010` on, after the codes the router emits itself.

use tessera_config::ConfigError;
use tessera_diagnostics::{Category, Diagnostic, DiagnosticCode};
use tessera_noc::TopologyError;
use tessera_route::RoutingError;

/// Converts a configuration error into an error diagnostic.
pub fn config_error(err: &ConfigError) -> Diagnostic {
    let number = match err {
        ConfigError::IoError(_) => 1,
        ConfigError::ParseError(_) => 2,
        ConfigError::MissingField(_) => 3,
        ConfigError::UnknownTileType(_) => 4,
        ConfigError::UnplacedCluster { .. } => 5,
        ConfigError::ValidationError(_) => 6,
    };
    let diag = Diagnostic::error(DiagnosticCode::new(Category::Config, number), err.to_string());
    match err {
        ConfigError::UnplacedCluster { cluster, .. } => diag.with_help(format!(
            "add `{cluster} = {{ x = ..., y = ... }}` to the [placement] table"
        )),
        ConfigError::UnknownTileType(name) => {
            diag.with_help(format!("declare `{name}` under [[device.tile_types]]"))
        }
        _ => diag,
    }
}

/// Creates a warning for a stored route that references an unknown link.
pub fn warn_stale_route(flow: &str, link: u32) -> Diagnostic {
    Diagnostic::warning(
        DiagnosticCode::new(Category::Config, 7),
        format!("stored route of flow `{flow}` references link {link}, which does not exist"),
    )
    .with_note("the route is ignored and the flow is routed without a hint")
}

/// Converts a topology error into an error diagnostic.
pub fn topology_error(err: &TopologyError) -> Diagnostic {
    let number = match err {
        TopologyError::NoPhysicalRouters { .. } => 1,
        TopologyError::TooManyLogicalRouters { .. } => 2,
        TopologyError::TooFewLogicalRouters { .. } => 3,
        TopologyError::AmbiguousAssignment { .. } => 4,
        TopologyError::DuplicateAssignment { .. } => 5,
        TopologyError::NoTileOnLayer { .. } => 6,
        TopologyError::DuplicateRouterId(_) => 7,
        TopologyError::DuplicateLocation { .. } => 8,
        TopologyError::UnknownConnection { .. } => 9,
        TopologyError::SelfLink(_) => 10,
        TopologyError::UnknownTileType(_) => 11,
        TopologyError::TileOutOfBounds { .. } => 12,
        TopologyError::TileOverlap { .. } => 13,
    };
    let diag = Diagnostic::error(
        DiagnosticCode::new(Category::Topology, number),
        err.to_string(),
    );
    match err {
        TopologyError::AmbiguousAssignment { .. } => {
            diag.with_help("move the router's position hint closer to one of the tiles")
        }
        TopologyError::NoPhysicalRouters { tile_name } => diag.with_note(format!(
            "no tile instance of type `{tile_name}` is placed in [[device.tiles]]"
        )),
        _ => diag,
    }
}

/// Converts a routing input error into an error diagnostic.
///
/// Returns `None` for internal errors, which are defects rather than
/// problems with the project.
pub fn routing_error(err: &RoutingError) -> Option<Diagnostic> {
    let number = match err {
        RoutingError::UnplacedCluster { .. } => 10,
        RoutingError::NoRouterAtLocation { .. } => 11,
        RoutingError::InvalidResolution(_) => 12,
        RoutingError::NonPositiveLinkBandwidth(_) => 13,
        RoutingError::InvalidFlowBandwidth { .. } => 14,
        RoutingError::UnclassifiableLink(_) => 15,
        RoutingError::ObjectiveOverflow => 16,
        RoutingError::Internal(_) => return None,
    };
    let diag = Diagnostic::error(
        DiagnosticCode::new(Category::Routing, number),
        err.to_string(),
    );
    Some(match err {
        RoutingError::NoRouterAtLocation { .. } => {
            diag.with_help("place the cluster on the anchor cell of a router tile")
        }
        RoutingError::UnclassifiableLink(_) => {
            diag.with_note("routing assumes a mesh whose links are horizontal or vertical")
        }
        _ => diag,
    })
}
