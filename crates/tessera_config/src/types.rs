//! Configuration types deserialized from `tessera.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The top-level project configuration parsed from `tessera.toml`.
///
/// Describes the device grid, the NoC architecture bound to it, the traffic
/// flows and where their router clusters are placed, and routing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// The physical tile grid.
    pub device: DeviceConfig,
    /// The NoC architecture.
    pub noc: NocConfig,
    /// Traffic flows to route.
    #[serde(default)]
    pub flows: Vec<FlowConfig>,
    /// Router cluster locations, keyed by cluster name.
    #[serde(default)]
    pub placement: BTreeMap<String, PlacementConfig>,
    /// Routing settings.
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// The physical tile grid.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Number of device layers.
    #[serde(default = "default_layers")]
    pub layers: u32,
    /// Tile type of every cell not covered by a tile instance.
    #[serde(default = "default_fill")]
    pub fill: String,
    /// Declared tile types.
    #[serde(default)]
    pub tile_types: Vec<TileTypeConfig>,
    /// Tile instances, anchored at their bottom-left cell.
    #[serde(default)]
    pub tiles: Vec<TileConfig>,
}

fn default_layers() -> u32 {
    1
}

fn default_fill() -> String {
    "clb".to_string()
}

/// A physical tile type and its footprint.
#[derive(Debug, Clone, Deserialize)]
pub struct TileTypeConfig {
    /// Tile type name.
    pub name: String,
    /// Footprint width in cells.
    #[serde(default = "default_extent")]
    pub width: u32,
    /// Footprint height in cells.
    #[serde(default = "default_extent")]
    pub height: u32,
}

fn default_extent() -> u32 {
    1
}

/// One placed tile.
#[derive(Debug, Clone, Deserialize)]
pub struct TileConfig {
    /// Name of a declared tile type.
    pub tile_type: String,
    /// Anchor column.
    pub x: u32,
    /// Anchor row.
    pub y: u32,
    /// Anchor layer.
    #[serde(default)]
    pub layer: u32,
}

/// The NoC architecture section.
#[derive(Debug, Clone, Deserialize)]
pub struct NocConfig {
    /// Tile type that hosts a hard router.
    pub router_tile_name: String,
    /// Capacity of every link.
    pub link_bandwidth: f64,
    /// Latency of every link.
    pub link_latency: f64,
    /// Latency through a router.
    pub router_latency: f64,
    /// Logical routers in declaration order.
    #[serde(default)]
    pub routers: Vec<RouterConfig>,
}

/// A logical router declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// User-facing router id.
    pub id: u32,
    /// Position hint column.
    pub x: f64,
    /// Position hint row.
    pub y: f64,
    /// Position hint layer.
    #[serde(default)]
    pub layer: i32,
    /// Ids of the routers this router links to.
    #[serde(default)]
    pub connections: Vec<u32>,
}

/// A traffic flow between two router clusters.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    /// Flow name.
    pub name: String,
    /// Source cluster.
    pub source: String,
    /// Sink cluster.
    pub sink: String,
    /// Demanded bandwidth.
    pub bandwidth: f64,
    /// Maximum end-to-end latency.
    #[serde(default)]
    pub max_latency: Option<f64>,
    /// Previous route as link ids, used as a warm start.
    #[serde(default)]
    pub route: Vec<u32>,
}

/// Grid location of a router cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PlacementConfig {
    /// Column of the router tile anchor.
    pub x: i32,
    /// Row of the router tile anchor.
    pub y: i32,
    /// Layer of the router tile anchor.
    #[serde(default)]
    pub layer: i32,
}

/// Routing settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Units a link's capacity is divided into.
    pub bandwidth_resolution: i64,
    /// Solver seed.
    pub seed: u64,
    /// Wall-clock budget per solve, in seconds. Defaults to ten minutes.
    pub time_limit_secs: Option<f64>,
    /// Solver workers.
    pub workers: usize,
    /// Refine the routing by minimizing aggregate bandwidth.
    pub minimize_aggregate_bandwidth: bool,
    /// Deadlock-avoidance turn model.
    pub turn_model: TurnModelName,
    /// Log every improving solution.
    pub log_search_progress: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            bandwidth_resolution: 128,
            seed: 0,
            time_limit_secs: Some(600.0),
            workers: 1,
            minimize_aggregate_bandwidth: false,
            turn_model: TurnModelName::default(),
            log_search_progress: false,
        }
    }
}

/// Turn model names accepted in `tessera.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnModelName {
    /// Dimension-ordered XY routing.
    Xy,
    /// West-first (default).
    #[default]
    WestFirst,
    /// North-last.
    NorthLast,
    /// Negative-first.
    NegativeFirst,
}

impl fmt::Display for TurnModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TurnModelName::Xy => "xy",
            TurnModelName::WestFirst => "west_first",
            TurnModelName::NorthLast => "north_last",
            TurnModelName::NegativeFirst => "negative_first",
        })
    }
}
