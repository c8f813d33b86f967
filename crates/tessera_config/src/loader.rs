//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{DeviceConfig, NocConfig, ProjectConfig, RoutingConfig};
use std::collections::HashSet;
use std::path::Path;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "tessera.toml";

/// Loads and validates a `tessera.toml` configuration from a project directory.
///
/// Reads `<project_dir>/tessera.toml`, parses it, and validates it.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `tessera.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that values are in range and cross-references resolve.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    validate_device(&config.device)?;
    validate_noc(&config.noc)?;
    validate_routing(&config.routing)?;

    let mut names = HashSet::new();
    for flow in &config.flows {
        if flow.name.is_empty() {
            return Err(ConfigError::MissingField("flows.name".to_string()));
        }
        if !names.insert(flow.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "flow '{}' is declared more than once",
                flow.name
            )));
        }
        if !flow.bandwidth.is_finite() || flow.bandwidth < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "flow '{}' bandwidth must be non-negative, got {}",
                flow.name, flow.bandwidth
            )));
        }
        for cluster in [&flow.source, &flow.sink] {
            if !config.placement.contains_key(cluster) {
                return Err(ConfigError::UnplacedCluster {
                    flow: flow.name.clone(),
                    cluster: cluster.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_device(device: &DeviceConfig) -> Result<(), ConfigError> {
    if device.width == 0 || device.height == 0 || device.layers == 0 {
        return Err(ConfigError::ValidationError(format!(
            "device grid must be non-empty, got {}x{}x{}",
            device.width, device.height, device.layers
        )));
    }
    let mut known = HashSet::new();
    for ty in &device.tile_types {
        if ty.width == 0 || ty.height == 0 {
            return Err(ConfigError::ValidationError(format!(
                "tile type '{}' has an empty footprint",
                ty.name
            )));
        }
        if !known.insert(ty.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "tile type '{}' is declared more than once",
                ty.name
            )));
        }
    }
    for tile in &device.tiles {
        let Some(ty) = device.tile_types.iter().find(|t| t.name == tile.tile_type) else {
            return Err(ConfigError::UnknownTileType(tile.tile_type.clone()));
        };
        let fits = u64::from(tile.x) + u64::from(ty.width) <= u64::from(device.width)
            && u64::from(tile.y) + u64::from(ty.height) <= u64::from(device.height)
            && tile.layer < device.layers;
        if !fits {
            return Err(ConfigError::ValidationError(format!(
                "tile '{}' at ({},{},{}) does not fit in the device grid",
                tile.tile_type, tile.x, tile.y, tile.layer
            )));
        }
    }
    Ok(())
}

fn validate_noc(noc: &NocConfig) -> Result<(), ConfigError> {
    if noc.router_tile_name.is_empty() {
        return Err(ConfigError::MissingField("noc.router_tile_name".to_string()));
    }
    if !(noc.link_bandwidth > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "noc.link_bandwidth must be positive, got {}",
            noc.link_bandwidth
        )));
    }
    if !(noc.link_latency >= 0.0) || !(noc.router_latency >= 0.0) {
        return Err(ConfigError::ValidationError(
            "noc latencies must be non-negative".to_string(),
        ));
    }
    let mut ids = HashSet::new();
    for router in &noc.routers {
        if !ids.insert(router.id) {
            return Err(ConfigError::ValidationError(format!(
                "router id {} is declared more than once",
                router.id
            )));
        }
    }
    Ok(())
}

/// Largest accepted `routing.bandwidth_resolution`.
pub const MAX_BANDWIDTH_RESOLUTION: i64 = i32::MAX as i64;

/// Checks routing settings; shared with override resolution.
pub(crate) fn validate_routing(routing: &RoutingConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_BANDWIDTH_RESOLUTION).contains(&routing.bandwidth_resolution) {
        return Err(ConfigError::ValidationError(format!(
            "routing.bandwidth_resolution must be between 1 and {MAX_BANDWIDTH_RESOLUTION}, got {}",
            routing.bandwidth_resolution
        )));
    }
    if routing.workers == 0 {
        return Err(ConfigError::ValidationError(
            "routing.workers must be at least 1".to_string(),
        ));
    }
    if let Some(secs) = routing.time_limit_secs {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "routing.time_limit_secs must be a non-negative number, got {secs}"
            )));
        }
    }
    Ok(())
}
