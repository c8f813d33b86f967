//! Merging command-line overrides into the `[routing]` settings.

use crate::error::ConfigError;
use crate::loader::validate_routing;
use crate::types::{ProjectConfig, RoutingConfig, TurnModelName};

/// Routing settings given on the command line. `None` keeps the file value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingOverrides {
    /// Overrides `routing.bandwidth_resolution`.
    pub bandwidth_resolution: Option<i64>,
    /// Overrides `routing.seed`.
    pub seed: Option<u64>,
    /// Overrides `routing.time_limit_secs`.
    pub time_limit_secs: Option<f64>,
    /// Overrides `routing.workers`.
    pub workers: Option<usize>,
    /// Overrides `routing.minimize_aggregate_bandwidth` when set.
    pub minimize_aggregate_bandwidth: Option<bool>,
    /// Overrides `routing.turn_model`.
    pub turn_model: Option<TurnModelName>,
    /// Overrides `routing.log_search_progress` when set.
    pub log_search_progress: Option<bool>,
}

/// Returns the project's routing settings with `overrides` applied on top.
///
/// The merged settings are validated again, so an override cannot
/// introduce an out-of-range value.
pub fn resolve_routing(
    config: &ProjectConfig,
    overrides: &RoutingOverrides,
) -> Result<RoutingConfig, ConfigError> {
    let base = &config.routing;
    let resolved = RoutingConfig {
        bandwidth_resolution: overrides
            .bandwidth_resolution
            .unwrap_or(base.bandwidth_resolution),
        seed: overrides.seed.unwrap_or(base.seed),
        time_limit_secs: overrides.time_limit_secs.or(base.time_limit_secs),
        workers: overrides.workers.unwrap_or(base.workers),
        minimize_aggregate_bandwidth: overrides
            .minimize_aggregate_bandwidth
            .unwrap_or(base.minimize_aggregate_bandwidth),
        turn_model: overrides.turn_model.unwrap_or(base.turn_model),
        log_search_progress: overrides
            .log_search_progress
            .unwrap_or(base.log_search_progress),
    };
    validate_routing(&resolved)?;
    Ok(resolved)
}
