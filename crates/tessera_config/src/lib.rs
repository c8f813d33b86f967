//! Parsing and validation of `tessera.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`] describing the device grid, the NoC architecture, the
//! traffic flows with their cluster placement, and the routing settings.
//! Command-line overrides are merged with [`resolve_routing`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME, MAX_BANDWIDTH_RESOLUTION};
pub use resolve::{resolve_routing, RoutingOverrides};
pub use types::*;
