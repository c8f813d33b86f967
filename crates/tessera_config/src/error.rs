//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `tessera.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A tile instance references a tile type that is not declared.
    #[error("unknown tile type '{0}'")]
    UnknownTileType(String),

    /// A flow references a router cluster without a placement.
    #[error("flow '{flow}' references unplaced router cluster '{cluster}'")]
    UnplacedCluster {
        /// Flow name.
        flow: String,
        /// Cluster name.
        cluster: String,
    },

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}
