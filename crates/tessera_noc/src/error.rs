//! Configuration errors raised while building the device grid and NoC topology.

/// A fatal configuration error detected while building the NoC topology.
///
/// None of these are retryable: each means the architecture description and
/// the device grid disagree, and routing must not be attempted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    /// No grid tile matches the router tile name.
    #[error(
        "no physical NoC routers were found on the device (router tile name '{tile_name}')"
    )]
    NoPhysicalRouters {
        /// The router tile name that was searched for.
        tile_name: String,
    },

    /// The architecture declares more logical routers than physical tiles exist.
    #[error(
        "the NoC topology declares {logical} routers but the device only has {physical} router tiles"
    )]
    TooManyLogicalRouters {
        /// Number of declared logical routers.
        logical: usize,
        /// Number of physical router tiles found on the grid.
        physical: usize,
    },

    /// The architecture declares fewer logical routers than physical tiles exist.
    #[error(
        "the NoC topology declares {logical} routers but the device has {physical} router tiles; every physical router must be used"
    )]
    TooFewLogicalRouters {
        /// Number of declared logical routers.
        logical: usize,
        /// Number of physical router tiles found on the grid.
        physical: usize,
    },

    /// A logical router is equally close to two physical router tiles.
    #[error(
        "router {router} has the same distance to physical router tiles at ({},{}) and ({},{}); no assignment could be made",
        .first.0, .first.1, .second.0, .second.1
    )]
    AmbiguousAssignment {
        /// User id of the logical router.
        router: u32,
        /// Grid position of the first candidate tile.
        first: (i32, i32),
        /// Grid position of the second candidate tile.
        second: (i32, i32),
    },

    /// Two logical routers are closest to the same physical router tile.
    #[error(
        "routers {router} and {previous} are both closest to the physical router tile at ({},{})",
        .position.0, .position.1
    )]
    DuplicateAssignment {
        /// User id of the router being assigned.
        router: u32,
        /// User id of the router already holding the tile.
        previous: u32,
        /// Grid position of the contested tile.
        position: (i32, i32),
    },

    /// A logical router has no physical router tile on its layer.
    #[error("router {router} has no physical router tile on layer {layer}")]
    NoTileOnLayer {
        /// User id of the logical router.
        router: u32,
        /// The layer of the router's position hint.
        layer: i32,
    },

    /// Two logical routers share the same user id.
    #[error("router id {0} is declared more than once")]
    DuplicateRouterId(u32),

    /// Two routers were placed on the same grid location.
    #[error("two routers occupy grid location ({x},{y},{layer})")]
    DuplicateLocation {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Layer.
        layer: i32,
    },

    /// A connection list references a router id that was never declared.
    #[error("router {router} connects to undeclared router {target}")]
    UnknownConnection {
        /// User id of the router declaring the connection.
        router: u32,
        /// The undeclared user id.
        target: u32,
    },

    /// A router declares a connection to itself.
    #[error("router {0} declares a link to itself")]
    SelfLink(u32),

    /// A tile instance references a tile type that does not exist.
    #[error("unknown tile type '{0}'")]
    UnknownTileType(String),

    /// A tile instance does not fit inside the device grid.
    #[error("tile '{tile_type}' at ({x},{y},{layer}) does not fit inside the device grid")]
    TileOutOfBounds {
        /// Name of the tile type.
        tile_type: String,
        /// Anchor column.
        x: i32,
        /// Anchor row.
        y: i32,
        /// Layer.
        layer: i32,
    },

    /// A tile instance overlaps a previously placed tile.
    #[error("tile '{tile_type}' at ({x},{y},{layer}) overlaps another tile")]
    TileOverlap {
        /// Name of the tile type.
        tile_type: String,
        /// Anchor column.
        x: i32,
        /// Anchor row.
        y: i32,
        /// Layer.
        layer: i32,
    },
}
