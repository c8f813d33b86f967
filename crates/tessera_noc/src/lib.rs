//! Network-on-Chip topology construction for Tessera.
//!
//! This crate models the physical [`DeviceGrid`], the declared
//! [`NocArchitecture`], and the resulting [`NocTopology`] of routers and
//! directed links. [`setup_noc`] binds the architecture to the grid, and the
//! [`TurnModel`] implementations list the consecutive-link pairs a router may
//! not forward between.

#![warn(missing_docs)]

pub mod arch;
pub mod error;
pub mod grid;
pub mod ids;
pub mod setup;
pub mod topology;
pub mod turn_model;

pub use arch::{LogicalRouter, NocArchitecture};
pub use error::TopologyError;
pub use grid::{DeviceGrid, GridCell, PhysicalTileType};
pub use ids::{LinkId, RouterId, TileTypeId};
pub use setup::{identify_router_tile_positions, setup_noc, RouterTilePosition};
pub use topology::{
    GridLocation, LinkDirection, NocLink, NocRouter, NocTopology, NocTopologyBuilder,
};
pub use turn_model::{
    NegativeFirst, NorthLast, TurnModel, TurnModelKind, WestFirst, XyRouting,
};
