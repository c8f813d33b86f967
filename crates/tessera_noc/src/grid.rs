//! The physical device grid that NoC router tiles are located on.
//!
//! A [`DeviceGrid`] is a layered array of cells. Every cell points at a
//! physical tile type and records its offset from that tile's anchor
//! (bottom-left corner), so tiles larger than one cell can be recognized once
//! per instance instead of once per covered cell.

use crate::error::TopologyError;
use crate::ids::TileTypeId;
use serde::{Deserialize, Serialize};

/// A physical tile type (e.g. `clb`, `noc_router`) and its footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalTileType {
    /// The tile type name used by the architecture description.
    pub name: String,
    /// Footprint width in grid cells.
    pub width: u32,
    /// Footprint height in grid cells.
    pub height: u32,
}

impl PhysicalTileType {
    /// Creates a tile type with the given name and footprint.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width: width.max(1),
            height: height.max(1),
        }
    }
}

/// One cell of the device grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    /// The tile type covering this cell.
    pub tile_type: TileTypeId,
    /// Horizontal distance from the covering tile's anchor.
    pub width_offset: u32,
    /// Vertical distance from the covering tile's anchor.
    pub height_offset: u32,
}

impl GridCell {
    /// Returns `true` if this cell is the anchor (bottom-left corner) of its tile.
    pub fn is_anchor(&self) -> bool {
        self.width_offset == 0 && self.height_offset == 0
    }
}

/// The physical tile grid of a device.
///
/// The first registered tile type is the fill type: every cell starts out as
/// a fill tile and fill tiles may be overwritten by [`place_tile`](Self::place_tile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceGrid {
    width: u32,
    height: u32,
    layers: u32,
    tile_types: Vec<PhysicalTileType>,
    /// Layer-major, then column, then row.
    cells: Vec<GridCell>,
}

impl DeviceGrid {
    /// The tile type every cell starts out with.
    pub const FILL: TileTypeId = TileTypeId::from_raw(0);

    /// Creates a grid of `width × height × layers` cells, all covered by 1×1
    /// tiles named `fill_name`.
    pub fn new(width: u32, height: u32, layers: u32, fill_name: impl Into<String>) -> Self {
        let layers = layers.max(1);
        let fill = GridCell {
            tile_type: Self::FILL,
            width_offset: 0,
            height_offset: 0,
        };
        Self {
            width,
            height,
            layers,
            tile_types: vec![PhysicalTileType::new(fill_name, 1, 1)],
            cells: vec![fill; (width * height * layers) as usize],
        }
    }

    /// Registers a tile type, returning the existing ID if the name is taken.
    pub fn add_tile_type(&mut self, tile_type: PhysicalTileType) -> TileTypeId {
        if let Some(id) = self.tile_type_by_name(&tile_type.name) {
            return id;
        }
        let id = TileTypeId::from_raw(self.tile_types.len() as u32);
        self.tile_types.push(tile_type);
        id
    }

    /// Looks up a tile type by name.
    pub fn tile_type_by_name(&self, name: &str) -> Option<TileTypeId> {
        self.tile_types
            .iter()
            .position(|t| t.name == name)
            .map(|i| TileTypeId::from_raw(i as u32))
    }

    /// Returns the tile type with the given ID.
    pub fn tile_type(&self, id: TileTypeId) -> &PhysicalTileType {
        &self.tile_types[id.index()]
    }

    /// Places an instance of `tile_type` with its anchor at `(x, y, layer)`.
    ///
    /// Every cell of the footprint must be inside the grid and currently
    /// covered by the fill type.
    pub fn place_tile(
        &mut self,
        tile_type: TileTypeId,
        x: i32,
        y: i32,
        layer: i32,
    ) -> Result<(), TopologyError> {
        let ty = self
            .tile_types
            .get(tile_type.index())
            .ok_or_else(|| TopologyError::UnknownTileType(format!("#{tile_type}")))?
            .clone();

        let fits = x >= 0
            && y >= 0
            && layer >= 0
            && (x as u32 + ty.width) <= self.width
            && (y as u32 + ty.height) <= self.height
            && (layer as u32) < self.layers;
        if !fits {
            return Err(TopologyError::TileOutOfBounds {
                tile_type: ty.name,
                x,
                y,
                layer,
            });
        }

        for dx in 0..ty.width {
            for dy in 0..ty.height {
                let idx = self.cell_index(x as u32 + dx, y as u32 + dy, layer as u32);
                if self.cells[idx].tile_type != Self::FILL {
                    return Err(TopologyError::TileOverlap {
                        tile_type: ty.name,
                        x,
                        y,
                        layer,
                    });
                }
            }
        }

        for dx in 0..ty.width {
            for dy in 0..ty.height {
                let idx = self.cell_index(x as u32 + dx, y as u32 + dy, layer as u32);
                self.cells[idx] = GridCell {
                    tile_type,
                    width_offset: dx,
                    height_offset: dy,
                };
            }
        }
        Ok(())
    }

    /// Returns the cell at the given position.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the grid.
    pub fn cell(&self, x: u32, y: u32, layer: u32) -> &GridCell {
        &self.cells[self.cell_index(x, y, layer)]
    }

    /// Returns the name of the tile type covering the given cell.
    pub fn tile_name_at(&self, x: u32, y: u32, layer: u32) -> &str {
        &self.tile_type(self.cell(x, y, layer).tile_type).name
    }

    /// Grid width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of device layers.
    pub fn num_layers(&self) -> u32 {
        self.layers
    }

    fn cell_index(&self, x: u32, y: u32, layer: u32) -> usize {
        assert!(x < self.width && y < self.height && layer < self.layers);
        ((layer * self.width + x) * self.height + y) as usize
    }

    /// Builds a single-layer grid holding a `cols × rows` array of router tiles
    /// spaced `spacing` cells apart, starting at the origin.
    pub fn mesh(cols: u32, rows: u32, spacing: u32, router_tile: &PhysicalTileType) -> Self {
        let spacing = spacing.max(router_tile.width).max(router_tile.height).max(1);
        let width = (cols.max(1) - 1) * spacing + router_tile.width;
        let height = (rows.max(1) - 1) * spacing + router_tile.height;
        let mut grid = Self::new(width, height, 1, "clb");
        let ty = grid.add_tile_type(router_tile.clone());
        for c in 0..cols {
            for r in 0..rows {
                // Spacing is at least the footprint, so placements never overlap.
                let placed = grid.place_tile(ty, (c * spacing) as i32, (r * spacing) as i32, 0);
                debug_assert!(placed.is_ok());
            }
        }
        grid
    }
}
