//! Binding the declared NoC to the physical device.
//!
//! [`setup_noc`] finds every physical router tile on the [`DeviceGrid`],
//! assigns each logical router to the closest one, and then creates the
//! declared links. Every inconsistency between the architecture description
//! and the grid is a fatal [`TopologyError`].

use crate::arch::NocArchitecture;
use crate::error::TopologyError;
use crate::grid::DeviceGrid;
use crate::topology::{GridLocation, NocTopology, NocTopologyBuilder};
use tessera_common::is_close;

/// The anchor and centroid of a physical router tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterTilePosition {
    /// Anchor (bottom-left corner) of the tile.
    pub location: GridLocation,
    /// Centroid column, `x + (width - 1) / 2`.
    pub centroid_x: f64,
    /// Centroid row, `y + (height - 1) / 2`.
    pub centroid_y: f64,
}

impl RouterTilePosition {
    fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.centroid_x - x).hypot(self.centroid_y - y)
    }
}

/// Lists every instance of the named tile type, one entry per tile.
///
/// Cells that are not a tile's anchor are skipped so a multi-cell router tile
/// is reported once. The scan is layer by layer, column-major within a layer.
pub fn identify_router_tile_positions(
    grid: &DeviceGrid,
    router_tile_name: &str,
) -> Vec<RouterTilePosition> {
    let Some(router_type) = grid.tile_type_by_name(router_tile_name) else {
        return Vec::new();
    };
    let ty = grid.tile_type(router_type);
    let (half_w, half_h) = (
        f64::from(ty.width - 1) / 2.0,
        f64::from(ty.height - 1) / 2.0,
    );

    let mut positions = Vec::new();
    for layer in 0..grid.num_layers() {
        for x in 0..grid.width() {
            for y in 0..grid.height() {
                let cell = grid.cell(x, y, layer);
                if cell.tile_type != router_type || !cell.is_anchor() {
                    continue;
                }
                positions.push(RouterTilePosition {
                    location: GridLocation::with_layer(x as i32, y as i32, layer as i32),
                    centroid_x: f64::from(x) + half_w,
                    centroid_y: f64::from(y) + half_h,
                });
            }
        }
    }
    positions
}

/// Builds the NoC topology for `arch` on `grid`.
///
/// Fails if no router tiles exist, if the number of router tiles differs from
/// the number of logical routers, if a logical router is equally close to two
/// tiles, if two logical routers pick the same tile, or if a connection list
/// references an undeclared router.
pub fn setup_noc(grid: &DeviceGrid, arch: &NocArchitecture) -> Result<NocTopology, TopologyError> {
    let _span = tracing::debug_span!("setup_noc", tile = %arch.router_tile_name).entered();

    let tiles = identify_router_tile_positions(grid, &arch.router_tile_name);
    let logical = arch.routers.len();
    let physical = tiles.len();
    if physical == 0 {
        return Err(TopologyError::NoPhysicalRouters {
            tile_name: arch.router_tile_name.clone(),
        });
    }
    if logical > physical {
        return Err(TopologyError::TooManyLogicalRouters { logical, physical });
    }
    if logical < physical {
        return Err(TopologyError::TooFewLogicalRouters { logical, physical });
    }
    tracing::debug!(routers = physical, "found physical router tiles");

    let mut builder =
        NocTopologyBuilder::new(arch.link_bandwidth, arch.link_latency, arch.router_latency);
    create_routers(arch, &tiles, &mut builder)?;
    create_links(arch, &mut builder)?;
    let topology = builder.finish();

    tracing::debug!(
        routers = topology.router_count(),
        links = topology.link_count(),
        fingerprint = %topology.fingerprint(),
        "built NoC topology"
    );
    Ok(topology)
}

/// Assigns each logical router, in declaration order, to its closest tile.
fn create_routers(
    arch: &NocArchitecture,
    tiles: &[RouterTilePosition],
    builder: &mut NocTopologyBuilder,
) -> Result<(), TopologyError> {
    // Which logical router (user id) holds each tile.
    let mut assignments: Vec<Option<u32>> = vec![None; tiles.len()];

    for router in &arch.routers {
        let mut closest: Option<(usize, f64)> = None;
        let mut tie: Option<(usize, usize)> = None;

        for (i, tile) in tiles.iter().enumerate() {
            if tile.location.layer != router.layer {
                continue;
            }
            let distance = tile.distance_to(router.x, router.y);
            match closest {
                Some((best, best_distance)) if is_close(distance, best_distance) => {
                    tie = Some((best, i));
                }
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => {
                    closest = Some((i, distance));
                    tie = None;
                }
            }
        }

        let Some((chosen, _)) = closest else {
            return Err(TopologyError::NoTileOnLayer {
                router: router.id,
                layer: router.layer,
            });
        };
        if let Some((first, second)) = tie {
            let at = |i: usize| (tiles[i].location.x, tiles[i].location.y);
            return Err(TopologyError::AmbiguousAssignment {
                router: router.id,
                first: at(first),
                second: at(second),
            });
        }
        if let Some(previous) = assignments[chosen] {
            let location = tiles[chosen].location;
            return Err(TopologyError::DuplicateAssignment {
                router: router.id,
                previous,
                position: (location.x, location.y),
            });
        }

        builder.add_router(router.id, tiles[chosen].location)?;
        assignments[chosen] = Some(router.id);
    }
    Ok(())
}

fn create_links(
    arch: &NocArchitecture,
    builder: &mut NocTopologyBuilder,
) -> Result<(), TopologyError> {
    for router in &arch.routers {
        let source = builder
            .convert_router_id(router.id)
            .ok_or(TopologyError::UnknownConnection {
                router: router.id,
                target: router.id,
            })?;
        for &target in &router.connections {
            let sink = builder
                .convert_router_id(target)
                .ok_or(TopologyError::UnknownConnection {
                    router: router.id,
                    target,
                })?;
            builder.add_link(source, sink)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::LogicalRouter;
    use crate::grid::PhysicalTileType;
    use crate::ids::RouterId;

    fn router(id: u32, x: f64, y: f64, connections: Vec<u32>) -> LogicalRouter {
        LogicalRouter {
            id,
            x,
            y,
            layer: 0,
            connections,
        }
    }

    fn arch(routers: Vec<LogicalRouter>) -> NocArchitecture {
        NocArchitecture {
            router_tile_name: "noc_router".into(),
            link_bandwidth: 1.0,
            link_latency: 1.0,
            router_latency: 1.0,
            routers,
        }
    }

    fn line_grid(n: u32, spacing: u32) -> DeviceGrid {
        DeviceGrid::mesh(n, 1, spacing, &PhysicalTileType::new("noc_router", 1, 1))
    }

    #[test]
    fn identifies_anchors_once() {
        let mut grid = DeviceGrid::new(6, 2, 1, "clb");
        let ty = grid.add_tile_type(PhysicalTileType::new("noc_router", 2, 2));
        grid.place_tile(ty, 0, 0, 0).unwrap();
        grid.place_tile(ty, 4, 0, 0).unwrap();
        let tiles = identify_router_tile_positions(&grid, "noc_router");
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].location, GridLocation::new(0, 0));
        assert_eq!(tiles[0].centroid_x, 0.5);
        assert_eq!(tiles[1].centroid_x, 4.5);
        assert_eq!(tiles[1].centroid_y, 0.5);
    }

    #[test]
    fn builds_line() {
        let grid = line_grid(3, 2);
        let arch = arch(vec![
            router(10, 0.0, 0.0, vec![11]),
            router(11, 2.1, 0.0, vec![10, 12]),
            router(12, 3.9, 0.0, vec![11]),
        ]);
        let topo = setup_noc(&grid, &arch).unwrap();
        assert_eq!(topo.router_count(), 3);
        assert_eq!(topo.link_count(), 4);
        let r12 = topo.convert_router_id(12).unwrap();
        assert_eq!(topo.router(r12).location, GridLocation::new(4, 0));
        assert_eq!(topo.router(r12).id, RouterId::from_raw(2));
    }

    #[test]
    fn links_match_declared_adjacency() {
        let grid = DeviceGrid::mesh(2, 2, 1, &PhysicalTileType::new("noc_router", 1, 1));
        let arch = NocArchitecture::mesh("noc_router", 2, 2, 1, 1.0, 0.0, 0.0);
        let topo = setup_noc(&grid, &arch).unwrap();
        assert_eq!(topo.link_count(), arch.declared_link_count());
        for decl in &arch.routers {
            let src = topo.convert_router_id(decl.id).unwrap();
            for &c in &decl.connections {
                let dst = topo.convert_router_id(c).unwrap();
                assert!(topo.find_link(src, dst).is_some());
            }
        }
    }

    #[test]
    fn build_is_idempotent() {
        let grid = DeviceGrid::mesh(3, 3, 2, &PhysicalTileType::new("noc_router", 1, 1));
        let arch = NocArchitecture::mesh("noc_router", 3, 3, 2, 1.0, 0.0, 0.0);
        let a = setup_noc(&grid, &arch).unwrap();
        let b = setup_noc(&grid, &arch).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.routers(), b.routers());
        assert_eq!(a.links(), b.links());
    }

    #[test]
    fn zero_tiles_fails() {
        let grid = DeviceGrid::new(4, 4, 1, "clb");
        let err = setup_noc(&grid, &arch(vec![router(0, 0.0, 0.0, vec![])])).unwrap_err();
        assert!(matches!(err, TopologyError::NoPhysicalRouters { .. }));
    }

    #[test]
    fn count_mismatch_fails() {
        let grid = line_grid(2, 1);
        let err = setup_noc(&grid, &arch(vec![router(0, 0.0, 0.0, vec![])])).unwrap_err();
        assert_eq!(
            err,
            TopologyError::TooFewLogicalRouters {
                logical: 1,
                physical: 2
            }
        );
        let err = setup_noc(
            &grid,
            &arch(vec![
                router(0, 0.0, 0.0, vec![]),
                router(1, 1.0, 0.0, vec![]),
                router(2, 2.0, 0.0, vec![]),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::TooManyLogicalRouters { .. }));
    }

    #[test]
    fn equidistant_tiles_are_ambiguous() {
        let grid = line_grid(2, 2);
        let err = setup_noc(
            &grid,
            &arch(vec![router(0, 1.0, 0.0, vec![]), router(1, 2.0, 0.0, vec![])]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TopologyError::AmbiguousAssignment {
                router: 0,
                first: (0, 0),
                second: (2, 0),
            }
        );
    }

    #[test]
    fn near_ties_are_measured_against_first_tile() {
        let mut grid = DeviceGrid::new(3, 2, 1, "clb");
        let ty = grid.add_tile_type(PhysicalTileType::new("noc_router", 1, 1));
        grid.place_tile(ty, 0, 0, 0).unwrap();
        grid.place_tile(ty, 1, 1, 0).unwrap();
        grid.place_tile(ty, 2, 0, 0).unwrap();
        let err = setup_noc(
            &grid,
            &arch(vec![
                router(0, 1.0 + 2e-10, 0.0, vec![]),
                router(1, 1.0, 1.0, vec![]),
                router(2, 2.0, 0.0, vec![]),
            ]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TopologyError::AmbiguousAssignment {
                router: 0,
                first: (0, 0),
                second: (2, 0),
            }
        );
    }

    #[test]
    fn tie_superseded_by_closer_tile_is_fine() {
        let mut grid = DeviceGrid::new(2, 3, 1, "clb");
        let ty = grid.add_tile_type(PhysicalTileType::new("noc_router", 1, 1));
        grid.place_tile(ty, 0, 0, 0).unwrap();
        grid.place_tile(ty, 0, 2, 0).unwrap();
        grid.place_tile(ty, 1, 1, 0).unwrap();
        // (0,0) and (0,2) tie for router 0 until (1,1) is scanned.
        let topo = setup_noc(
            &grid,
            &arch(vec![
                router(0, 0.5, 1.0, vec![]),
                router(1, 0.0, 0.0, vec![]),
                router(2, 0.0, 2.0, vec![]),
            ]),
        )
        .unwrap();
        let r0 = topo.convert_router_id(0).unwrap();
        assert_eq!(topo.router(r0).location, GridLocation::new(1, 1));
    }

    #[test]
    fn same_closest_tile_is_duplicate() {
        let grid = line_grid(2, 4);
        let err = setup_noc(
            &grid,
            &arch(vec![router(0, 0.0, 0.0, vec![]), router(1, 1.0, 0.0, vec![])]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TopologyError::DuplicateAssignment {
                router: 1,
                previous: 0,
                position: (0, 0),
            }
        );
    }

    #[test]
    fn unknown_connection_fails() {
        let grid = line_grid(2, 1);
        let err = setup_noc(
            &grid,
            &arch(vec![router(0, 0.0, 0.0, vec![7]), router(1, 1.0, 0.0, vec![])]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TopologyError::UnknownConnection {
                router: 0,
                target: 7
            }
        );
    }

    #[test]
    fn hint_layer_restricts_candidates() {
        let mut grid = DeviceGrid::new(2, 1, 2, "clb");
        let ty = grid.add_tile_type(PhysicalTileType::new("noc_router", 1, 1));
        grid.place_tile(ty, 0, 0, 0).unwrap();
        grid.place_tile(ty, 1, 0, 1).unwrap();
        let mut upper = router(1, 0.0, 0.0, vec![]);
        upper.layer = 1;
        let topo = setup_noc(&grid, &arch(vec![router(0, 1.0, 0.0, vec![]), upper])).unwrap();
        let r1 = topo.convert_router_id(1).unwrap();
        assert_eq!(topo.router(r1).location, GridLocation::with_layer(1, 0, 1));
    }
}
