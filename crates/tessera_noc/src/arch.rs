//! The architecture-level NoC description.
//!
//! This is what the user declares: device-wide link and router constants, the
//! name of the physical tile that hosts a router, and a list of logical
//! routers with position hints and adjacency lists. [`setup_noc`](crate::setup_noc)
//! binds it to a [`DeviceGrid`](crate::DeviceGrid).

use serde::{Deserialize, Serialize};

/// A logical router as declared in the architecture description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalRouter {
    /// User-facing router id, referenced by connection lists.
    pub id: u32,
    /// Hint column; the router binds to the nearest physical router tile.
    pub x: f64,
    /// Hint row.
    pub y: f64,
    /// Device layer of the hint.
    #[serde(default)]
    pub layer: i32,
    /// User ids of the routers this router has outgoing links to.
    #[serde(default)]
    pub connections: Vec<u32>,
}

/// The NoC section of an architecture description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NocArchitecture {
    /// Name of the physical tile type that hosts a hard NoC router.
    pub router_tile_name: String,
    /// Bandwidth shared by every link.
    pub link_bandwidth: f64,
    /// Propagation latency shared by every link.
    pub link_latency: f64,
    /// Latency through a router.
    pub router_latency: f64,
    /// Logical routers in declaration order.
    pub routers: Vec<LogicalRouter>,
}

impl NocArchitecture {
    /// Describes a `cols × rows` mesh with bidirectional links between
    /// orthogonal neighbours.
    ///
    /// Router ids are assigned row-major from the bottom-left corner, and the
    /// position hints sit on a `spacing`-cell pitch so they line up with
    /// [`DeviceGrid::mesh`](crate::DeviceGrid::mesh).
    pub fn mesh(
        router_tile_name: impl Into<String>,
        cols: u32,
        rows: u32,
        spacing: u32,
        link_bandwidth: f64,
        link_latency: f64,
        router_latency: f64,
    ) -> Self {
        let id_of = |c: u32, r: u32| r * cols + c;
        let mut routers = Vec::with_capacity((cols * rows) as usize);
        for r in 0..rows {
            for c in 0..cols {
                let mut connections = Vec::new();
                if c + 1 < cols {
                    connections.push(id_of(c + 1, r));
                }
                if c > 0 {
                    connections.push(id_of(c - 1, r));
                }
                if r + 1 < rows {
                    connections.push(id_of(c, r + 1));
                }
                if r > 0 {
                    connections.push(id_of(c, r - 1));
                }
                routers.push(LogicalRouter {
                    id: id_of(c, r),
                    x: f64::from(c * spacing),
                    y: f64::from(r * spacing),
                    layer: 0,
                    connections,
                });
            }
        }
        Self {
            router_tile_name: router_tile_name.into(),
            link_bandwidth,
            link_latency,
            router_latency,
            routers,
        }
    }

    /// Returns the total number of declared links.
    pub fn declared_link_count(&self) -> usize {
        self.routers.iter().map(|r| r.connections.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_2x2_connections() {
        let arch = NocArchitecture::mesh("noc_router", 2, 2, 1, 1.0, 0.0, 0.0);
        assert_eq!(arch.routers.len(), 4);
        assert_eq!(arch.declared_link_count(), 8);
        assert_eq!(arch.routers[0].connections, vec![1, 2]);
        assert_eq!(arch.routers[3].connections, vec![2, 1]);
    }

    #[test]
    fn mesh_line_hints() {
        let arch = NocArchitecture::mesh("noc_router", 4, 1, 3, 1.0, 0.0, 0.0);
        let xs: Vec<f64> = arch.routers.iter().map(|r| r.x).collect();
        assert_eq!(xs, vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(arch.declared_link_count(), 6);
    }

    #[test]
    fn serde_defaults() {
        let json = r#"{"id": 4, "x": 1.5, "y": 2.0}"#;
        let r: LogicalRouter = serde_json::from_str(json).unwrap();
        assert_eq!(r.layer, 0);
        assert!(r.connections.is_empty());
    }
}
