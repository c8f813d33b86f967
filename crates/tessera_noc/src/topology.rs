//! The in-memory NoC topology: routers, directed links, and lookup indices.
//!
//! A [`NocTopology`] is assembled through a [`NocTopologyBuilder`] and is
//! read-only afterwards. Routers are addressed by a dense [`RouterId`]; the
//! user-facing id from the architecture description is kept alongside and
//! can be converted with [`NocTopology::convert_router_id`].

use crate::error::TopologyError;
use crate::ids::{LinkId, RouterId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tessera_common::ContentHash;

/// A position on the device grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridLocation {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Device layer.
    #[serde(default)]
    pub layer: i32,
}

impl GridLocation {
    /// Creates a location on layer 0.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, layer: 0 }
    }

    /// Creates a location on the given layer.
    pub fn with_layer(x: i32, y: i32, layer: i32) -> Self {
        Self { x, y, layer }
    }
}

impl std::fmt::Display for GridLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.layer)
    }
}

/// A hard NoC router bound to a physical tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NocRouter {
    /// Dense internal index.
    pub id: RouterId,
    /// User-facing id from the architecture description.
    pub user_id: u32,
    /// Anchor position of the physical router tile.
    pub location: GridLocation,
}

/// A directed link between two routers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NocLink {
    /// Dense link index.
    pub id: LinkId,
    /// The router this link leaves.
    pub source: RouterId,
    /// The router this link enters.
    pub sink: RouterId,
    /// Link capacity.
    pub bandwidth: f64,
    /// Propagation latency.
    pub latency: f64,
}

/// Compass direction of a link on the mesh, in increasing-coordinate terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkDirection {
    /// Increasing x.
    East,
    /// Decreasing x.
    West,
    /// Increasing y.
    North,
    /// Decreasing y.
    South,
}

impl LinkDirection {
    /// Returns `true` for east/west links.
    pub fn is_horizontal(self) -> bool {
        matches!(self, LinkDirection::East | LinkDirection::West)
    }

    /// Returns the opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            LinkDirection::East => LinkDirection::West,
            LinkDirection::West => LinkDirection::East,
            LinkDirection::North => LinkDirection::South,
            LinkDirection::South => LinkDirection::North,
        }
    }
}

/// The immutable router/link graph of a NoC.
#[derive(Debug, Clone)]
pub struct NocTopology {
    routers: Vec<NocRouter>,
    links: Vec<NocLink>,
    outgoing: Vec<Vec<LinkId>>,
    incoming: Vec<Vec<LinkId>>,
    user_ids: HashMap<u32, RouterId>,
    locations: HashMap<GridLocation, RouterId>,
    compressed: Vec<(i32, i32)>,
    link_bandwidth: f64,
    link_latency: f64,
    router_latency: f64,
}

impl NocTopology {
    /// All routers, indexed by [`RouterId`].
    pub fn routers(&self) -> &[NocRouter] {
        &self.routers
    }

    /// All links, indexed by [`LinkId`].
    pub fn links(&self) -> &[NocLink] {
        &self.links
    }

    /// Returns the router with the given ID.
    pub fn router(&self, id: RouterId) -> &NocRouter {
        &self.routers[id.index()]
    }

    /// Returns the link with the given ID.
    pub fn link(&self, id: LinkId) -> &NocLink {
        &self.links[id.index()]
    }

    /// Number of routers.
    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Iterator over every link ID in index order.
    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
        (0..self.links.len() as u32).map(LinkId::from_raw)
    }

    /// Iterator over every router ID in index order.
    pub fn router_ids(&self) -> impl Iterator<Item = RouterId> + '_ {
        (0..self.routers.len() as u32).map(RouterId::from_raw)
    }

    /// Links leaving the given router, in creation order.
    pub fn outgoing_links(&self, router: RouterId) -> &[LinkId] {
        &self.outgoing[router.index()]
    }

    /// Links entering the given router, in creation order.
    pub fn incoming_links(&self, router: RouterId) -> &[LinkId] {
        &self.incoming[router.index()]
    }

    /// Converts a user-facing router id to the dense internal id.
    pub fn convert_router_id(&self, user_id: u32) -> Option<RouterId> {
        self.user_ids.get(&user_id).copied()
    }

    /// Returns the router whose tile is anchored at `location`.
    pub fn router_at_location(&self, location: GridLocation) -> Option<RouterId> {
        self.locations.get(&location).copied()
    }

    /// Returns the first link from `source` to `sink`, if any.
    pub fn find_link(&self, source: RouterId, sink: RouterId) -> Option<LinkId> {
        self.outgoing_links(source)
            .iter()
            .copied()
            .find(|&l| self.link(l).sink == sink)
    }

    /// Returns the router's position in compressed router coordinates.
    ///
    /// The x (resp. y) coordinate is the rank of the router's column (row)
    /// among all distinct router columns (rows) on its layer, so adjacent
    /// router columns are one unit apart regardless of their physical pitch.
    pub fn compressed_location(&self, router: RouterId) -> (i32, i32) {
        self.compressed[router.index()]
    }

    /// Classifies a link by the direction it travels.
    ///
    /// Returns `None` when the endpoints differ in both axes, coincide, or sit
    /// on different layers.
    pub fn link_direction(&self, link: LinkId) -> Option<LinkDirection> {
        let l = self.link(link);
        let src = self.router(l.source).location;
        let dst = self.router(l.sink).location;
        if src.layer != dst.layer {
            return None;
        }
        match (src.x == dst.x, src.y == dst.y) {
            (true, false) if dst.y > src.y => Some(LinkDirection::North),
            (true, false) => Some(LinkDirection::South),
            (false, true) if dst.x > src.x => Some(LinkDirection::East),
            (false, true) => Some(LinkDirection::West),
            _ => None,
        }
    }

    /// Capacity shared by every link.
    pub fn link_bandwidth(&self) -> f64 {
        self.link_bandwidth
    }

    /// Propagation latency shared by every link.
    pub fn link_latency(&self) -> f64 {
        self.link_latency
    }

    /// Latency through a router.
    pub fn router_latency(&self) -> f64 {
        self.router_latency
    }

    /// A content hash over router ids, positions and link endpoints.
    ///
    /// Rebuilding from identical inputs yields an identical fingerprint.
    pub fn fingerprint(&self) -> ContentHash {
        let routers = self.routers.iter().flat_map(|r| {
            [
                i64::from(r.id.as_raw()),
                i64::from(r.user_id),
                i64::from(r.location.x),
                i64::from(r.location.y),
                i64::from(r.location.layer),
            ]
        });
        let links = self.links.iter().flat_map(|l| {
            [
                i64::from(l.id.as_raw()),
                i64::from(l.source.as_raw()),
                i64::from(l.sink.as_raw()),
            ]
        });
        ContentHash::from_words(routers.chain(links))
    }
}

/// Assembles a [`NocTopology`].
///
/// Routers must be added before the links that reference them.
#[derive(Debug)]
pub struct NocTopologyBuilder {
    topology: NocTopology,
}

impl NocTopologyBuilder {
    /// Starts an empty topology with the device-wide link and router constants.
    pub fn new(link_bandwidth: f64, link_latency: f64, router_latency: f64) -> Self {
        Self {
            topology: NocTopology {
                routers: Vec::new(),
                links: Vec::new(),
                outgoing: Vec::new(),
                incoming: Vec::new(),
                user_ids: HashMap::new(),
                locations: HashMap::new(),
                compressed: Vec::new(),
                link_bandwidth,
                link_latency,
                router_latency,
            },
        }
    }

    /// Adds a router and returns its dense ID.
    pub fn add_router(
        &mut self,
        user_id: u32,
        location: GridLocation,
    ) -> Result<RouterId, TopologyError> {
        let topo = &mut self.topology;
        if topo.user_ids.contains_key(&user_id) {
            return Err(TopologyError::DuplicateRouterId(user_id));
        }
        if topo.locations.contains_key(&location) {
            return Err(TopologyError::DuplicateLocation {
                x: location.x,
                y: location.y,
                layer: location.layer,
            });
        }
        let id = RouterId::from_raw(topo.routers.len() as u32);
        topo.routers.push(NocRouter {
            id,
            user_id,
            location,
        });
        topo.outgoing.push(Vec::new());
        topo.incoming.push(Vec::new());
        topo.user_ids.insert(user_id, id);
        topo.locations.insert(location, id);
        Ok(id)
    }

    /// Converts a user-facing router id to the dense ID assigned so far.
    pub fn convert_router_id(&self, user_id: u32) -> Option<RouterId> {
        self.topology.convert_router_id(user_id)
    }

    /// Adds a directed link between two existing routers.
    pub fn add_link(&mut self, source: RouterId, sink: RouterId) -> Result<LinkId, TopologyError> {
        let topo = &mut self.topology;
        assert!(source.index() < topo.routers.len() && sink.index() < topo.routers.len());
        if source == sink {
            return Err(TopologyError::SelfLink(topo.routers[source.index()].user_id));
        }
        let id = LinkId::from_raw(topo.links.len() as u32);
        topo.links.push(NocLink {
            id,
            source,
            sink,
            bandwidth: topo.link_bandwidth,
            latency: topo.link_latency,
        });
        topo.outgoing[source.index()].push(id);
        topo.incoming[sink.index()].push(id);
        Ok(id)
    }

    /// Finishes building and computes compressed router coordinates.
    pub fn finish(mut self) -> NocTopology {
        let topo = &mut self.topology;
        let mut columns: HashMap<i32, BTreeSet<i32>> = HashMap::new();
        let mut rows: HashMap<i32, BTreeSet<i32>> = HashMap::new();
        for r in &topo.routers {
            columns.entry(r.location.layer).or_default().insert(r.location.x);
            rows.entry(r.location.layer).or_default().insert(r.location.y);
        }
        let rank = |set: &BTreeSet<i32>, v: i32| set.range(..v).count() as i32;
        topo.compressed = topo
            .routers
            .iter()
            .map(|r| {
                let layer = r.location.layer;
                (
                    rank(&columns[&layer], r.location.x),
                    rank(&rows[&layer], r.location.y),
                )
            })
            .collect();
        self.topology
    }
}
