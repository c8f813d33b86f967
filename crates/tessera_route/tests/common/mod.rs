//! Shared fixtures: mesh topologies with named router clusters on every
//! router tile.

#![allow(dead_code)]

use tessera_common::{Ident, Interner};
use tessera_cpsat::BranchAndBound;
use tessera_diagnostics::{Diagnostic, DiagnosticSink};
use tessera_noc::{
    setup_noc, DeviceGrid, GridLocation, LinkId, NocArchitecture, NocTopology, PhysicalTileType,
    RouterId, TurnModel, TurnModelKind,
};
use tessera_route::{
    noc_sat_route, FlowId, RouterPlacement, RoutingContext, RoutingError, RoutingOutcome,
    SatRoutingParams, TrafficFlows,
};

pub const ROUTER_TILE: &str = "noc_router";

pub struct Fixture {
    pub topology: NocTopology,
    pub interner: Interner,
    pub flows: TrafficFlows,
    pub placement: RouterPlacement,
    pub turn_model: &'static dyn TurnModel,
    spacing: i32,
}

pub struct Run {
    pub result: Result<RoutingOutcome, RoutingError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Run {
    pub fn outcome(&self) -> &RoutingOutcome {
        self.result.as_ref().expect("routing failed")
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code.to_string() == code)
    }
}

impl Fixture {
    /// A `cols × rows` mesh of single-cell router tiles `spacing` cells apart,
    /// built through the topology builder. Every router hosts a cluster named
    /// `r<col>_<row>`.
    pub fn mesh(cols: u32, rows: u32, spacing: u32, link_bandwidth: f64) -> Self {
        Self::mesh_with_latency(cols, rows, spacing, link_bandwidth, 1.0, 1.0)
    }

    pub fn mesh_with_latency(
        cols: u32,
        rows: u32,
        spacing: u32,
        link_bandwidth: f64,
        link_latency: f64,
        router_latency: f64,
    ) -> Self {
        let tile = PhysicalTileType::new(ROUTER_TILE, 1, 1);
        let grid = DeviceGrid::mesh(cols, rows, spacing, &tile);
        let arch = NocArchitecture::mesh(
            ROUTER_TILE,
            cols,
            rows,
            spacing,
            link_bandwidth,
            link_latency,
            router_latency,
        );
        let topology = setup_noc(&grid, &arch).expect("mesh setup");
        let interner = Interner::new();
        let mut placement = RouterPlacement::new();
        for c in 0..cols {
            for r in 0..rows {
                let name = interner.get_or_intern(&format!("r{c}_{r}"));
                placement.place(
                    name,
                    GridLocation::new((c * spacing) as i32, (r * spacing) as i32),
                );
            }
        }
        Self {
            topology,
            interner,
            flows: TrafficFlows::new(),
            placement,
            turn_model: TurnModelKind::WestFirst.model(),
            spacing: spacing as i32,
        }
    }

    pub fn with_turn_model(mut self, kind: TurnModelKind) -> Self {
        self.turn_model = kind.model();
        self
    }

    pub fn cluster(&self, col: u32, row: u32) -> Ident {
        self.interner.get_or_intern(&format!("r{col}_{row}"))
    }

    pub fn router(&self, col: u32, row: u32) -> RouterId {
        let loc = GridLocation::new(col as i32 * self.spacing, row as i32 * self.spacing);
        self.topology.router_at_location(loc).expect("router tile")
    }

    /// The link between two mesh positions.
    pub fn link(&self, from: (u32, u32), to: (u32, u32)) -> LinkId {
        self.topology
            .find_link(self.router(from.0, from.1), self.router(to.0, to.1))
            .expect("adjacent routers")
    }

    pub fn add_flow(
        &mut self,
        name: &str,
        from: (u32, u32),
        to: (u32, u32),
        bandwidth: f64,
        max_latency: Option<f64>,
    ) -> FlowId {
        let name = self.interner.get_or_intern(name);
        let (source, sink) = (self.cluster(from.0, from.1), self.cluster(to.0, to.1));
        self.flows.add_flow(name, source, sink, bandwidth, max_latency)
    }

    pub fn context(&self) -> RoutingContext<'_> {
        RoutingContext::new(
            &self.topology,
            &self.flows,
            &self.placement,
            self.turn_model,
            &self.interner,
        )
    }

    pub fn route(&self, params: &SatRoutingParams) -> Run {
        let sink = DiagnosticSink::new();
        let result = noc_sat_route(&self.context(), params, &BranchAndBound, &sink);
        Run {
            result,
            diagnostics: sink.take_all(),
        }
    }
}

pub fn params(resolution: i64) -> SatRoutingParams {
    SatRoutingParams {
        bandwidth_resolution: resolution,
        seed: 1,
        ..SatRoutingParams::default()
    }
}

/// Asserts that `route` is a simple path from `source` to `sink`.
pub fn assert_simple_path(topology: &NocTopology, route: &[LinkId], source: RouterId, sink: RouterId) {
    if source == sink {
        assert!(route.is_empty());
        return;
    }
    assert!(!route.is_empty(), "empty route between distinct routers");
    assert_eq!(topology.link(route[0]).source, source);
    assert_eq!(topology.link(route[route.len() - 1]).sink, sink);
    let mut visited = vec![source];
    for pair in route.windows(2) {
        assert_eq!(topology.link(pair[0]).sink, topology.link(pair[1]).source);
    }
    for &l in route {
        let at = topology.link(l).sink;
        assert!(!visited.contains(&at), "router {at} visited twice");
        visited.push(at);
    }
}
