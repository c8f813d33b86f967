//! End-to-end routing scenarios: topology setup, model building, solving and
//! route extraction on small meshes with known answers.

mod common;

use common::{assert_simple_path, params, Fixture, ROUTER_TILE};
use tessera_cpsat::SolverStatus;
use tessera_noc::{
    setup_noc, DeviceGrid, GridLocation, LogicalRouter, NocArchitecture, NocTopologyBuilder,
    PhysicalTileType, TopologyError, TurnModelKind,
};
use tessera_route::{
    analyze_routes, FlowId, RoutingError, SatRoutingParams, MAX_BANDWIDTH_RESOLUTION,
};

#[test]
fn straight_line_takes_the_only_chain() {
    let mut fx = Fixture::mesh(4, 1, 3, 100.0);
    fx.add_flow("f0", (0, 0), (3, 0), 10.0, None);

    let run = fx.route(&params(100));
    let outcome = run.outcome();

    assert_eq!(outcome.status, SolverStatus::Optimal);
    let expected = vec![
        fx.link((0, 0), (1, 0)),
        fx.link((1, 0), (2, 0)),
        fx.link((2, 0), (3, 0)),
    ];
    assert_eq!(outcome.routes, vec![expected]);
    assert!(outcome.congested_links.is_empty());
    assert!(outcome.latency_overruns.is_empty());
    // Three links carrying 10 units each.
    assert_eq!(outcome.objective, Some(30));
}

#[test]
fn shared_link_is_congested() {
    let mut fx = Fixture::mesh(2, 1, 1, 100.0);
    fx.add_flow("a", (0, 0), (1, 0), 75.0, None);
    fx.add_flow("b", (0, 0), (1, 0), 75.0, None);

    let run = fx.route(&params(100));
    let outcome = run.outcome();

    let shared = fx.link((0, 0), (1, 0));
    assert_eq!(outcome.status, SolverStatus::Optimal);
    assert_eq!(outcome.routes, vec![vec![shared], vec![shared]]);
    assert_eq!(outcome.congested_links, vec![shared]);
    assert!(run.has_code("R002"));
}

#[test]
fn equal_length_alternative_splits_flows() {
    let mut fx = Fixture::mesh(2, 2, 1, 100.0);
    fx.add_flow("a", (0, 0), (1, 1), 75.0, None);
    fx.add_flow("b", (0, 0), (1, 1), 75.0, None);

    let run = fx.route(&params(100));
    let outcome = run.outcome();

    assert_eq!(outcome.status, SolverStatus::Optimal);
    assert!(outcome.congested_links.is_empty());
    let (a, b) = (&outcome.routes[0], &outcome.routes[1]);
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert!(a.iter().all(|l| !b.contains(l)), "flows share a link: {a:?} {b:?}");
    assert!(!run.has_code("R002"));
}

#[test]
fn single_xy_path_congests_both_links() {
    // Under XY only one path exists, so both flows must share it.
    let mut fx = Fixture::mesh(2, 2, 1, 100.0).with_turn_model(TurnModelKind::Xy);
    fx.add_flow("a", (0, 0), (1, 1), 75.0, None);
    fx.add_flow("b", (0, 0), (1, 1), 75.0, None);

    let run = fx.route(&params(100));
    let outcome = run.outcome();

    let xy = vec![fx.link((0, 0), (1, 0)), fx.link((1, 0), (1, 1))];
    assert_eq!(outcome.routes, vec![xy.clone(), xy.clone()]);
    let mut congested = outcome.congested_links.clone();
    congested.sort();
    let mut expected = xy;
    expected.sort();
    assert_eq!(congested, expected);
}

#[test]
fn latency_budget_overrun_is_counted() {
    // budget = floor((5 − 1) / (1 + 1)) = 2, shortest path is 3 links.
    let mut fx = Fixture::mesh_with_latency(4, 1, 3, 100.0, 1.0, 1.0);
    let flow = fx.add_flow("f0", (0, 0), (3, 0), 10.0, Some(5.0));

    let run = fx.route(&params(100));
    let outcome = run.outcome();

    assert_eq!(outcome.status, SolverStatus::Optimal);
    assert_eq!(outcome.routes[0].len(), 3);
    assert_eq!(outcome.latency_overruns, vec![(flow, 1)]);
    assert!(run.has_code("R003"));
}

#[test]
fn latency_within_budget_has_no_overrun() {
    // budget = floor((7 − 1) / 2) = 3
    let mut fx = Fixture::mesh_with_latency(4, 1, 3, 100.0, 1.0, 1.0);
    fx.add_flow("f0", (0, 0), (3, 0), 10.0, Some(7.0));

    let run = fx.route(&params(100));
    assert!(run.outcome().latency_overruns.is_empty());
    assert!(!run.has_code("R003"));
}

#[test]
fn equidistant_hint_is_a_configuration_error() {
    let mut grid = DeviceGrid::new(3, 1, 1, "clb");
    let ty = grid.add_tile_type(PhysicalTileType::new(ROUTER_TILE, 1, 1));
    grid.place_tile(ty, 0, 0, 0).unwrap();
    grid.place_tile(ty, 2, 0, 0).unwrap();
    let arch = NocArchitecture {
        router_tile_name: ROUTER_TILE.into(),
        link_bandwidth: 1.0,
        link_latency: 1.0,
        router_latency: 1.0,
        routers: vec![
            LogicalRouter {
                id: 0,
                x: 1.0,
                y: 0.0,
                layer: 0,
                connections: vec![1],
            },
            LogicalRouter {
                id: 1,
                x: 2.0,
                y: 0.0,
                layer: 0,
                connections: vec![0],
            },
        ],
    };

    let err = setup_noc(&grid, &arch).unwrap_err();
    assert!(matches!(err, TopologyError::AmbiguousAssignment { router: 0, .. }));
}

#[test]
fn two_routers_nearest_one_tile_is_a_configuration_error() {
    let mut grid = DeviceGrid::new(5, 1, 1, "clb");
    let ty = grid.add_tile_type(PhysicalTileType::new(ROUTER_TILE, 1, 1));
    grid.place_tile(ty, 0, 0, 0).unwrap();
    grid.place_tile(ty, 4, 0, 0).unwrap();
    let router = |id, x| LogicalRouter {
        id,
        x,
        y: 0.0,
        layer: 0,
        connections: Vec::new(),
    };
    let arch = NocArchitecture {
        router_tile_name: ROUTER_TILE.into(),
        link_bandwidth: 1.0,
        link_latency: 1.0,
        router_latency: 1.0,
        routers: vec![router(0, 0.0), router(1, 0.5)],
    };

    let err = setup_noc(&grid, &arch).unwrap_err();
    assert!(matches!(
        err,
        TopologyError::DuplicateAssignment {
            router: 1,
            previous: 0,
            ..
        }
    ));
}

#[test]
fn zero_flows_is_optimal_and_empty() {
    let fx = Fixture::mesh(2, 2, 1, 100.0);
    let run = fx.route(&params(100));
    let outcome = run.outcome();
    assert_eq!(outcome.status, SolverStatus::Optimal);
    assert!(outcome.routes.is_empty());
    assert!(run.diagnostics.is_empty());
}

#[test]
fn local_flow_gets_empty_route() {
    let mut fx = Fixture::mesh(2, 1, 1, 100.0);
    fx.add_flow("loop", (1, 0), (1, 0), 10.0, None);
    fx.add_flow("hop", (0, 0), (1, 0), 10.0, None);

    let run = fx.route(&params(100));
    let outcome = run.outcome();
    assert_eq!(outcome.status, SolverStatus::Optimal);
    assert!(outcome.routes[0].is_empty());
    assert_eq!(outcome.routes[1], vec![fx.link((0, 0), (1, 0))]);
    assert!(run.has_code("R004"));
}

#[test]
fn unreachable_sink_is_infeasible() {
    // Two routers with a single eastbound link.
    let mut b = NocTopologyBuilder::new(100.0, 1.0, 1.0);
    let west = b.add_router(0, GridLocation::new(0, 0)).unwrap();
    let east = b.add_router(1, GridLocation::new(1, 0)).unwrap();
    b.add_link(west, east).unwrap();
    let topology = b.finish();

    let mut fx = Fixture::mesh(2, 1, 1, 100.0);
    fx.topology = topology;
    fx.add_flow("back", (1, 0), (0, 0), 10.0, None);

    let run = fx.route(&params(100));
    let outcome = run.outcome();
    assert_eq!(outcome.status, SolverStatus::Infeasible);
    assert!(outcome.routes.is_empty());
    assert!(run.has_code("S001"));
}

#[test]
fn crossing_mesh_traffic_is_proven_optimal() {
    let mut fx = Fixture::mesh(4, 4, 1, 100.0);
    let mut endpoints = Vec::new();
    for r in 0..4 {
        endpoints.push(((0, r), (3, r)));
    }
    for c in 0..4 {
        endpoints.push(if c % 2 == 0 { ((c, 0), (c, 3)) } else { ((c, 3), (c, 0)) });
    }
    for (i, &(from, to)) in endpoints.iter().enumerate() {
        fx.add_flow(&format!("f{i}"), from, to, 40.0, Some(20.0));
    }

    let run = fx.route(&SatRoutingParams {
        time_limit: Some(std::time::Duration::from_secs(20)),
        ..params(100)
    });
    let outcome = run.outcome();

    assert_eq!(outcome.status, SolverStatus::Optimal);
    // Eight straight three-link paths carrying 40 units each.
    assert_eq!(outcome.objective, Some(8 * 3 * 40));
    assert!(outcome.congested_links.is_empty());
    assert!(outcome.latency_overruns.is_empty());
    for (route, &(from, to)) in outcome.routes.iter().zip(&endpoints) {
        assert_eq!(route.len(), 3, "{route:?}");
        assert_simple_path(&fx.topology, route, fx.router(from.0, from.1), fx.router(to.0, to.1));
    }
}

#[test]
fn zero_time_limit_is_unknown() {
    let mut fx = Fixture::mesh(3, 3, 1, 100.0);
    fx.add_flow("f0", (0, 0), (2, 2), 10.0, None);

    let run = fx.route(&SatRoutingParams {
        time_limit: Some(std::time::Duration::ZERO),
        ..params(100)
    });
    let outcome = run.outcome();
    assert_eq!(outcome.status, SolverStatus::Unknown);
    assert!(outcome.routes.is_empty());
    assert!(run.has_code("S002"));
}

#[test]
fn bandwidth_refinement_keeps_overrun() {
    let mut fx = Fixture::mesh_with_latency(3, 2, 1, 100.0, 1.0, 1.0);
    // budget = floor((3 − 1) / 2) = 1 against a 3-link shortest path.
    fx.add_flow("tight", (0, 0), (2, 1), 20.0, Some(3.0));
    fx.add_flow("loose", (0, 1), (2, 1), 20.0, None);

    let first = fx.route(&params(100));
    let refined = fx.route(&SatRoutingParams {
        minimize_aggregate_bandwidth: true,
        ..params(100)
    });

    let (first, refined) = (first.outcome(), refined.outcome());
    assert_eq!(refined.status, SolverStatus::Optimal);
    assert_eq!(refined.latency_overruns, first.latency_overruns);
    assert_eq!(refined.latency_overruns, vec![(FlowId::from_raw(0), 2)]);
    let report = analyze_routes(&fx.topology, &fx.flows, &refined.routes, 100);
    assert_eq!(report.aggregate_bandwidth(), 20 * 3 + 20 * 2);
}

#[test]
fn stored_routes_warm_start_the_next_call() {
    let mut fx = Fixture::mesh(3, 2, 1, 100.0);
    fx.add_flow("f0", (0, 0), (2, 1), 40.0, None);

    let first = fx.route(&params(100)).outcome().clone();
    first.apply_to(&mut fx.flows);
    assert_eq!(fx.flows.route(FlowId::from_raw(0)), first.routes[0].as_slice());

    let second = fx.route(&params(100));
    assert_eq!(second.outcome().objective, first.objective);
    assert_simple_path(
        &fx.topology,
        &second.outcome().routes[0],
        fx.router(0, 0),
        fx.router(2, 1),
    );
}

#[test]
fn unplaced_cluster_is_rejected() {
    let mut fx = Fixture::mesh(2, 1, 1, 100.0);
    let name = fx.interner.get_or_intern("f0");
    let ghost = fx.interner.get_or_intern("ghost");
    let real = fx.cluster(0, 0);
    fx.flows.add_flow(name, real, ghost, 1.0, None);

    let run = fx.route(&params(100));
    match run.result {
        Err(RoutingError::UnplacedCluster { flow, cluster }) => {
            assert_eq!(flow, "f0");
            assert_eq!(cluster, "ghost");
        }
        other => panic!("expected UnplacedCluster, got {other:?}"),
    }
}

#[test]
fn placement_without_router_is_rejected() {
    let mut fx = Fixture::mesh(2, 1, 3, 100.0);
    let stray = fx.interner.get_or_intern("stray");
    fx.placement.place(stray, GridLocation::new(1, 0));
    let name = fx.interner.get_or_intern("f0");
    let real = fx.cluster(0, 0);
    fx.flows.add_flow(name, stray, real, 1.0, None);

    let run = fx.route(&params(100));
    assert!(matches!(
        run.result,
        Err(RoutingError::NoRouterAtLocation { .. })
    ));
}

#[test]
fn non_positive_resolution_is_rejected() {
    let mut fx = Fixture::mesh(2, 1, 1, 100.0);
    fx.add_flow("f0", (0, 0), (1, 0), 1.0, None);
    let run = fx.route(&params(0));
    assert!(matches!(run.result, Err(RoutingError::InvalidResolution(0))));
}

#[test]
fn oversized_resolution_is_rejected() {
    let mut fx = Fixture::mesh(2, 1, 1, 100.0);
    fx.add_flow("f0", (0, 0), (1, 0), 0.0, None);

    let run = fx.route(&params(i64::MAX));
    assert!(matches!(
        run.result,
        Err(RoutingError::InvalidResolution(i64::MAX))
    ));

    let run = fx.route(&params(MAX_BANDWIDTH_RESOLUTION));
    let outcome = run.outcome();
    assert_eq!(outcome.status, SolverStatus::Optimal);
    assert_eq!(outcome.routes, vec![vec![fx.link((0, 0), (1, 0))]]);
    assert!(outcome.congested_links.is_empty());
}

#[test]
fn diagonal_link_is_rejected() {
    let mut b = NocTopologyBuilder::new(100.0, 1.0, 1.0);
    let a = b.add_router(0, GridLocation::new(0, 0)).unwrap();
    let c = b.add_router(1, GridLocation::new(1, 1)).unwrap();
    b.add_link(a, c).unwrap();

    let mut fx = Fixture::mesh(2, 2, 1, 100.0);
    fx.topology = b.finish();
    fx.add_flow("f0", (0, 0), (1, 1), 1.0, None);

    let run = fx.route(&params(100));
    assert!(matches!(run.result, Err(RoutingError::UnclassifiableLink(_))));
}

#[test]
fn tiny_demand_warns_about_resolution() {
    let mut fx = Fixture::mesh(2, 1, 1, 1000.0);
    fx.add_flow("trickle", (0, 0), (1, 0), 1.0, None);

    let run = fx.route(&params(100));
    assert_eq!(run.outcome().status, SolverStatus::Optimal);
    assert!(run.has_code("R001"));
}
