//! Network construction and flow accumulation on small hand-built networks.
//!
//! Covers both input paths (endpoint geometry and connectivity tables), the
//! deterministic sort and the accumulation scenarios used as reference
//! values by the routing model.

use approx::assert_relative_eq;
use rivnet_rs::{
    ConnectivityRow, EndpointConvention, NetworkBuilder, NetworkError, NetworkOperator, Point2,
    ReachGeometry, RiverNetwork,
};

fn rows(pairs: &[(u64, u64)]) -> Vec<ConnectivityRow> {
    pairs
        .iter()
        .map(|&(id, down)| ConnectivityRow::new(id, down))
        .collect()
}

/// 1, 2 -> 3 -> 4
fn y_geometry() -> Vec<ReachGeometry> {
    vec![
        ReachGeometry::from_polyline(1, &[Point2::new(0.0, 2.0), Point2::new(1.0, 1.0)]).unwrap(),
        ReachGeometry::from_polyline(
            2,
            &[
                Point2::new(2.0, 3.0),
                Point2::new(2.0, 2.0),
                Point2::new(1.0, 1.0),
            ],
        )
        .unwrap(),
        ReachGeometry::from_endpoints(3, Point2::new(1.0, 1.0), Point2::new(1.0, 0.0)),
        ReachGeometry::from_endpoints(4, Point2::new(1.0, 0.0), Point2::new(1.0, -2.0)),
    ]
}

#[test]
fn test_scenario_chain() {
    let network = NetworkBuilder::new()
        .from_connectivity(&rows(&[(1, 2), (2, 3), (3, 4), (4, 0)]))
        .unwrap();
    let op = NetworkOperator::from_network(&network);
    let q = op.accumulate(&[10.0; 4]).unwrap();
    assert_eq!(q, vec![10.0, 20.0, 30.0, 40.0]);
    assert_eq!(network.sort_order(), vec![1, 2, 3, 4]);
    assert_eq!(network.outlets(), vec![4]);
}

#[test]
fn test_scenario_confluence() {
    let network = NetworkBuilder::new()
        .from_connectivity(&rows(&[(1, 3), (2, 3), (3, 4), (4, 0)]))
        .unwrap();
    let op = NetworkOperator::from_network(&network);
    let q = op.accumulate(&[5.0, 7.0, 0.0, 0.0]).unwrap();
    assert_eq!(q, vec![5.0, 7.0, 12.0, 12.0]);

    let levels: Vec<u32> = network.reaches().iter().map(|r| r.topo_level).collect();
    assert_eq!(levels, vec![3, 3, 2, 1]);
    // Equal levels break ties by descending id
    assert_eq!(network.sort_order(), vec![2, 1, 3, 4]);
    assert_eq!(network.sort_table(), vec![1, 0, 2, 3]);
}

#[test]
fn test_geometry_matches_connectivity() {
    let from_geometry = NetworkBuilder::new().from_geometry(&y_geometry()).unwrap();
    let from_table = NetworkBuilder::new()
        .from_connectivity(&rows(&[(1, 3), (2, 3), (3, 4), (4, 0)]))
        .unwrap();

    assert_eq!(from_geometry.sort_order(), from_table.sort_order());
    assert_eq!(from_geometry.upstream_of(3).unwrap(), vec![1, 2]);
    assert_eq!(from_geometry.downstream_of(4).unwrap(), None);
    assert_relative_eq!(
        from_geometry.reach(2).unwrap().length,
        1.0 + 2.0_f64.sqrt(),
        max_relative = 1e-12
    );
    assert_eq!(from_geometry.reach(4).unwrap().length, 2.0);
}

#[test]
fn test_reversed_digitization() {
    let reversed: Vec<ReachGeometry> = y_geometry()
        .into_iter()
        .map(|g| ReachGeometry::from_endpoints(g.id, g.end, g.start).with_length(g.length))
        .collect();
    let network = NetworkBuilder::new()
        .with_convention(EndpointConvention::UpstreamAtEnd)
        .from_geometry(&reversed)
        .unwrap();
    assert_eq!(network.sort_order(), vec![2, 1, 3, 4]);
    assert_eq!(network.upstream_basin(3).unwrap(), vec![2, 1, 3]);
}

#[test]
fn test_dangling_downstream_is_disconnected() {
    let err = NetworkBuilder::new()
        .from_connectivity(&rows(&[(1, 2), (2, 99), (3, 0)]))
        .unwrap_err();
    assert_eq!(err, NetworkError::Disconnected { ids: vec![2] });
}

#[test]
fn test_cycle_is_disconnected() {
    let err = NetworkBuilder::new()
        .from_connectivity(&rows(&[(1, 2), (2, 3), (3, 1), (4, 0)]))
        .unwrap_err();
    assert_eq!(err, NetworkError::Disconnected { ids: vec![1, 2, 3] });
}

#[test]
fn test_duplicate_id() {
    let err = NetworkBuilder::new()
        .from_connectivity(&rows(&[(1, 0), (1, 0)]))
        .unwrap_err();
    assert_eq!(err, NetworkError::DuplicateId(1));
}

#[test]
fn test_unknown_id_query() {
    let network = NetworkBuilder::new()
        .from_connectivity(&rows(&[(1, 0)]))
        .unwrap();
    assert_eq!(network.reach(5).unwrap_err(), NetworkError::UnknownId(5));
}

#[test]
fn test_empty_network() {
    let network: RiverNetwork = NetworkBuilder::new().from_connectivity(&[]).unwrap();
    assert!(network.is_empty());
    let op = NetworkOperator::from_network(&network);
    assert!(op.accumulate(&[]).unwrap().is_empty());
}

#[test]
fn test_single_reach() {
    let network = NetworkBuilder::new()
        .from_connectivity(&rows(&[(42, 0)]))
        .unwrap();
    let reach = network.reach(42).unwrap();
    assert_eq!(reach.topo_level, 1);
    assert_eq!(reach.sort_rank, 0);
    let op = NetworkOperator::from_network(&network);
    assert_eq!(op.accumulate(&[3.5]).unwrap(), vec![3.5]);
}

#[test]
fn test_max_upstream_grows_to_fit() {
    let network = NetworkBuilder::new()
        .with_max_upstream(1)
        .from_connectivity(&rows(&[(1, 4), (2, 4), (3, 4), (4, 0)]))
        .unwrap();
    assert_eq!(network.max_upstream(), 3);
    let row = &network.connectivity_rows()[3];
    assert_eq!(row.to_fields(network.max_upstream()), vec![4, 0, 3, 1, 2, 3]);
}

#[test]
fn test_nan_endpoint_rejected() {
    let geometry = vec![
        ReachGeometry::from_endpoints(1, Point2::new(0.0, 0.0), Point2::new(f64::NAN, 0.0)),
        ReachGeometry::from_endpoints(2, Point2::new(f64::NAN, 0.0), Point2::new(5.0, 5.0)),
    ];
    let err = NetworkBuilder::new().from_geometry(&geometry).unwrap_err();
    assert!(matches!(err, NetworkError::NonFiniteCoordinate { id: 1, .. }));
}
