//! Reference values below match networkx on the same graphs.

use approx::assert_relative_eq;

use crate::graph::GraphBuilder;
use crate::measures::{DistancePolicy, GraphMetricsCalculator};
use crate::tests::test_data::{path3, path3_and_edge, star5};

#[test]
fn test_path_graph_measures() {
    crate::init();
    let metrics = GraphMetricsCalculator::default().compute(&path3());

    assert_eq!(metrics.degrees, vec![2, 1, 1]);
    assert_relative_eq!(metrics.degree_mean.unwrap(), 4.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.degree_std.unwrap(), (1.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
    assert_relative_eq!(metrics.degree_centrality_mean, 2.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.closeness_centrality_mean, 7.0 / 9.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.betweenness_centrality_mean, 1.0 / 3.0, epsilon = 1e-12);

    let d = metrics.distances.unwrap();
    assert_relative_eq!(d.radius, 1.0);
    assert_relative_eq!(d.diameter, 2.0);
    assert_relative_eq!(d.eccentricity, 5.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(d.shortest_path, 4.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn test_star_graph_node_measures() {
    crate::init();
    let calc = GraphMetricsCalculator::default();
    let nodes = calc.node_measures(&star5());

    let centre = &nodes[0];
    assert_eq!(centre.id, 1);
    assert_eq!(centre.degree, 4);
    assert_relative_eq!(centre.degree_centrality, 1.0);
    assert_relative_eq!(centre.closeness_centrality, 1.0);
    assert_relative_eq!(centre.betweenness_centrality, 1.0, epsilon = 1e-12);
    assert_eq!(centre.eccentricity, Some(1));

    for leaf in &nodes[1..] {
        assert_relative_eq!(leaf.degree_centrality, 0.25);
        assert_relative_eq!(leaf.closeness_centrality, 4.0 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(leaf.betweenness_centrality, 0.0);
        assert_eq!(leaf.eccentricity, Some(2));
    }

    let metrics = calc.compute(&star5());
    assert_relative_eq!(metrics.degree_centrality_mean, 0.4, epsilon = 1e-12);
    assert_relative_eq!(metrics.closeness_centrality_mean, 23.0 / 35.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.betweenness_centrality_mean, 0.2, epsilon = 1e-12);
}

#[test]
fn test_closeness_on_disconnected_graph_is_scaled_by_reach() {
    let nodes = GraphMetricsCalculator::default().node_measures(&path3_and_edge());
    // end of the 3-path: reaches 2 of 4 other nodes at total distance 3
    assert_relative_eq!(nodes[0].closeness_centrality, (2.0 / 3.0) * (2.0 / 4.0), epsilon = 1e-12);
    // edge endpoint: reaches 1 of 4 at distance 1
    assert_relative_eq!(nodes[3].closeness_centrality, 0.25, epsilon = 1e-12);
}

#[test]
fn test_largest_component_policy() {
    crate::init();
    let calc = GraphMetricsCalculator::new(DistancePolicy::LargestComponent);
    let d = calc.compute(&path3_and_edge()).distances.unwrap();

    assert_relative_eq!(d.radius, 1.0);
    assert_relative_eq!(d.diameter, 2.0);
    assert_relative_eq!(d.eccentricity, 5.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(d.shortest_path, 4.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn test_size_weighted_policy() {
    crate::init();
    let calc = GraphMetricsCalculator::new(DistancePolicy::SizeWeightedMean);
    let d = calc.compute(&path3_and_edge()).distances.unwrap();

    // path (size 3) weighs 3/5, edge (size 2) weighs 2/5
    assert_relative_eq!(d.radius, 1.0, epsilon = 1e-12);
    assert_relative_eq!(d.diameter, 1.6, epsilon = 1e-12);
    assert_relative_eq!(d.eccentricity, 1.4, epsilon = 1e-12);
    assert_relative_eq!(d.shortest_path, 1.2, epsilon = 1e-12);
}

#[test]
fn test_largest_component_tie_goes_to_smallest_id() {
    // triangle on 5, 6, 7 and path 1 - 2 - 3, both of size 3
    let graph = GraphBuilder::from_edges(&[], &[(5, 6), (6, 7), (5, 7), (1, 2), (2, 3)]);
    let calc = GraphMetricsCalculator::new(DistancePolicy::LargestComponent);
    let d = calc.compute(&graph).distances.unwrap();
    assert_relative_eq!(d.diameter, 2.0);
}

#[test]
fn test_singles_do_not_enter_distance_metrics() {
    let graph = GraphBuilder::from_edges(&[10, 11], &[(1, 2)]);
    for policy in [DistancePolicy::LargestComponent, DistancePolicy::SizeWeightedMean] {
        let d = GraphMetricsCalculator::new(policy)
            .compute(&graph)
            .distances
            .unwrap();
        assert_relative_eq!(d.diameter, 1.0);
        assert_relative_eq!(d.shortest_path, 1.0);
    }
}

#[test]
fn test_edgeless_graph_has_no_distance_metrics() {
    let graph = GraphBuilder::from_edges(&[1, 2, 3], &[]);
    let metrics = GraphMetricsCalculator::default().compute(&graph);
    assert_eq!(metrics.degrees, vec![0, 0, 0]);
    assert!(metrics.distances.is_none());
    assert_relative_eq!(metrics.closeness_centrality_mean, 0.0);
    assert_relative_eq!(metrics.betweenness_centrality_mean, 0.0);
}

#[test]
fn test_empty_graph_metrics() {
    let graph = GraphBuilder::from_records(&[]);
    let metrics = GraphMetricsCalculator::default().compute(&graph);
    assert!(metrics.degrees.is_empty());
    assert!(metrics.degree_mean.is_none());
    assert!(metrics.degree_std.is_none());
    assert_relative_eq!(metrics.degree_centrality_mean, 0.0);
    assert!(metrics.distances.is_none());
}

#[test]
fn test_single_node_graph() {
    let graph = GraphBuilder::from_edges(&[4], &[]);
    let metrics = GraphMetricsCalculator::default().compute(&graph);
    assert_relative_eq!(metrics.degree_centrality_mean, 1.0);
    assert!(metrics.degree_std.is_none());
    assert!(metrics.distances.is_none());
}

#[test]
fn test_size_weighted_integral_metrics_stay_exact() {
    crate::init();
    let edges: Vec<(u32, u32)> = (0..500u32).map(|i| (2 * i + 1, 2 * i + 2)).collect();
    let graph = GraphBuilder::from_edges(&[], &edges);
    let d = GraphMetricsCalculator::new(DistancePolicy::SizeWeightedMean)
        .compute(&graph)
        .distances
        .unwrap();
    assert_eq!(d.radius, 1.0);
    assert_eq!(d.diameter, 1.0);
    assert_eq!(d.eccentricity, 1.0);
    assert_eq!(d.shortest_path, 1.0);
}

#[test]
fn test_path_betweenness_profile() {
    // normalised betweenness of node i on a path of n nodes: 2 i (n-1-i) / ((n-1)(n-2))
    let graph = GraphBuilder::from_edges(&[], &[(1, 2), (2, 3), (3, 4), (4, 5)]);
    let nodes = GraphMetricsCalculator::default().node_measures(&graph);
    let expected = [0.0, 0.5, 2.0 / 3.0, 0.5, 0.0];
    for (node, want) in nodes.iter().zip(expected) {
        assert_relative_eq!(node.betweenness_centrality, want, epsilon = 1e-12);
    }
}

#[test]
fn test_betweenness_independent_of_component_layout() {
    // the path 1..5 inside a larger graph keeps its raw dependencies; only the
    // normalisation changes with n
    let graph = GraphBuilder::from_edges(&[20, 21], &[(1, 2), (2, 3), (3, 4), (4, 5), (10, 11)]);
    let n = graph.nnodes() as f64;
    let nodes = GraphMetricsCalculator::default().node_measures(&graph);
    let centre = nodes.iter().find(|m| m.id == 3).unwrap();
    // pairs (1,4), (1,5), (2,4), (2,5) pass through 3, each counted from both ends
    assert_relative_eq!(
        centre.betweenness_centrality,
        8.0 / ((n - 1.0) * (n - 2.0)),
        epsilon = 1e-12
    );
    let other = nodes.iter().find(|m| m.id == 10).unwrap();
    assert_relative_eq!(other.betweenness_centrality, 0.0);
}
