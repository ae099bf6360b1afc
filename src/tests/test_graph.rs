use crate::graph::GraphBuilder;
use crate::records::AdjacencyRecord;
use crate::tests::test_data::{isolated_cells, lone_and_pair, path3};

#[test]
fn test_lone_cell_and_pair() {
    crate::init();
    let graph = GraphBuilder::from_records(&lone_and_pair("ctrl", 0, 0));

    assert_eq!(graph.ids(), &[1, 2, 3]);
    assert_eq!(graph.nnodes(), 3);
    assert_eq!(graph.nedges(), 1);
    assert_eq!(graph.edges(), vec![(2, 3)]);
    assert!(graph.has_edge(2, 3));
    assert!(graph.has_edge(3, 2));
    assert!(!graph.has_edge(1, 2));
    assert_eq!(graph.degree(graph.index_of(1).unwrap()), 0);
}

#[test]
fn test_all_sentinel_gives_edgeless_graph() {
    let graph = GraphBuilder::from_records(&isolated_cells(4));
    assert_eq!(graph.nnodes(), 4);
    assert_eq!(graph.nedges(), 0);
}

#[test]
fn test_empty_input_gives_empty_graph() {
    let graph = GraphBuilder::from_records(&[]);
    assert!(graph.is_empty());
    assert_eq!(graph.nedges(), 0);
    assert!(graph.edges().is_empty());
}

#[test]
fn test_neighbor_without_own_record_becomes_node() {
    let records = vec![AdjacencyRecord::new("k", 0, 0, 1, &[7], 0.0, 0.0)];
    let graph = GraphBuilder::from_records(&records);
    assert_eq!(graph.ids(), &[1, 7]);
    assert!(graph.has_edge(1, 7));
}

#[test]
fn test_duplicate_edges_and_self_loops_collapse() {
    let records = vec![
        AdjacencyRecord::new("k", 0, 0, 1, &[2, 2, 1], 0.0, 0.0),
        AdjacencyRecord::new("k", 0, 0, 2, &[1], 1.0, 0.0),
    ];
    let graph = GraphBuilder::from_records(&records);
    assert_eq!(graph.nedges(), 1);
    assert_eq!(graph.degree(0), 1);
    assert_eq!(graph.adjacency().get(0, 0), None);
}

#[test]
fn test_adjacency_is_symmetric() {
    let graph = path3();
    let adj = graph.adjacency();
    for i in 0..graph.nnodes() {
        for j in 0..graph.nnodes() {
            assert_eq!(adj.get(i, j), adj.get(j, i));
        }
    }
    assert_eq!(graph.neighbors(1), &[0, 2]);
}

#[test]
fn test_subgraph_reindexes_nodes() {
    let graph = GraphBuilder::from_edges(&[9], &[(1, 2), (2, 3), (3, 4)]);
    let sub = graph.subgraph(&[1, 2, 4]);
    assert_eq!(sub.ids(), &[2, 3, 9]);
    assert_eq!(sub.edges(), vec![(2, 3)]);
}

#[test]
fn test_display_lists_adjacency() {
    let text = format!("{}", path3());
    assert!(text.contains("3 nodes, 2 edges"));
    assert!(text.contains("2 -> [1, 3]"));
}

#[test]
#[should_panic(expected = "out of bounds")]
fn test_id_of_out_of_bounds_panics() {
    path3().id_of(3);
}
