//! Shared fixtures for the test suite.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::graph::{GraphBuilder, NeighborGraph};
use crate::records::{AdjacencyRecord, CellId};

/// Cell 1 touches nothing, cells 2 and 3 touch each other.
pub fn lone_and_pair(key: &str, seed: u32, tick: u32) -> Vec<AdjacencyRecord> {
    vec![
        AdjacencyRecord::new(key, seed, tick, 1, &[0], 0.0, 0.0),
        AdjacencyRecord::new(key, seed, tick, 2, &[3], 10.0, 0.0),
        AdjacencyRecord::new(key, seed, tick, 3, &[2], 20.0, 0.0),
    ]
}

/// `n` cells that all report "no neighbor".
pub fn isolated_cells(n: u32) -> Vec<AdjacencyRecord> {
    (1..=n)
        .map(|id| AdjacencyRecord::new("iso", 0, 0, id, &[0], id as f64, 0.0))
        .collect()
}

/// Path 1 - 2 - 3.
pub fn path3() -> NeighborGraph {
    GraphBuilder::from_edges(&[], &[(1, 2), (2, 3)])
}

/// Star with centre 1 and leaves 2..=5.
pub fn star5() -> NeighborGraph {
    GraphBuilder::from_edges(&[], &[(1, 2), (1, 3), (1, 4), (1, 5)])
}

/// Path 1 - 2 - 3 plus the separate edge 4 - 5.
pub fn path3_and_edge() -> NeighborGraph {
    GraphBuilder::from_edges(&[], &[(1, 2), (2, 3), (4, 5)])
}

/// Random sparse graph on cells 1..=n, some of them isolated.
pub fn random_graph(n: u32, edges: usize, seed: u64) -> NeighborGraph {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let nodes: Vec<CellId> = (1..=n).collect();
    let pairs: Vec<(CellId, CellId)> = (0..edges)
        .map(|_| (rng.random_range(1..=n), rng.random_range(1..=n)))
        .collect();
    GraphBuilder::from_edges(&nodes, &pairs)
}

/// Two tight square blobs around (0, 0) and (1, 1), `per_blob` points each.
pub fn two_blobs(per_blob: usize) -> Vec<Vec<f64>> {
    let mut rows = Vec::with_capacity(2 * per_blob);
    for centre in [0.0, 1.0] {
        for i in 0..per_blob {
            let dx = 0.001 * (i % 5) as f64;
            let dy = 0.001 * (i / 5) as f64;
            rows.push(vec![centre + dx, centre + dy]);
        }
    }
    rows
}
