use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::records::{AdjacencyRecord, CellId};

use sprs::{CsMat, TriMat};

use log::{debug, info, trace};

/// Undirected neighbor graph of the cells of one tick.
///
/// Nodes are stored in ascending cell-id order; node `i` corresponds to
/// `ids()[i]`. The adjacency matrix is symmetric with unit entries and an empty
/// diagonal.
#[derive(Debug, Clone)]
pub struct NeighborGraph {
    ids: Vec<CellId>,
    index: HashMap<CellId, usize>,
    adjacency: CsMat<u8>,
    // row views of `adjacency`, cached for traversals
    rows: Vec<Vec<usize>>,
}

/// Graph builder: all graphs come from per-tick adjacency records.
pub struct GraphBuilder;

impl GraphBuilder {
    /// Build the neighbor graph of one (key, seed, tick) unit.
    ///
    /// Every record's cell becomes a node, including cells whose neighbor list
    /// only holds the "no neighbor" entry. Each real neighbor adds the undirected
    /// edge {cell, neighbor}; the same pair listed from both sides (or twice)
    /// yields one edge. Empty input gives an empty graph.
    pub fn from_records(records: &[AdjacencyRecord]) -> NeighborGraph {
        info!("Building neighbor graph from {} records", records.len());

        let mut nodes: BTreeSet<CellId> = BTreeSet::new();
        let mut edges: BTreeSet<(CellId, CellId)> = BTreeSet::new();

        for record in records {
            nodes.insert(record.cell_id);
            for neighbor in record.neighbor_cells() {
                if neighbor == record.cell_id {
                    trace!("Skipping self-loop on cell {}", neighbor);
                    continue;
                }
                nodes.insert(neighbor);
                let pair = if record.cell_id < neighbor {
                    (record.cell_id, neighbor)
                } else {
                    (neighbor, record.cell_id)
                };
                edges.insert(pair);
            }
        }

        let graph = NeighborGraph::from_parts(nodes.into_iter().collect(), &edges);
        debug!(
            "Neighbor graph: {} nodes, {} edges",
            graph.nnodes(),
            graph.nedges()
        );
        graph
    }

    /// Build a graph from explicit node ids and edges. Edge endpoints missing
    /// from `nodes` are added as nodes.
    pub fn from_edges(nodes: &[CellId], edges: &[(CellId, CellId)]) -> NeighborGraph {
        let mut node_set: BTreeSet<CellId> = nodes.iter().copied().collect();
        let mut edge_set: BTreeSet<(CellId, CellId)> = BTreeSet::new();
        for &(a, b) in edges {
            if a == b {
                continue;
            }
            node_set.insert(a);
            node_set.insert(b);
            edge_set.insert((a.min(b), a.max(b)));
        }
        NeighborGraph::from_parts(node_set.into_iter().collect(), &edge_set)
    }
}

impl NeighborGraph {
    fn from_parts(ids: Vec<CellId>, edges: &BTreeSet<(CellId, CellId)>) -> Self {
        let n = ids.len();
        let index: HashMap<CellId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut triplets = TriMat::new((n, n));
        for (a, b) in edges {
            let (i, j) = (index[a], index[b]);
            triplets.add_triplet(i, j, 1u8);
            triplets.add_triplet(j, i, 1u8);
        }
        let adjacency: CsMat<u8> = triplets.to_csr();

        trace!("Caching adjacency rows for {} nodes", n);
        let mut rows: Vec<Vec<usize>> = adjacency
            .outer_iterator()
            .map(|row| row.indices().to_vec())
            .collect();
        rows.resize(n, Vec::new());

        Self {
            ids,
            index,
            adjacency,
            rows,
        }
    }

    pub fn nnodes(&self) -> usize {
        self.ids.len()
    }

    pub fn nedges(&self) -> usize {
        self.adjacency.nnz() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Cell ids in node-index order.
    pub fn ids(&self) -> &[CellId] {
        &self.ids
    }

    pub fn id_of(&self, i: usize) -> CellId {
        assert!(
            i < self.nnodes(),
            "Node index {} out of bounds for {} nodes",
            i,
            self.nnodes()
        );
        self.ids[i]
    }

    pub fn index_of(&self, id: CellId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Node indices adjacent to node `i`, ascending.
    pub fn neighbors(&self, i: usize) -> &[usize] {
        assert!(
            i < self.nnodes(),
            "Node index {} out of bounds for {} nodes",
            i,
            self.nnodes()
        );
        &self.rows[i]
    }

    pub fn degree(&self, i: usize) -> usize {
        self.neighbors(i).len()
    }

    pub fn has_edge(&self, a: CellId, b: CellId) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.adjacency.get(i, j).is_some(),
            _ => false,
        }
    }

    /// Edges as (smaller id, larger id) pairs in ascending order.
    pub fn edges(&self) -> Vec<(CellId, CellId)> {
        let mut edges = Vec::with_capacity(self.nedges());
        for (i, row) in self.rows.iter().enumerate() {
            for &j in row {
                if i < j {
                    edges.push((self.ids[i], self.ids[j]));
                }
            }
        }
        edges
    }

    /// The symmetric sparse adjacency matrix.
    pub fn adjacency(&self) -> &CsMat<u8> {
        &self.adjacency
    }

    /// Subgraph induced by the given node indices (re-indexed).
    pub fn subgraph(&self, nodes: &[usize]) -> NeighborGraph {
        let keep: BTreeSet<usize> = nodes.iter().copied().collect();
        let ids: Vec<CellId> = keep.iter().map(|&i| self.ids[i]).collect();
        let mut edges = BTreeSet::new();
        for &i in &keep {
            for &j in &self.rows[i] {
                if i < j && keep.contains(&j) {
                    edges.insert((self.ids[i], self.ids[j]));
                }
            }
        }
        NeighborGraph::from_parts(ids, &edges)
    }
}

impl fmt::Display for NeighborGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "NeighborGraph ({} nodes, {} edges):",
            self.nnodes(),
            self.nedges()
        )?;
        if self.nnodes() <= 20 {
            for (i, id) in self.ids.iter().enumerate() {
                let adj: Vec<CellId> = self.rows[i].iter().map(|&j| self.ids[j]).collect();
                writeln!(f, "  {} -> {:?}", id, adj)?;
            }
        } else {
            let max_degree = self.rows.iter().map(|r| r.len()).max().unwrap_or(0);
            writeln!(f, "  Graph too large to display, max degree {}", max_degree)?;
        }
        Ok(())
    }
}
