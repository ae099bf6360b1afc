//! Connected-component decomposition of a neighbor graph into singles and
//! clusters, plus the cluster geometry descriptors computed from cell centroids.

use std::collections::{HashMap, VecDeque};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::clustering::euclidean_dist;
use crate::graph::NeighborGraph;
use crate::records::{AdjacencyRecord, CellId};
use crate::summary::mean_std;

/// A connected component: node indices into the source graph and their cell ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub nodes: Vec<usize>,
    pub ids: Vec<CellId>,
}

impl Component {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.nodes.len() == 1
    }
}

/// Connected components ordered by their smallest node index.
pub fn connected_components(graph: &NeighborGraph) -> Vec<Component> {
    let n = graph.nnodes();
    let mut seen = vec![false; n];
    let mut components = Vec::new();

    for start in 0..n {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut queue = VecDeque::from([start]);
        let mut nodes = Vec::new();
        while let Some(u) = queue.pop_front() {
            nodes.push(u);
            for &v in graph.neighbors(u) {
                if !seen[v] {
                    seen[v] = true;
                    queue.push_back(v);
                }
            }
        }
        nodes.sort_unstable();
        let ids = nodes.iter().map(|&i| graph.id_of(i)).collect();
        components.push(Component { nodes, ids });
    }
    components
}

/// Singles/clusters partition of one graph.
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    pub components: Vec<Component>,
    pub nnodes: usize,
}

/// Mean and sample standard deviation of a set of distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceStats {
    pub mean: f64,
    pub std: Option<f64>,
}

impl ClusterSummary {
    pub fn decompose(graph: &NeighborGraph) -> Self {
        info!("Decomposing graph with {} nodes into components", graph.nnodes());
        let components = connected_components(graph);
        let summary = Self {
            components,
            nnodes: graph.nnodes(),
        };
        debug!(
            "Found {} singles and {} clusters",
            summary.num_singles(),
            summary.num_clusters()
        );
        summary
    }

    pub fn num_singles(&self) -> usize {
        self.components.iter().filter(|c| c.is_single()).count()
    }

    pub fn num_clusters(&self) -> usize {
        self.components.iter().filter(|c| !c.is_single()).count()
    }

    /// Components with more than one cell.
    pub fn clusters(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| !c.is_single())
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.clusters().map(|c| c.len()).collect()
    }

    pub fn clustered_cells(&self) -> usize {
        self.cluster_sizes().iter().sum()
    }

    /// Fraction of cells belonging to a multi-cell cluster; 0 for an empty graph.
    pub fn cluster_fraction(&self) -> f64 {
        if self.nnodes == 0 {
            return 0.0;
        }
        self.clustered_cells() as f64 / self.nnodes as f64
    }

    /// Mean and sample std of the cluster sizes (`None` without clusters).
    pub fn cluster_size_stats(&self) -> Option<(f64, Option<f64>)> {
        let sizes: Vec<f64> = self.cluster_sizes().iter().map(|&s| s as f64).collect();
        mean_std(&sizes)
    }

    /// Distances between the centroids of multi-cell clusters.
    ///
    /// Each cluster centroid is the average of its cells' centroids. Needs at
    /// least two clusters.
    pub fn inter_cluster_distances(
        &self,
        centroids: &HashMap<CellId, Vec<f64>>,
    ) -> Option<DistanceStats> {
        let cluster_centroids: Vec<Vec<f64>> = self
            .clusters()
            .filter_map(|c| average_centroid(&c.ids, centroids))
            .collect();

        if cluster_centroids.len() < 2 {
            return None;
        }

        let distances = ordered_pair_distances(&cluster_centroids);
        mean_std(&distances).map(|(mean, std)| DistanceStats { mean, std })
    }

    /// Per-cluster mean/std of the pairwise distances between member centroids.
    pub fn intra_cluster_distances(
        &self,
        centroids: &HashMap<CellId, Vec<f64>>,
    ) -> Vec<DistanceStats> {
        self.clusters()
            .filter_map(|c| {
                let points: Vec<Vec<f64>> = c
                    .ids
                    .iter()
                    .filter_map(|id| centroids.get(id).cloned())
                    .collect();
                if points.len() < 2 {
                    return None;
                }
                let distances = ordered_pair_distances(&points);
                mean_std(&distances).map(|(mean, std)| DistanceStats { mean, std })
            })
            .collect()
    }
}

/// Cell id → centroid lookup built from a unit's records.
pub fn centroid_map(records: &[AdjacencyRecord]) -> HashMap<CellId, Vec<f64>> {
    records.iter().map(|r| (r.cell_id, r.centroid())).collect()
}

fn average_centroid(ids: &[CellId], centroids: &HashMap<CellId, Vec<f64>>) -> Option<Vec<f64>> {
    let points: Vec<&Vec<f64>> = ids.iter().filter_map(|id| centroids.get(id)).collect();
    if points.len() != ids.len() {
        warn!(
            "{} of {} cluster cells have no centroid; skipping cluster",
            ids.len() - points.len(),
            ids.len()
        );
        return None;
    }
    let dims = points.first()?.len();
    let mut avg = vec![0.0; dims];
    for p in &points {
        for (a, v) in avg.iter_mut().zip(p.iter()) {
            *a += v;
        }
    }
    for a in &mut avg {
        *a /= points.len() as f64;
    }
    Some(avg)
}

// off-diagonal entries of the full distance matrix, i.e. every ordered pair
fn ordered_pair_distances(points: &[Vec<f64>]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len() * points.len().saturating_sub(1));
    for (i, a) in points.iter().enumerate() {
        for (j, b) in points.iter().enumerate() {
            if i != j {
                distances.push(euclidean_dist(a, b));
            }
        }
    }
    distances
}
