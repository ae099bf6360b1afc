//! Graph-theoretic descriptors of a neighbor graph.
//!
//! Degree and centrality measures are taken over the whole graph, disconnected or
//! not: unreachable pairs simply do not contribute. Closeness uses the
//! Wasserman–Faust scaling so nodes in small components are not over-rated, and
//! betweenness is Brandes' algorithm normalised by `1 / ((n - 1)(n - 2))`.
//!
//! Radius, diameter, eccentricity and mean shortest-path length only make sense
//! on a connected graph. They are computed on the multi-cell components (singles
//! excluded) and combined according to a [`DistancePolicy`]. A graph without any
//! multi-cell component has no distance metrics (`None`), which is not an error.

use std::collections::VecDeque;

use log::{debug, info, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{connected_components, Component};
use crate::graph::NeighborGraph;
use crate::records::CellId;
use crate::summary::mean_std;

/// How distance metrics are combined when several multi-cell components exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistancePolicy {
    /// Only the largest multi-cell component; ties go to the component holding
    /// the smallest cell id.
    LargestComponent,
    /// Per-component metrics averaged with component size as the weight.
    #[default]
    SizeWeightedMean,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceMetrics {
    pub radius: f64,
    pub diameter: f64,
    /// Mean node eccentricity
    pub eccentricity: f64,
    /// Mean shortest-path length over ordered node pairs
    pub shortest_path: f64,
}

/// Summary measures of one graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Node degrees, largest first
    pub degrees: Vec<usize>,
    pub degree_mean: Option<f64>,
    pub degree_std: Option<f64>,
    pub degree_centrality_mean: f64,
    pub closeness_centrality_mean: f64,
    pub betweenness_centrality_mean: f64,
    pub distances: Option<DistanceMetrics>,
}

/// Per-node measures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeMeasures {
    pub id: CellId,
    pub degree: usize,
    pub degree_centrality: f64,
    pub closeness_centrality: f64,
    pub betweenness_centrality: f64,
    /// Eccentricity inside the node's component; `None` for singles
    pub eccentricity: Option<usize>,
}

// Distance summary of a single BFS source.
#[derive(Debug, Clone)]
struct SourcePass {
    reachable: usize,
    distance_sum: usize,
    eccentricity: usize,
}

// All BFS sources: per-source distance summaries plus the Brandes dependencies
// summed over sources (not yet normalised).
#[derive(Debug, Clone)]
struct Traversals {
    passes: Vec<SourcePass>,
    betweenness: Vec<f64>,
}

/// Graph metrics calculator with a fixed disconnected-graph policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetricsCalculator {
    pub policy: DistancePolicy,
}

impl GraphMetricsCalculator {
    pub fn new(policy: DistancePolicy) -> Self {
        Self { policy }
    }

    /// Compute the summary measures of `graph`.
    pub fn compute(&self, graph: &NeighborGraph) -> GraphMetrics {
        let n = graph.nnodes();
        info!(
            "Computing graph metrics for {} nodes, {} edges ({:?})",
            n,
            graph.nedges(),
            self.policy
        );

        let traversals = traverse(graph);
        let nodes = node_measures_from(graph, &traversals);

        let mut degrees: Vec<usize> = nodes.iter().map(|m| m.degree).collect();
        degrees.sort_unstable_by(|a, b| b.cmp(a));
        let degree_values: Vec<f64> = degrees.iter().map(|&d| d as f64).collect();
        let (degree_mean, degree_std) = match mean_std(&degree_values) {
            Some((m, s)) => (Some(m), s),
            None => (None, None),
        };

        let components = connected_components(graph);
        let distances = self.distance_metrics(&components, &traversals.passes);

        let metrics = GraphMetrics {
            degrees,
            degree_mean,
            degree_std,
            degree_centrality_mean: mean_or_zero(nodes.iter().map(|m| m.degree_centrality)),
            closeness_centrality_mean: mean_or_zero(nodes.iter().map(|m| m.closeness_centrality)),
            betweenness_centrality_mean: mean_or_zero(
                nodes.iter().map(|m| m.betweenness_centrality),
            ),
            distances,
        };
        debug!("Graph metrics: {:?}", metrics);
        metrics
    }

    /// Measures of every node, in node-index order.
    pub fn node_measures(&self, graph: &NeighborGraph) -> Vec<NodeMeasures> {
        node_measures_from(graph, &traverse(graph))
    }

    fn distance_metrics(
        &self,
        components: &[Component],
        passes: &[SourcePass],
    ) -> Option<DistanceMetrics> {
        let multi: Vec<&Component> = components.iter().filter(|c| c.len() > 1).collect();
        if multi.is_empty() {
            debug!("No multi-cell component; distance metrics undefined");
            return None;
        }

        match self.policy {
            DistancePolicy::LargestComponent => {
                // components are ordered by smallest node, so the first maximum wins ties
                let mut largest = multi[0];
                for c in &multi[1..] {
                    if c.len() > largest.len() {
                        largest = c;
                    }
                }
                trace!("Largest component has {} cells", largest.len());
                Some(component_distances(largest, passes))
            }
            DistancePolicy::SizeWeightedMean => {
                // sum size * metric and divide once so integral values stay exact
                let total: f64 = multi.iter().map(|c| c.len() as f64).sum();
                let mut acc = DistanceMetrics {
                    radius: 0.0,
                    diameter: 0.0,
                    eccentricity: 0.0,
                    shortest_path: 0.0,
                };
                for c in &multi {
                    let size = c.len() as f64;
                    let m = component_distances(c, passes);
                    acc.radius += size * m.radius;
                    acc.diameter += size * m.diameter;
                    acc.eccentricity += size * m.eccentricity;
                    acc.shortest_path += size * m.shortest_path;
                }
                Some(DistanceMetrics {
                    radius: acc.radius / total,
                    diameter: acc.diameter / total,
                    eccentricity: acc.eccentricity / total,
                    shortest_path: acc.shortest_path / total,
                })
            }
        }
    }
}

fn mean_or_zero(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Distance metrics of one connected component.
fn component_distances(component: &Component, passes: &[SourcePass]) -> DistanceMetrics {
    let k = component.len();
    let eccs: Vec<usize> = component.nodes.iter().map(|&i| passes[i].eccentricity).collect();
    let radius = eccs.iter().copied().min().unwrap_or(0);
    let diameter = eccs.iter().copied().max().unwrap_or(0);
    let eccentricity = eccs.iter().sum::<usize>() as f64 / k as f64;
    let pair_sum: usize = component.nodes.iter().map(|&i| passes[i].distance_sum).sum();
    let shortest_path = if k > 1 {
        pair_sum as f64 / (k * (k - 1)) as f64
    } else {
        0.0
    };

    DistanceMetrics {
        radius: radius as f64,
        diameter: diameter as f64,
        eccentricity,
        shortest_path,
    }
}

/// One BFS per source node (in parallel), recording distance sums and
/// eccentricities. Brandes dependencies are folded into one accumulator per
/// worker and then summed, so only O(n) betweenness storage is live per thread.
fn traverse(graph: &NeighborGraph) -> Traversals {
    let n = graph.nnodes();
    trace!("Running {} BFS passes", n);
    let (mut passes, betweenness) = (0..n)
        .into_par_iter()
        .fold(
            || (Vec::new(), vec![0.0_f64; n]),
            |(mut passes, mut acc), s| {
                let (pass, dependency) = brandes_pass(graph, s);
                for (b, d) in acc.iter_mut().zip(&dependency) {
                    *b += d;
                }
                passes.push((s, pass));
                (passes, acc)
            },
        )
        .reduce(
            || (Vec::new(), vec![0.0_f64; n]),
            |(mut passes_a, mut acc_a), (passes_b, acc_b)| {
                passes_a.extend(passes_b);
                for (a, b) in acc_a.iter_mut().zip(&acc_b) {
                    *a += b;
                }
                (passes_a, acc_a)
            },
        );
    passes.sort_unstable_by_key(|(s, _)| *s);

    Traversals {
        passes: passes.into_iter().map(|(_, pass)| pass).collect(),
        betweenness,
    }
}

fn brandes_pass(graph: &NeighborGraph, source: usize) -> (SourcePass, Vec<f64>) {
    let n = graph.nnodes();
    let mut dist: Vec<Option<usize>> = vec![None; n];
    let mut sigma = vec![0.0_f64; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);

    dist[source] = Some(0);
    sigma[source] = 1.0;
    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        order.push(v);
        let dv = dist[v].unwrap_or(0);
        for &w in graph.neighbors(v) {
            match dist[w] {
                None => {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
                Some(dw) if dw == dv + 1 => {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
                _ => {}
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    for &w in order.iter().rev() {
        for &v in &preds[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
    }
    delta[source] = 0.0;

    let reached: Vec<usize> = dist.iter().flatten().copied().collect();
    let pass = SourcePass {
        reachable: reached.len(),
        distance_sum: reached.iter().sum(),
        eccentricity: reached.iter().copied().max().unwrap_or(0),
    };
    (pass, delta)
}

fn node_measures_from(graph: &NeighborGraph, traversals: &Traversals) -> Vec<NodeMeasures> {
    let n = graph.nnodes();
    if n == 0 {
        return Vec::new();
    }

    let passes = &traversals.passes;
    let mut betweenness = traversals.betweenness.clone();
    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for b in &mut betweenness {
            *b *= scale;
        }
    }

    (0..n)
        .map(|i| {
            let degree = graph.degree(i);
            let degree_centrality = if n > 1 {
                degree as f64 / (n - 1) as f64
            } else {
                1.0
            };

            let pass = &passes[i];
            let closeness_centrality = if pass.distance_sum > 0 && n > 1 {
                let r = (pass.reachable - 1) as f64;
                (r / pass.distance_sum as f64) * (r / (n - 1) as f64)
            } else {
                0.0
            };

            NodeMeasures {
                id: graph.id_of(i),
                degree,
                degree_centrality,
                closeness_centrality,
                betweenness_centrality: betweenness[i],
                eccentricity: if degree > 0 { Some(pass.eccentricity) } else { None },
            }
        })
        .collect()
}
