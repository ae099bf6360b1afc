//! Spatial clustering of cell centroids, independent of the neighbor graph.
//!
//! Two strategies are available behind the [`LabelAssigner`] trait:
//! - density-based (DBSCAN): points with too few neighbors within `eps` become noise
//! - single-link agglomerative: points closer than a threshold are merged until
//!   nothing else merges; every point ends up in some cluster
//!
//! The strategies disagree on what an isolated point is (a noise label versus a
//! size-one cluster). [`ClusterCounts`] treats both the same way so results from
//! either strategy can be compared directly.

use std::collections::{BTreeMap, VecDeque};

use log::{debug, info, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::errors::{AnalysisError, Result};
use crate::spatial::{cdist, points_matrix};

pub use crate::spatial::euclidean_dist;

/// Clustering strategy and its parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ClusteringStrategy {
    /// DBSCAN with neighborhood radius `eps`; a point is core when at least
    /// `min_samples` points (itself included) lie within `eps`.
    Density { eps: f64, min_samples: usize },
    /// Single-link agglomeration merging points closer than `distance_threshold`.
    SingleLink { distance_threshold: f64 },
}

impl Default for ClusteringStrategy {
    fn default() -> Self {
        ClusteringStrategy::SingleLink {
            distance_threshold: 90.0,
        }
    }
}

// Custom PartialEq implementation using approximate equality for floats
impl PartialEq for ClusteringStrategy {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                ClusteringStrategy::Density { eps: a, min_samples: ma },
                ClusteringStrategy::Density { eps: b, min_samples: mb },
            ) => ma == mb && approx::relative_eq!(*a, *b),
            (
                ClusteringStrategy::SingleLink { distance_threshold: a },
                ClusteringStrategy::SingleLink { distance_threshold: b },
            ) => approx::relative_eq!(*a, *b),
            _ => false,
        }
    }
}

impl ClusteringStrategy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            ClusteringStrategy::Density { eps, min_samples } => {
                if !(eps.is_finite() && eps > 0.0) {
                    return Err(AnalysisError::parameter("eps", format!("must be > 0, got {}", eps)));
                }
                if min_samples == 0 {
                    return Err(AnalysisError::parameter("min_samples", "must be >= 1"));
                }
            }
            ClusteringStrategy::SingleLink { distance_threshold } => {
                if !(distance_threshold.is_finite() && distance_threshold > 0.0) {
                    return Err(AnalysisError::parameter(
                        "distance_threshold",
                        format!("must be > 0, got {}", distance_threshold),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Per-point cluster labels; `None` marks noise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labelling {
    pub labels: Vec<Option<usize>>,
    /// Whether the producing strategy uses the noise label at all
    pub emits_noise: bool,
}

impl Labelling {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Point indices grouped by label, ascending label order.
    pub fn groups(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, label) in self.labels.iter().enumerate() {
            if let Some(l) = label {
                groups.entry(*l).or_default().push(i);
            }
        }
        groups
    }

    pub fn noise_points(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }
}

/// Common capability of all spatial clustering strategies.
pub trait LabelAssigner {
    /// Assign a label to every row of `points`.
    fn assign_labels(&self, points: &DenseMatrix<f64>) -> Result<Labelling>;

    /// Convenience entry for row-vector input.
    fn assign_rows(&self, rows: &[Vec<f64>]) -> Result<Labelling> {
        if rows.is_empty() {
            return Ok(Labelling {
                labels: Vec::new(),
                emits_noise: self.emits_noise(),
            });
        }
        let points = points_matrix(rows)?;
        self.assign_labels(&points)
    }

    fn emits_noise(&self) -> bool;
}

impl LabelAssigner for ClusteringStrategy {
    fn assign_labels(&self, points: &DenseMatrix<f64>) -> Result<Labelling> {
        self.validate()?;
        match *self {
            ClusteringStrategy::Density { eps, min_samples } => {
                Ok(dbscan(points, eps, min_samples))
            }
            ClusteringStrategy::SingleLink { distance_threshold } => {
                Ok(single_link(points, distance_threshold))
            }
        }
    }

    fn emits_noise(&self) -> bool {
        matches!(self, ClusteringStrategy::Density { .. })
    }
}

/// Indices within `radius` of each point, self included. `strict` excludes
/// points at exactly `radius`.
fn radius_neighborhoods(grid: &DenseMatrix<f64>, radius: f64, strict: bool) -> Vec<Vec<usize>> {
    let (n, _) = grid.shape();
    (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .filter(|&j| {
                    let d = *grid.get((i, j));
                    if strict {
                        d < radius
                    } else {
                        d <= radius
                    }
                })
                .collect()
        })
        .collect()
}

/// Density-based clustering (DBSCAN).
///
/// Clusters are grown from core points through chains of core points within
/// `eps` of each other; non-core points within `eps` of a core point join the
/// first cluster that reaches them. Remaining points are noise.
pub fn dbscan(points: &DenseMatrix<f64>, eps: f64, min_samples: usize) -> Labelling {
    let (n, _) = points.shape();
    info!(
        "DBSCAN on {} points: eps={}, min_samples={}",
        n, eps, min_samples
    );

    let grid = cdist(points, points);
    let neighborhoods = radius_neighborhoods(&grid, eps, false);
    let core: Vec<bool> = neighborhoods.iter().map(|nb| nb.len() >= min_samples).collect();
    debug!(
        "{} of {} points are core points",
        core.iter().filter(|&&c| c).count(),
        n
    );

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut next_label = 0;
    for start in 0..n {
        if labels[start].is_some() || !core[start] {
            continue;
        }
        labels[start] = Some(next_label);
        let mut stack = vec![start];
        while let Some(p) = stack.pop() {
            if !core[p] {
                continue;
            }
            for &q in &neighborhoods[p] {
                if labels[q].is_none() {
                    labels[q] = Some(next_label);
                    stack.push(q);
                }
            }
        }
        trace!("Cluster {} grown from point {}", next_label, start);
        next_label += 1;
    }

    debug!("DBSCAN found {} labels", next_label);
    Labelling {
        labels,
        emits_noise: true,
    }
}

/// Single-link agglomerative clustering with a distance threshold.
///
/// Equivalent to the connected components of the graph joining every pair of
/// points strictly closer than `distance_threshold`. Labels are numbered in
/// order of each cluster's first point.
pub fn single_link(points: &DenseMatrix<f64>, distance_threshold: f64) -> Labelling {
    let (n, _) = points.shape();
    info!(
        "Single-link clustering on {} points: threshold={}",
        n, distance_threshold
    );

    let grid = cdist(points, points);
    let links = radius_neighborhoods(&grid, distance_threshold, true);

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut next_label = 0;
    for start in 0..n {
        if labels[start].is_some() {
            continue;
        }
        labels[start] = Some(next_label);
        let mut queue = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            for &q in &links[p] {
                if labels[q].is_none() {
                    labels[q] = Some(next_label);
                    queue.push_back(q);
                }
            }
        }
        next_label += 1;
    }

    debug!("Single-link found {} clusters (singles included)", next_label);
    Labelling {
        labels,
        emits_noise: false,
    }
}

/// Strategy-agnostic cluster counts.
///
/// A cluster is a label group with at least two points. Noise points and
/// points alone in their group are both counted in `num_noise`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCounts {
    pub num_clusters: usize,
    pub num_noise: usize,
    pub sizes: Vec<usize>,
    pub fractions: Vec<f64>,
    pub total: usize,
}

impl ClusterCounts {
    pub fn from_labelling(labelling: &Labelling) -> Self {
        let total = labelling.len();
        let groups = labelling.groups();

        let sizes: Vec<usize> = groups
            .values()
            .map(|g| g.len())
            .filter(|&s| s >= 2)
            .collect();
        let singles = groups.values().filter(|g| g.len() == 1).count();
        let num_noise = labelling.noise_points() + singles;
        let fractions = sizes
            .iter()
            .map(|&s| s as f64 / total as f64)
            .collect();

        Self {
            num_clusters: sizes.len(),
            num_noise,
            sizes,
            fractions,
            total,
        }
    }

    /// Fraction of all points that sit in a cluster of two or more.
    pub fn clustered_fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.sizes.iter().sum::<usize>() as f64 / self.total as f64
    }
}

/// Label the rows and count clusters in one step.
pub fn cluster_points(rows: &[Vec<f64>], strategy: &ClusteringStrategy) -> Result<ClusterCounts> {
    let labelling = strategy.assign_rows(rows)?;
    Ok(ClusterCounts::from_labelling(&labelling))
}
