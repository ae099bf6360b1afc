//! Point-pattern descriptors on raw coordinates.
//!
//! This module provides:
//! - `nearest_neighbor_distances`: distance from every point to its closest other point
//! - `hopkins`: clustering tendency of a point sample, in [0, 1]
//! - `tortuosity`: path length over end-to-end distance for a 2-D trajectory
//! - Helpers shared with the clustering module (row validation, pairwise distances)
//!
//! Random sampling never touches global state: `hopkins` takes the generator as an
//! argument so repeated or parallel calls stay reproducible.

use log::{debug, info, trace, warn};
use rand::seq::index::sample;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use rayon::prelude::*;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::errors::{AnalysisError, Result};

pub fn euclidean_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Validate that all rows share one non-zero dimension and pack them row-major.
pub fn points_matrix(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    let n = rows.len();
    if n == 0 {
        return Err(AnalysisError::InsufficientPoints {
            required: 1,
            actual: 0,
        });
    }
    let d = rows[0].len();
    if d == 0 {
        return Err(AnalysisError::shape("points must have at least one coordinate"));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != d) {
        return Err(AnalysisError::shape(format!(
            "row {} has {} coordinates, expected {}",
            i,
            row.len(),
            d
        )));
    }
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AnalysisError::shape("coordinates must be finite"));
    }
    Ok(DenseMatrix::from_iterator(
        rows.iter().flatten().copied(),
        n,
        d,
        0,
    ))
}

/// Row `i` of a coordinate matrix.
pub fn row(points: &DenseMatrix<f64>, i: usize) -> Vec<f64> {
    let (_, d) = points.shape();
    (0..d).map(|j| *points.get((i, j))).collect()
}

/// Full N×N Euclidean distance matrix between the rows of `x` and `y`.
pub fn cdist(x: &DenseMatrix<f64>, y: &DenseMatrix<f64>) -> DenseMatrix<f64> {
    let (nx, dx) = x.shape();
    let (ny, dy) = y.shape();
    assert_eq!(dx, dy, "point sets must share dimensionality: {} vs {}", dx, dy);

    trace!("Computing {}×{} distance matrix", nx, ny);
    let y_rows: Vec<Vec<f64>> = (0..ny).map(|j| row(y, j)).collect();
    let values: Vec<f64> = (0..nx)
        .into_par_iter()
        .flat_map_iter(|i| {
            let xi = row(x, i);
            y_rows
                .iter()
                .map(|yj| euclidean_dist(&xi, yj))
                .collect::<Vec<f64>>()
        })
        .collect();

    DenseMatrix::from_iterator(values.into_iter(), nx, ny, 0)
}

/// For every point, the distance to its nearest other point.
///
/// The diagonal of the pairwise distance matrix is masked, so a point is never
/// compared with itself. Requires at least two points.
pub fn nearest_neighbor_distances(rows: &[Vec<f64>]) -> Result<Vec<f64>> {
    if rows.len() < 2 {
        return Err(AnalysisError::InsufficientPoints {
            required: 2,
            actual: rows.len(),
        });
    }
    let points = points_matrix(rows)?;
    let n = rows.len();
    info!("Computing nearest-neighbor distances for {} points", n);

    let grid = cdist(&points, &points);
    let distances: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .filter(|&j| j != i)
                .map(|j| *grid.get((i, j)))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();

    debug!(
        "Nearest-neighbor distances: min={:.4}, max={:.4}",
        distances.iter().copied().fold(f64::INFINITY, f64::min),
        distances.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    );
    Ok(distances)
}

/// Per-column min-max scaling to [0, 1]; zero-range columns map to 0.
pub fn min_max_normalise(points: &DenseMatrix<f64>) -> DenseMatrix<f64> {
    let (n, d) = points.shape();
    let mut mins = vec![f64::INFINITY; d];
    let mut maxs = vec![f64::NEG_INFINITY; d];
    for i in 0..n {
        for j in 0..d {
            let v = *points.get((i, j));
            mins[j] = mins[j].min(v);
            maxs[j] = maxs[j].max(v);
        }
    }

    let mut values = Vec::with_capacity(n * d);
    for i in 0..n {
        for j in 0..d {
            let range = maxs[j] - mins[j];
            let v = *points.get((i, j));
            values.push(if range > 0.0 { (v - mins[j]) / range } else { 0.0 });
        }
    }
    DenseMatrix::from_iterator(values.into_iter(), n, d, 0)
}

/// Hopkins statistic of a D-dimensional point sample.
///
/// Coordinates are min-max normalised. `subsample` uniform points drawn in the
/// unit hypercube contribute the sum `u` of their nearest real-point distances;
/// `subsample` real points drawn without replacement contribute the sum `w` of
/// their nearest-neighbor distances, where zero distances (the point itself, or
/// exact duplicates) are replaced by the largest distance of that block. Returns
/// `u / (u + w)`: near 1 for clustered samples, near 0.5 for uniform ones.
///
/// A single call is a random estimate; bootstrap it by calling repeatedly with
/// the same generator.
pub fn hopkins<R: Rng + ?Sized>(rows: &[Vec<f64>], subsample: usize, rng: &mut R) -> Result<f64> {
    let n = rows.len();
    if subsample == 0 || subsample >= n {
        return Err(AnalysisError::parameter(
            "subsample",
            format!("must satisfy 1 <= subsample < {} (got {})", n, subsample),
        ));
    }
    let points = points_matrix(rows)?;
    let (_, dims) = points.shape();
    info!(
        "Computing Hopkins statistic: N={}, D={}, subsample={}",
        n, dims, subsample
    );

    let x = min_max_normalise(&points);

    let unit = Uniform::new(0.0, 1.0)
        .map_err(|e| AnalysisError::parameter("uniform", e.to_string()))?;
    let uniform_values: Vec<f64> = (0..subsample * dims).map(|_| unit.sample(rng)).collect();
    let y = DenseMatrix::from_iterator(uniform_values.into_iter(), subsample, dims, 0);

    let random_grid = cdist(&y, &x);
    let random_sum: f64 = (0..subsample)
        .map(|i| {
            (0..n)
                .map(|j| *random_grid.get((i, j)))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();

    let picked = sample(rng, n, subsample).into_vec();
    let picked_rows: Vec<Vec<f64>> = picked.iter().map(|&i| row(&x, i)).collect();
    let x_sample = points_matrix(&picked_rows)?;
    let real_grid = cdist(&x_sample, &x);

    let mut block_max = 0.0_f64;
    for i in 0..subsample {
        for j in 0..n {
            block_max = block_max.max(*real_grid.get((i, j)));
        }
    }
    let real_sum: f64 = (0..subsample)
        .map(|i| {
            (0..n)
                .map(|j| {
                    let dist = *real_grid.get((i, j));
                    if dist == 0.0 {
                        block_max
                    } else {
                        dist
                    }
                })
                .fold(f64::INFINITY, f64::min)
        })
        .sum();

    debug!(
        "Hopkins sums: random={:.6}, real={:.6}",
        random_sum, real_sum
    );

    let total = random_sum + real_sum;
    if total <= 0.0 {
        warn!("Hopkins sums are both zero; returning 0.5");
        return Ok(0.5);
    }
    Ok(random_sum / total)
}

/// Tortuosity of a 2-D path: summed step lengths over end-to-end distance.
///
/// Every row must hold exactly two coordinates and at least two points are
/// needed. Collinear monotone paths give exactly 1.0, detours give more.
pub fn tortuosity(path: &[Vec<f64>]) -> Result<f64> {
    if let Some((i, r)) = path.iter().enumerate().find(|(_, r)| r.len() != 2) {
        return Err(AnalysisError::shape(format!(
            "trace needs to be shape (n, 2): row {} has {} coordinates",
            i,
            r.len()
        )));
    }
    if path.len() < 2 {
        return Err(AnalysisError::InsufficientPoints {
            required: 2,
            actual: path.len(),
        });
    }

    let along: f64 = path.windows(2).map(|w| euclidean_dist(&w[0], &w[1])).sum();
    let end_to_end = euclidean_dist(&path[0], &path[path.len() - 1]);
    trace!("Tortuosity: along={:.6}, end_to_end={:.6}", along, end_to_end);

    if end_to_end == 0.0 {
        return Err(AnalysisError::DegeneratePath);
    }
    Ok(along / end_to_end)
}
