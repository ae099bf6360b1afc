//! Reductions over per-unit results.
//!
//! Everything here is order independent: inputs are grouped through ordered
//! maps before any mean or deviation is taken, so the output does not depend on
//! the order in which units finished.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{AnalysisError, Result};
use crate::ks::KsStatisticRow;
use crate::records::{Seed, Tick};

/// Mean and sample standard deviation (ddof = 1).
///
/// `None` for an empty slice; the deviation is `None` below two values.
pub fn mean_std(values: &[f64]) -> Option<(f64, Option<f64>)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    } else {
        None
    };
    Some((mean, std))
}

/// Statistics of one tick across replicates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemporalPoint {
    pub tick: Tick,
    pub replicates: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Per-tick mean/std/min/max across seeds.
///
/// Values are first averaged per (seed, tick) so that a replicate contributing
/// many rows (one per cell, say) still counts once. Non-finite values are
/// ignored.
pub fn temporal_summary(values: &[(Seed, Tick, f64)]) -> Vec<TemporalPoint> {
    let mut per_replicate: BTreeMap<(Tick, Seed), (f64, usize)> = BTreeMap::new();
    for &(seed, tick, v) in values {
        if !v.is_finite() {
            continue;
        }
        let entry = per_replicate.entry((tick, seed)).or_insert((0.0, 0));
        entry.0 += v;
        entry.1 += 1;
    }

    let mut per_tick: BTreeMap<Tick, Vec<f64>> = BTreeMap::new();
    for ((tick, _), (sum, count)) in per_replicate {
        per_tick.entry(tick).or_default().push(sum / count as f64);
    }

    per_tick
        .into_iter()
        .filter_map(|(tick, seeds)| {
            let (mean, std) = mean_std(&seeds)?;
            Some(TemporalPoint {
                tick,
                replicates: seeds.len(),
                mean,
                std,
                min: seeds.iter().copied().fold(f64::INFINITY, f64::min),
                max: seeds.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
        })
        .collect()
}

/// One histogram bin of a feature distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataBin {
    /// Count of values in the bin
    pub n: usize,
    /// Lower edge
    pub x: f64,
    /// Density: count / (total values × bandwidth)
    pub y: f64,
    /// Midpoint
    pub m: f64,
}

/// Log a warning for values outside the expected bounds.
pub fn check_data_bounds(values: &[f64], bounds: (f64, f64), description: &str) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    if max > bounds.1 {
        warn!(
            "{} max [ {} ] greater than upper bound [ {} ]",
            description, max, bounds.1
        );
    }
    if min < bounds.0 {
        warn!(
            "{} min [ {} ] less than lower bound [ {} ]",
            description, min, bounds.0
        );
    }
}

/// Histogram of `values` with bins of width close to `bandwidth`.
///
/// The range is padded by one and a half bandwidths on each side so values at
/// the bounds fall in interior bins. Bins are half-open except the last.
pub fn calculate_data_bins(values: &[f64], bounds: (f64, f64), bandwidth: f64) -> Result<Vec<DataBin>> {
    if !(bandwidth.is_finite() && bandwidth > 0.0) {
        return Err(AnalysisError::parameter("bandwidth", format!("must be > 0, got {}", bandwidth)));
    }
    if !(bounds.1 > bounds.0) {
        return Err(AnalysisError::parameter(
            "bounds",
            format!("upper bound {} must exceed lower bound {}", bounds.1, bounds.0),
        ));
    }
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let total = values.len() as f64 * bandwidth;
    let num_bins = ((bounds.1 - bounds.0) / bandwidth) as usize;
    let lower = bounds.0 - 3.0 * bandwidth / 2.0;
    let upper = bounds.1 + 3.0 * bandwidth / 2.0;

    let num_edges = num_bins + 4;
    let step = (upper - lower) / (num_edges - 1) as f64;
    let edges: Vec<f64> = (0..num_edges).map(|i| lower + step * i as f64).collect();

    let nbins = num_edges - 1;
    let mut counts = vec![0usize; nbins];
    for &v in values {
        if !(v >= lower && v <= upper) {
            continue;
        }
        let mut idx = ((v - lower) / step) as usize;
        if idx >= nbins {
            idx = nbins - 1;
        }
        // correct for rounding at the edges
        while idx > 0 && v < edges[idx] {
            idx -= 1;
        }
        while idx + 1 < nbins && v >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, n)| DataBin {
            n,
            x: edges[i],
            y: n as f64 / total,
            m: (edges[i] + edges[i + 1]) / 2.0,
        })
        .collect())
}

/// Distribution summary of one feature for one condition key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureDistribution {
    pub mean: f64,
    pub std: Option<f64>,
    pub bins: Vec<DataBin>,
}

pub fn feature_distribution(
    values: &[f64],
    bounds: (f64, f64),
    bandwidth: f64,
    description: &str,
) -> Result<Option<FeatureDistribution>> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    check_data_bounds(&finite, bounds, description);
    let bins = calculate_data_bins(&finite, bounds, bandwidth)?;
    Ok(mean_std(&finite).map(|(mean, std)| FeatureDistribution { mean, std, bins }))
}

/// Aggregate of KS rows for one (key, feature).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KsSummary {
    pub key: String,
    pub feature: String,
    /// Total simulated values over all rows
    pub size: usize,
    pub replicates: usize,
    pub mean: f64,
    pub std: Option<f64>,
}

/// Mean/std of the KS statistic per (key, feature) over the given rows.
///
/// Callers choose which rows to pass (per-sample rows, per-tick rows, …).
pub fn summarize_ks<'a, I>(rows: I) -> Vec<KsSummary>
where
    I: IntoIterator<Item = &'a KsStatisticRow>,
{
    let mut groups: BTreeMap<(String, String), (Vec<f64>, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups
            .entry((row.key.clone(), row.feature.clone()))
            .or_insert_with(|| (Vec::new(), 0));
        entry.0.push(row.ks_statistic);
        entry.1 += row.size;
    }
    debug!("Summarizing KS rows into {} groups", groups.len());

    groups
        .into_iter()
        .filter_map(|((key, feature), (stats, size))| {
            let (mean, std) = mean_std(&stats)?;
            Some(KsSummary {
                key,
                feature,
                size,
                replicates: stats.len(),
                mean,
                std,
            })
        })
        .collect()
}
