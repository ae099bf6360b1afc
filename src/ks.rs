//! Two-sample Kolmogorov–Smirnov comparison of simulated feature values
//! against a reference population.
//!
//! `ks_statistic` is the pairwise statistic. `DistributionComparator` turns a
//! feature table into KS rows: one overall comparison per feature, one per tick,
//! and optionally one per random subsample. Averaging those rows is left to the
//! caller (see `summary::summarize_ks`).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::{debug, info, warn};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{AnalysisError, Result};
use crate::records::{FeatureRow, ReferenceTable, Tick};

/// Two-sample KS distance: the largest gap between the empirical CDFs of `a`
/// and `b`, evaluated over the pooled sample.
///
/// Symmetric in its arguments and 0 for samples with identical empirical
/// distributions. Non-finite values are dropped; an empty sample is an error.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> Result<f64> {
    let mut a: Vec<f64> = a.iter().copied().filter(|v| v.is_finite()).collect();
    let mut b: Vec<f64> = b.iter().copied().filter(|v| v.is_finite()).collect();
    if a.is_empty() || b.is_empty() {
        return Err(AnalysisError::empty(format!(
            "KS comparison needs two non-empty samples (got {} and {})",
            a.len(),
            b.len()
        )));
    }
    a.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));
    b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d = 0.0_f64;
    // once either sample is exhausted the gap can only shrink
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }
    Ok(d.clamp(0.0, 1.0))
}

/// One KS comparison. `tick == None` means all ticks pooled, `sample == None`
/// means the full population rather than a subsample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KsStatisticRow {
    #[serde(rename = "KEY")]
    pub key: String,
    #[serde(rename = "FEATURE")]
    pub feature: String,
    #[serde(rename = "TICK")]
    pub tick: Option<Tick>,
    #[serde(rename = "SAMPLE")]
    pub sample: Option<usize>,
    #[serde(rename = "KS_STATISTIC")]
    pub ks_statistic: f64,
    /// Number of simulated values in the comparison
    #[serde(rename = "SIZE")]
    pub size: usize,
}

impl KsStatisticRow {
    pub fn is_overall(&self) -> bool {
        self.tick.is_none() && self.sample.is_none()
    }
}

/// Random subsampling of the simulated population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KsSampling {
    /// Values drawn (without replacement) per subsample
    pub sample_size: usize,
    pub num_samples: usize,
    pub seed: u64,
}

impl Default for KsSampling {
    fn default() -> Self {
        Self {
            sample_size: 100,
            num_samples: 10,
            seed: 128,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionComparator {
    pub per_tick: bool,
    pub sampling: Option<KsSampling>,
}

impl Default for DistributionComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl DistributionComparator {
    pub fn new() -> Self {
        Self {
            per_tick: true,
            sampling: None,
        }
    }

    pub fn with_per_tick(mut self, per_tick: bool) -> Self {
        self.per_tick = per_tick;
        self
    }

    pub fn with_sampling(mut self, sampling: KsSampling) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// KS rows for condition `key` against every reference feature.
    ///
    /// Features missing from the simulated rows, or whose reference holds no
    /// finite value, are skipped with a warning.
    pub fn compare(
        &self,
        key: &str,
        rows: &[FeatureRow],
        reference: &ReferenceTable,
    ) -> Result<Vec<KsStatisticRow>> {
        let key_rows: Vec<&FeatureRow> = rows.iter().filter(|r| r.key == key).collect();
        info!(
            "Comparing {} rows of key '{}' against {} reference features",
            key_rows.len(),
            key,
            reference.features.len()
        );

        if let Some(s) = &self.sampling {
            if s.sample_size == 0 {
                return Err(AnalysisError::parameter("sample_size", "must be >= 1"));
            }
        }
        let mut rng = self.sampling.map(|s| ChaCha8Rng::seed_from_u64(s.seed));

        let mut out = Vec::new();
        for (feature, raw_reference) in &reference.features {
            let ref_values: Vec<f64> = raw_reference
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .collect();
            if ref_values.is_empty() {
                warn!(
                    "Reference feature '{}' has no finite values; skipping",
                    feature
                );
                continue;
            }

            let mut all_values = Vec::new();
            let mut by_tick: BTreeMap<Tick, Vec<f64>> = BTreeMap::new();
            for row in &key_rows {
                if let Some(v) = row.get(feature).filter(|v| v.is_finite()) {
                    all_values.push(v);
                    by_tick.entry(row.tick).or_default().push(v);
                }
            }
            if all_values.is_empty() {
                warn!("Key '{}' has no values for feature '{}'; skipping", key, feature);
                continue;
            }

            let make_row = |tick, sample_index, values: &[f64]| -> Result<KsStatisticRow> {
                Ok(KsStatisticRow {
                    key: key.to_string(),
                    feature: feature.clone(),
                    tick,
                    sample: sample_index,
                    ks_statistic: ks_statistic(values, &ref_values)?,
                    size: values.len(),
                })
            };

            out.push(make_row(None, None, &all_values)?);

            if self.per_tick {
                for (tick, values) in &by_tick {
                    out.push(make_row(Some(*tick), None, values)?);
                }
            }

            if let (Some(s), Some(rng)) = (&self.sampling, rng.as_mut()) {
                let amount = s.sample_size.min(all_values.len());
                if amount < s.sample_size {
                    debug!(
                        "Feature '{}': only {} values, subsamples use all of them",
                        feature, amount
                    );
                }
                for index in 0..s.num_samples {
                    let picked: Vec<f64> = sample(rng, all_values.len(), amount)
                        .iter()
                        .map(|i| all_values[i])
                        .collect();
                    out.push(make_row(None, Some(index), &picked)?);
                }
            }
        }

        debug!("Produced {} KS rows for key '{}'", out.len(), key);
        Ok(out)
    }
}
