//! Per-unit analysis and output row assembly.
//!
//! A unit is one (key, seed, tick). Units share nothing, so they are analysed
//! in parallel; a unit that fails is logged, recorded in
//! [`AnalysisReport::failures`] and left out of every table. Spatial clustering
//! and Hopkins only need coordinates, so when they fail the unit keeps its
//! graph rows and the error is kept in [`UnitResult::errors`].

use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::builder::AnalysisParams;
use crate::clustering::{ClusterCounts, LabelAssigner};
use crate::components::{centroid_map, ClusterSummary};
use crate::errors::{AnalysisError, Result};
use crate::graph::GraphBuilder;
use crate::measures::{GraphMetrics, GraphMetricsCalculator};
use crate::records::{collapse_rows, group_units, AdjacencyRecord, Seed, Tick, UnitKey};
use crate::spatial::hopkins;
use crate::summary::{mean_std, temporal_summary, TemporalPoint};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummaryRow {
    #[serde(rename = "KEY")]
    pub key: String,
    #[serde(rename = "SEED")]
    pub seed: Seed,
    #[serde(rename = "TICK")]
    pub tick: Tick,
    #[serde(rename = "NUM_CLUSTERS")]
    pub num_clusters: usize,
    #[serde(rename = "NUM_SINGLES")]
    pub num_singles: usize,
    #[serde(rename = "CLUSTER_FRACTION")]
    pub cluster_fraction: f64,
    #[serde(rename = "CLUSTER_SIZE_TOTAL")]
    pub cluster_size_total: usize,
    #[serde(rename = "CLUSTER_SIZE_MEAN")]
    pub cluster_size_mean: Option<f64>,
    #[serde(rename = "CLUSTER_SIZE_STD")]
    pub cluster_size_std: Option<f64>,
    #[serde(rename = "INTER_DISTANCE_MEAN")]
    pub inter_distance_mean: Option<f64>,
    #[serde(rename = "INTER_DISTANCE_STD")]
    pub inter_distance_std: Option<f64>,
    /// Mean over clusters of the per-cluster mean member distance
    #[serde(rename = "INTRA_DISTANCE_MEAN")]
    pub intra_distance_mean: Option<f64>,
    /// Mean over clusters of the per-cluster member distance deviation
    #[serde(rename = "INTRA_DISTANCE_STD")]
    pub intra_distance_std: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphMetricsRow {
    #[serde(rename = "KEY")]
    pub key: String,
    #[serde(rename = "SEED")]
    pub seed: Seed,
    #[serde(rename = "TICK")]
    pub tick: Tick,
    #[serde(rename = "DEGREES")]
    pub degrees: Vec<usize>,
    #[serde(rename = "DEGREE_MEAN")]
    pub degree_mean: Option<f64>,
    #[serde(rename = "DEGREE_STD")]
    pub degree_std: Option<f64>,
    #[serde(rename = "DEGREE_CENTRALITY_MEAN")]
    pub degree_centrality_mean: f64,
    #[serde(rename = "CLOSENESS_CENTRALITY_MEAN")]
    pub closeness_centrality_mean: f64,
    #[serde(rename = "BETWEENNESS_CENTRALITY_MEAN")]
    pub betweenness_centrality_mean: f64,
    #[serde(rename = "RADIUS")]
    pub radius: Option<f64>,
    #[serde(rename = "DIAMETER")]
    pub diameter: Option<f64>,
    #[serde(rename = "ECCENTRICITY")]
    pub eccentricity: Option<f64>,
    #[serde(rename = "SHORTEST_PATH")]
    pub shortest_path: Option<f64>,
}

impl GraphMetricsRow {
    fn from_metrics(unit: &UnitKey, m: GraphMetrics) -> Self {
        Self {
            key: unit.key.clone(),
            seed: unit.seed,
            tick: unit.tick,
            degrees: m.degrees,
            degree_mean: m.degree_mean,
            degree_std: m.degree_std,
            degree_centrality_mean: m.degree_centrality_mean,
            closeness_centrality_mean: m.closeness_centrality_mean,
            betweenness_centrality_mean: m.betweenness_centrality_mean,
            radius: m.distances.map(|d| d.radius),
            diameter: m.distances.map(|d| d.diameter),
            eccentricity: m.distances.map(|d| d.eccentricity),
            shortest_path: m.distances.map(|d| d.shortest_path),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialClusterRow {
    #[serde(rename = "KEY")]
    pub key: String,
    #[serde(rename = "SEED")]
    pub seed: Seed,
    #[serde(rename = "TICK")]
    pub tick: Tick,
    #[serde(rename = "NUM_CLUSTERS")]
    pub num_clusters: usize,
    #[serde(rename = "NUM_NOISE")]
    pub num_noise: usize,
    #[serde(rename = "CLUSTER_SIZES")]
    pub cluster_sizes: Vec<usize>,
    #[serde(rename = "CLUSTER_FRACTIONS")]
    pub cluster_fractions: Vec<f64>,
}

/// Everything computed for one unit.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitResult {
    pub unit: UnitKey,
    pub num_cells: usize,
    pub clusters: ClusterSummaryRow,
    pub measures: GraphMetricsRow,
    pub spatial: Option<SpatialClusterRow>,
    pub hopkins: Option<f64>,
    /// Coordinate-based steps that failed; their outputs are `None` while the
    /// graph-based rows are kept
    pub errors: Vec<AnalysisError>,
}

/// Outcome of a batch run: successful units in (key, seed, tick) order plus
/// the errors of the units that failed.
#[derive(Clone, Debug, Default)]
pub struct AnalysisReport {
    pub units: Vec<UnitResult>,
    pub failures: Vec<AnalysisError>,
}

impl AnalysisReport {
    pub fn cluster_rows(&self) -> Vec<ClusterSummaryRow> {
        self.units.iter().map(|u| u.clusters.clone()).collect()
    }

    pub fn metrics_rows(&self) -> Vec<GraphMetricsRow> {
        self.units.iter().map(|u| u.measures.clone()).collect()
    }

    /// Errors of coordinate-based steps in units that otherwise succeeded,
    /// tagged with their unit.
    pub fn partial_failures(&self) -> Vec<AnalysisError> {
        self.units
            .iter()
            .flat_map(|u| {
                u.errors
                    .iter()
                    .map(|e| e.clone().in_unit(&u.unit.key, u.unit.seed, u.unit.tick))
            })
            .collect()
    }

    pub fn spatial_rows(&self) -> Vec<SpatialClusterRow> {
        self.units.iter().filter_map(|u| u.spatial.clone()).collect()
    }

    /// Per-tick summary across seeds of a scalar extracted from each unit of `key`.
    pub fn temporal<F>(&self, key: &str, extract: F) -> Vec<TemporalPoint>
    where
        F: Fn(&UnitResult) -> Option<f64>,
    {
        let values: Vec<(Seed, Tick, f64)> = self
            .units
            .iter()
            .filter(|u| u.unit.key == key)
            .filter_map(|u| extract(u).map(|v| (u.unit.seed, u.unit.tick, v)))
            .collect();
        temporal_summary(&values)
    }
}

/// Batch colony analysis configured through `ColonyAnalysisBuilder`.
#[derive(Clone, Debug)]
pub struct ColonyAnalysis {
    params: AnalysisParams,
    calculator: GraphMetricsCalculator,
}

impl ColonyAnalysis {
    pub fn new(params: AnalysisParams) -> Self {
        let calculator = GraphMetricsCalculator::new(params.distance_policy);
        Self { params, calculator }
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    /// Analyse every unit of a flat record table.
    pub fn run(&self, records: Vec<AdjacencyRecord>) -> AnalysisReport {
        let units = group_units(records);
        let selected: Vec<(UnitKey, Vec<AdjacencyRecord>)> = units
            .into_iter()
            .filter(|(unit, _)| match &self.params.valid_ticks {
                Some(ticks) => ticks.contains(&unit.tick),
                None => true,
            })
            .collect();
        info!("Analysing {} units", selected.len());

        let outcomes: Vec<Result<UnitResult>> = selected
            .par_iter()
            .map(|(unit, unit_records)| {
                self.analyze_unit(unit, unit_records)
                    .map_err(|e| e.in_unit(&unit.key, unit.seed, unit.tick))
            })
            .collect();

        let mut report = AnalysisReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(result) => report.units.push(result),
                Err(e) => {
                    warn!("{}", e);
                    report.failures.push(e);
                }
            }
        }
        info!(
            "Analysis finished: {} units ok, {} failed",
            report.units.len(),
            report.failures.len()
        );
        report
    }

    /// Analyse the records of a single unit.
    pub fn analyze_unit(&self, unit: &UnitKey, records: &[AdjacencyRecord]) -> Result<UnitResult> {
        debug!("Analysing unit {} ({} records)", unit, records.len());
        let records = collapse_rows(records)?;

        let graph = GraphBuilder::from_records(&records);
        let summary = ClusterSummary::decompose(&graph);
        let centroids = centroid_map(&records);

        let (size_mean, size_std) = match summary.cluster_size_stats() {
            Some((m, s)) => (Some(m), s),
            None => (None, None),
        };
        let inter = summary.inter_cluster_distances(&centroids);
        let intra = summary.intra_cluster_distances(&centroids);
        let intra_means: Vec<f64> = intra.iter().map(|d| d.mean).collect();
        let intra_stds: Vec<f64> = intra.iter().filter_map(|d| d.std).collect();

        let clusters = ClusterSummaryRow {
            key: unit.key.clone(),
            seed: unit.seed,
            tick: unit.tick,
            num_clusters: summary.num_clusters(),
            num_singles: summary.num_singles(),
            cluster_fraction: summary.cluster_fraction(),
            cluster_size_total: summary.clustered_cells(),
            cluster_size_mean: size_mean,
            cluster_size_std: size_std,
            inter_distance_mean: inter.map(|d| d.mean),
            inter_distance_std: inter.and_then(|d| d.std),
            intra_distance_mean: mean_std(&intra_means).map(|(m, _)| m),
            intra_distance_std: mean_std(&intra_stds).map(|(m, _)| m),
        };

        let measures = GraphMetricsRow::from_metrics(unit, self.calculator.compute(&graph));

        let points: Vec<Vec<f64>> = records.iter().map(|r| r.centroid()).collect();

        let mut errors = Vec::new();

        let spatial = match self.spatial_row(unit, &points) {
            Ok(row) => row,
            Err(e) => {
                warn!("Unit {}: spatial clustering skipped: {}", unit, e);
                errors.push(e);
                None
            }
        };

        let hopkins_value = match self.hopkins_value(unit, &points) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unit {}: Hopkins statistic skipped: {}", unit, e);
                errors.push(e);
                None
            }
        };

        Ok(UnitResult {
            unit: unit.clone(),
            num_cells: graph.nnodes(),
            clusters,
            measures,
            spatial,
            hopkins: hopkins_value,
            errors,
        })
    }

    fn spatial_row(&self, unit: &UnitKey, points: &[Vec<f64>]) -> Result<Option<SpatialClusterRow>> {
        let Some(strategy) = &self.params.clustering else {
            return Ok(None);
        };
        let labelling = strategy.assign_rows(points)?;
        let counts = ClusterCounts::from_labelling(&labelling);
        Ok(Some(SpatialClusterRow {
            key: unit.key.clone(),
            seed: unit.seed,
            tick: unit.tick,
            num_clusters: counts.num_clusters,
            num_noise: counts.num_noise,
            cluster_sizes: counts.sizes,
            cluster_fractions: counts.fractions,
        }))
    }

    fn hopkins_value(&self, unit: &UnitKey, points: &[Vec<f64>]) -> Result<Option<f64>> {
        let Some(h) = &self.params.hopkins else {
            return Ok(None);
        };
        if points.len() <= h.subsample {
            debug!(
                "Unit {} has {} cells, not more than subsample {}; skipping Hopkins",
                unit,
                points.len(),
                h.subsample
            );
            return Ok(None);
        }
        let seed = h
            .seed
            .wrapping_add((unit.seed as u64).wrapping_mul(1_000_003))
            .wrapping_add(unit.tick as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        hopkins(points, h.subsample, &mut rng).map(Some)
    }
}
