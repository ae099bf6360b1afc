use crate::clustering::ClusteringStrategy;
use crate::errors::{AnalysisError, Result};
use crate::measures::DistancePolicy;
use crate::pipeline::ColonyAnalysis;
use crate::records::Tick;

use serde::{Deserialize, Serialize};

use log::{debug, info};

/// Hopkins statistic settings for per-unit analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopkinsParams {
    /// Points drawn per estimate; units with no more cells than this are skipped
    pub subsample: usize,
    /// Base seed; each unit derives its own generator from it
    pub seed: u64,
}

/// Parameters of a colony analysis run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Spatial clustering on cell centroids; `None` skips it
    pub clustering: Option<ClusteringStrategy>,
    pub distance_policy: DistancePolicy,
    /// Only these ticks are analysed; `None` keeps every tick
    pub valid_ticks: Option<Vec<Tick>>,
    pub hopkins: Option<HopkinsParams>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            clustering: Some(ClusteringStrategy::default()),
            distance_policy: DistancePolicy::default(),
            valid_ticks: None,
            hopkins: None,
        }
    }
}

pub struct ColonyAnalysisBuilder {
    params: AnalysisParams,
}

impl Default for ColonyAnalysisBuilder {
    fn default() -> Self {
        debug!("Creating ColonyAnalysisBuilder with default parameters");
        Self {
            params: AnalysisParams::default(),
        }
    }
}

impl ColonyAnalysisBuilder {
    pub fn new() -> Self {
        info!("Initializing new ColonyAnalysisBuilder");
        Self::default()
    }

    /// Strategy for the coordinate-based clustering (`None` disables it).
    pub fn with_spatial_clustering(mut self, strategy: Option<ClusteringStrategy>) -> Self {
        info!("Configuring spatial clustering: {:?}", strategy);
        self.params.clustering = strategy;
        self
    }

    /// Policy for radius/diameter/eccentricity/path length on disconnected graphs.
    pub fn with_distance_policy(mut self, policy: DistancePolicy) -> Self {
        info!("Configuring distance policy: {:?}", policy);
        self.params.distance_policy = policy;
        self
    }

    pub fn with_valid_ticks(mut self, ticks: Vec<Tick>) -> Self {
        info!("Restricting analysis to {} ticks", ticks.len());
        self.params.valid_ticks = Some(ticks);
        self
    }

    /// Compute a Hopkins estimate per unit from cell centroids.
    pub fn with_hopkins(mut self, subsample: usize, seed: u64) -> Self {
        info!("Configuring Hopkins: subsample={}, seed={}", subsample, seed);
        self.params.hopkins = Some(HopkinsParams { subsample, seed });
        self
    }

    pub fn with_params(mut self, params: AnalysisParams) -> Self {
        self.params = params;
        self
    }

    /// Validate the configuration and produce the analysis runner.
    pub fn build(self) -> Result<ColonyAnalysis> {
        if let Some(strategy) = &self.params.clustering {
            strategy.validate()?;
        }
        if let Some(h) = &self.params.hopkins {
            if h.subsample == 0 {
                return Err(AnalysisError::parameter("subsample", "must be >= 1"));
            }
        }
        debug!("Built analysis with params {:?}", self.params);
        Ok(ColonyAnalysis::new(self.params))
    }
}
