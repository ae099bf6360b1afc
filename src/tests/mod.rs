mod test_clustering;
mod test_data;
mod test_graph;
mod test_measures;

use crate::clustering::ClusteringStrategy;

pub const DENSITY: ClusteringStrategy = ClusteringStrategy::Density {
    eps: 1.0,
    min_samples: 2,
};

pub const SINGLE_LINK: ClusteringStrategy = ClusteringStrategy::SingleLink {
    distance_threshold: 1.0,
};
