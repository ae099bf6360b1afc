//! Spatial clustering of centroids.
//!
//! Tests cover:
//! - DBSCAN core/border/noise behaviour and eps-chain reachability
//! - Single-link merging with a strict threshold
//! - Shared counting across strategies
//! - Parameter and shape validation

use std::collections::VecDeque;

use approx::assert_relative_eq;

use crate::clustering::{
    cluster_points, dbscan, euclidean_dist, single_link, ClusterCounts, ClusteringStrategy,
    LabelAssigner,
};
use crate::errors::AnalysisError;
use crate::spatial::points_matrix;
use crate::tests::{DENSITY, SINGLE_LINK};

fn chain_with_outlier() -> Vec<Vec<f64>> {
    vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![0.0, 2.0],
        vec![10.0, 10.0],
    ]
}

#[test]
fn test_euclidean_dist_basic() {
    assert_relative_eq!(euclidean_dist(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    assert_relative_eq!(euclidean_dist(&[1.5, -2.0], &[1.5, -2.0]), 0.0);
}

#[test]
fn test_density_labels_every_point() {
    crate::init();
    let rows = chain_with_outlier();
    let labelling = DENSITY.assign_rows(&rows).unwrap();

    assert_eq!(labelling.len(), rows.len());
    assert!(labelling.emits_noise);
    assert_eq!(labelling.labels[0], Some(0));
    assert_eq!(labelling.labels[1], Some(0));
    assert_eq!(labelling.labels[2], Some(0));
    assert_eq!(labelling.labels[3], None);
}

/// Members of `group` reachable from its first member through steps of at most
/// `eps` that stay inside the group.
fn reachable_within(rows: &[Vec<f64>], group: &[usize], eps: f64) -> Vec<usize> {
    let mut seen = vec![group[0]];
    let mut queue = VecDeque::from([group[0]]);
    while let Some(i) = queue.pop_front() {
        for &j in group {
            if !seen.contains(&j) && euclidean_dist(&rows[i], &rows[j]) <= eps {
                seen.push(j);
                queue.push_back(j);
            }
        }
    }
    seen.sort_unstable();
    seen
}

#[test]
fn test_density_same_label_implies_eps_chain() {
    crate::init();
    let rows = vec![
        vec![0.0, 0.0],
        vec![0.8, 0.0],
        vec![1.6, 0.0],
        vec![2.4, 0.0],
        vec![9.0, 0.0],
        vec![9.5, 0.0],
        vec![20.0, 20.0],
        vec![0.0, 5.0],
        vec![0.0, 5.9],
    ];
    let eps = 1.0;
    let labelling = DENSITY.assign_rows(&rows).unwrap();
    let groups = labelling.groups();

    for (label, members) in &groups {
        assert_eq!(
            &reachable_within(&rows, members, eps),
            members,
            "cluster {} is not one eps-chain",
            label
        );
    }
    assert_eq!(groups.len(), 3);
    assert_eq!(labelling.noise_points(), 1);
}

#[test]
fn test_eps_chain_check_detects_split_group() {
    let rows = vec![
        vec![0.0, 0.0],
        vec![0.5, 0.0],
        vec![9.0, 0.0],
        vec![9.5, 0.0],
    ];
    // each member has a partner within eps, but the pairs are not linked
    assert_eq!(reachable_within(&rows, &[0, 1, 2, 3], 1.0), vec![0, 1]);
}

#[test]
fn test_density_border_points_join_cluster() {
    let rows = vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![0.0, 2.0],
        vec![0.0, 3.0],
    ];
    let points = points_matrix(&rows).unwrap();
    // ends have two points within eps (border), middle points have three (core)
    let labelling = dbscan(&points, 1.0, 3);
    assert!(labelling.labels.iter().all(|l| *l == Some(0)));
}

#[test]
fn test_density_all_noise_when_min_samples_unreachable() {
    let points = points_matrix(&chain_with_outlier()).unwrap();
    let labelling = dbscan(&points, 1.0, 5);
    assert_eq!(labelling.noise_points(), 4);
    let counts = ClusterCounts::from_labelling(&labelling);
    assert_eq!(counts.num_clusters, 0);
    assert_eq!(counts.num_noise, 4);
}

#[test]
fn test_single_link_threshold_is_strict() {
    crate::init();
    let rows = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.5]];
    let points = points_matrix(&rows).unwrap();

    let labelling = single_link(&points, 1.0);
    assert!(!labelling.emits_noise);
    assert_eq!(labelling.noise_points(), 0);
    assert_ne!(labelling.labels[0], labelling.labels[1]);
    assert_eq!(labelling.labels[1], labelling.labels[2]);

    let merged = single_link(&points, 1.0 + 1e-9);
    assert_eq!(merged.groups().len(), 1);
}

#[test]
fn test_single_link_chains_merge_transitively() {
    let rows = vec![
        vec![0.0, 0.0],
        vec![0.9, 0.0],
        vec![1.8, 0.0],
        vec![2.7, 0.0],
    ];
    let labelling = SINGLE_LINK.assign_rows(&rows).unwrap();
    assert_eq!(labelling.groups().len(), 1);
}

#[test]
fn test_counts_agree_across_strategies() {
    crate::init();
    let rows = chain_with_outlier();
    let density = cluster_points(&rows, &ClusteringStrategy::Density {
        eps: 1.0,
        min_samples: 2,
    })
    .unwrap();
    let linkage = cluster_points(&rows, &ClusteringStrategy::SingleLink {
        distance_threshold: 1.5,
    })
    .unwrap();

    for counts in [&density, &linkage] {
        assert_eq!(counts.num_clusters, 1);
        assert_eq!(counts.num_noise, 1);
        assert_eq!(counts.sizes, vec![3]);
        assert_relative_eq!(counts.fractions[0], 0.75);
        assert_relative_eq!(counts.clustered_fraction(), 0.75);
    }
}

#[test]
fn test_empty_rows_give_empty_counts() {
    let counts = cluster_points(&[], &ClusteringStrategy::default()).unwrap();
    assert_eq!(counts.total, 0);
    assert_eq!(counts.num_clusters, 0);
    assert_relative_eq!(counts.clustered_fraction(), 0.0);
}

#[test]
fn test_invalid_parameters_rejected() {
    let bad = [
        ClusteringStrategy::Density {
            eps: 0.0,
            min_samples: 2,
        },
        ClusteringStrategy::Density {
            eps: 1.0,
            min_samples: 0,
        },
        ClusteringStrategy::SingleLink {
            distance_threshold: -1.0,
        },
        ClusteringStrategy::SingleLink {
            distance_threshold: f64::NAN,
        },
    ];
    for strategy in bad {
        let err = strategy.assign_rows(&chain_with_outlier()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }), "{:?}", strategy);
    }
}

#[test]
fn test_ragged_rows_rejected() {
    let rows = vec![vec![0.0, 0.0], vec![1.0]];
    let err = DENSITY.assign_rows(&rows).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidShape(_)));
}

#[test]
fn test_strategy_default_and_equality() {
    let default = ClusteringStrategy::default();
    assert_eq!(
        default,
        ClusteringStrategy::SingleLink {
            distance_threshold: 90.0
        }
    );
    assert_ne!(default, SINGLE_LINK);
    assert_ne!(DENSITY, SINGLE_LINK);
}

#[test]
fn test_three_dimensional_rows() {
    let rows = vec![
        vec![0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.5],
        vec![5.0, 5.0, 5.0],
    ];
    let counts = cluster_points(&rows, &SINGLE_LINK).unwrap();
    assert_eq!(counts.sizes, vec![2]);
    assert_eq!(counts.num_noise, 1);
}
