//! Capacity-constrained clustering of delivery points
//!
//! `ConstrainedKMeans` produces a first partition under per-cluster
//! capacities, then one of the rebalancing strategies repairs the sizes.

mod kmeans;
mod rebalance;

pub use kmeans::{cluster_sizes, ConstrainedKMeans, KMeansConfig};
pub use rebalance::{rebalance_balanced, rebalance_custom};

use crate::types::{Coordinates, Strategy};

/// Apply the rebalancing strategy matching `strategy`.
///
/// `desired` is only read by the custom strategy.
pub fn rebalance(
    strategy: Strategy,
    points: &[Coordinates],
    assignment: &[Option<usize>],
    k: usize,
    desired: &[usize],
) -> Vec<Option<usize>> {
    match strategy {
        Strategy::Balanced => rebalance_balanced(points, assignment, k),
        Strategy::Custom => rebalance_custom(points, assignment, desired),
    }
}

/// Split `total` points over `parts` teams as evenly as possible,
/// the first `total % parts` teams taking one extra point.
pub fn distribute_evenly(total: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return vec![];
    }
    let base = total / parts;
    let remainder = total % parts;
    (0..parts)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}
