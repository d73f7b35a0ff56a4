//! Capacity-constrained k-means
//!
//! Lloyd iterations where a point may only join a cluster that still has room
//! in the current pass. Points are visited in input order, so earlier points
//! get first pick of the nearest centroid.
//!
//! Seeding takes the first K points as initial centroids. This keeps a run
//! reproducible for a given input order.

use tracing::{debug, warn};

use crate::defaults::{KMEANS_MAX_ITERATIONS, KMEANS_TOLERANCE};
use crate::services::geo::squared_distance;
use crate::types::Coordinates;

/// K-means iteration limits
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub max_iterations: usize,
    /// Squared distance under which a centroid counts as not moving
    pub tolerance: f64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: KMEANS_MAX_ITERATIONS,
            tolerance: KMEANS_TOLERANCE,
        }
    }
}

/// Result of a clustering run
#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    /// Cluster index per input point, `None` if every cluster was full
    pub assignment: Vec<Option<usize>>,
    pub centroids: Vec<Coordinates>,
    pub iterations: usize,
    /// False when the iteration cap was reached first
    pub converged: bool,
}

impl KMeansOutcome {
    /// Indices of points left out of every cluster
    pub fn unassigned(&self) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.is_none().then_some(i))
            .collect()
    }
}

/// Point count per cluster for an assignment vector
pub fn cluster_sizes(assignment: &[Option<usize>], k: usize) -> Vec<usize> {
    let mut sizes = vec![0; k];
    for cluster in assignment.iter().flatten() {
        if let Some(size) = sizes.get_mut(*cluster) {
            *size += 1;
        }
    }
    sizes
}

pub struct ConstrainedKMeans {
    config: KMeansConfig,
}

impl Default for ConstrainedKMeans {
    fn default() -> Self {
        Self::new(KMeansConfig::default())
    }
}

impl ConstrainedKMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    /// Partition `points` into `capacities.len()` clusters, cluster `j` holding
    /// at most `capacities[j]` points.
    ///
    /// Never fails: over-subscribed inputs leave trailing points unassigned and
    /// an exhausted iteration budget is reported through `converged`.
    pub fn cluster(&self, points: &[Coordinates], capacities: &[usize]) -> KMeansOutcome {
        let n = points.len();
        let k = capacities.len();

        if n == 0 || k == 0 {
            return KMeansOutcome {
                assignment: vec![None; n],
                centroids: vec![],
                iterations: 0,
                converged: true,
            };
        }

        // Cycling through the input when K > n keeps the extra centroids tied
        // with a lower index, so those clusters stay empty.
        let mut centroids: Vec<Coordinates> = (0..k).map(|j| points[j % n]).collect();
        let mut assignment = vec![None; n];
        let mut iterations = 0;
        let mut converged = false;

        while !converged && iterations < self.config.max_iterations {
            let mut counts = vec![0usize; k];

            for (i, point) in points.iter().enumerate() {
                let mut best_cluster = None;
                let mut best_distance = f64::INFINITY;

                for (j, centroid) in centroids.iter().enumerate() {
                    if counts[j] >= capacities[j] {
                        continue;
                    }
                    let d = squared_distance(point, centroid);
                    if d < best_distance {
                        best_distance = d;
                        best_cluster = Some(j);
                    }
                }

                assignment[i] = best_cluster;
                if let Some(j) = best_cluster {
                    counts[j] += 1;
                }
            }

            let next = recompute_centroids(points, &assignment, &centroids);
            converged = centroids
                .iter()
                .zip(&next)
                .all(|(old, new)| squared_distance(old, new) <= self.config.tolerance);
            centroids = next;
            iterations += 1;
        }

        let outcome = KMeansOutcome {
            assignment,
            centroids,
            iterations,
            converged,
        };

        let unassigned = outcome.unassigned().len();
        if unassigned > 0 {
            warn!(
                "{} of {} points left unassigned: total capacity {} is too small",
                unassigned,
                n,
                capacities.iter().sum::<usize>()
            );
        }
        if !outcome.converged {
            debug!(
                "k-means stopped after {} iterations without converging",
                outcome.iterations
            );
        }

        outcome
    }
}

/// Mean of each cluster's points; empty clusters keep their previous centroid.
fn recompute_centroids(
    points: &[Coordinates],
    assignment: &[Option<usize>],
    previous: &[Coordinates],
) -> Vec<Coordinates> {
    let k = previous.len();
    let mut sums = vec![(0.0, 0.0); k];
    let mut counts = vec![0usize; k];

    for (point, cluster) in points.iter().zip(assignment) {
        if let Some(j) = *cluster {
            sums[j].0 += point.lat;
            sums[j].1 += point.lng;
            counts[j] += 1;
        }
    }

    previous
        .iter()
        .enumerate()
        .map(|(j, old)| {
            if counts[j] == 0 {
                *old
            } else {
                Coordinates {
                    lat: sums[j].0 / counts[j] as f64,
                    lng: sums[j].1 / counts[j] as f64,
                }
            }
        })
        .collect()
}
