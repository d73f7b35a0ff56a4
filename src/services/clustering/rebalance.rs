//! Post-clustering size repair
//!
//! Both strategies are greedy: they move one point at a time from an
//! over-full cluster to the nearest under-filled one and never look at
//! centroids. Unassigned points (`None`) are left as they are.

use tracing::{debug, warn};

use crate::services::geo::{mean, squared_distance};
use crate::types::Coordinates;

/// Point indices per cluster, in assignment order
fn build_buckets(assignment: &[Option<usize>], k: usize) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); k];
    for (i, cluster) in assignment.iter().enumerate() {
        if let Some(j) = *cluster {
            if j < k {
                buckets[j].push(i);
            }
        }
    }
    buckets
}

fn move_point(
    assignment: &mut [Option<usize>],
    buckets: &mut [Vec<usize>],
    point: usize,
    from: usize,
    to: usize,
) {
    buckets[from].retain(|&i| i != point);
    buckets[to].push(point);
    assignment[point] = Some(to);
}

/// Member farthest from its cluster's mean (first one on ties)
fn outlier(points: &[Coordinates], members: &[usize]) -> Option<usize> {
    let center = mean(members.iter().map(|&i| &points[i]))?;

    let mut best = None;
    let mut best_distance = f64::NEG_INFINITY;
    for &i in members {
        let d = squared_distance(&points[i], &center);
        if d > best_distance {
            best_distance = d;
            best = Some(i);
        }
    }
    best
}

/// Equalise cluster sizes until the largest and smallest differ by at most one.
///
/// Each step moves, out of the largest cluster, the point closest to any
/// member of the smallest cluster. An empty smallest cluster receives the
/// largest cluster's outlier instead.
pub fn rebalance_balanced(
    points: &[Coordinates],
    assignment: &[Option<usize>],
    k: usize,
) -> Vec<Option<usize>> {
    let mut assign = assignment.to_vec();
    if k == 0 {
        return assign;
    }

    let mut buckets = build_buckets(&assign, k);
    let mut moves = 0;

    loop {
        let big = largest(&buckets);
        let small = smallest(&buckets);
        if buckets[big].len() - buckets[small].len() <= 1 {
            break;
        }

        let candidate = if buckets[small].is_empty() {
            outlier(points, &buckets[big])
        } else {
            nearest_to_bucket(points, &buckets[big], &buckets[small])
        };

        let Some(point) = candidate else {
            warn!("No movable point between clusters {} and {}", big, small);
            break;
        };

        move_point(&mut assign, &mut buckets, point, big, small);
        moves += 1;
    }

    debug!("Balanced rebalancing done after {} moves", moves);
    assign
}

/// First index among the largest buckets
fn largest(buckets: &[Vec<usize>]) -> usize {
    let mut best = 0;
    for (j, bucket) in buckets.iter().enumerate() {
        if bucket.len() > buckets[best].len() {
            best = j;
        }
    }
    best
}

/// Last index among the smallest buckets
fn smallest(buckets: &[Vec<usize>]) -> usize {
    let mut best = 0;
    for (j, bucket) in buckets.iter().enumerate() {
        if bucket.len() <= buckets[best].len() {
            best = j;
        }
    }
    best
}

/// Point of `from` with the smallest squared distance to any point of `to`
fn nearest_to_bucket(points: &[Coordinates], from: &[usize], to: &[usize]) -> Option<usize> {
    let mut best = None;
    let mut best_distance = f64::INFINITY;

    for &p in from {
        for &q in to {
            let d = squared_distance(&points[p], &points[q]);
            if d < best_distance {
                best_distance = d;
                best = Some(p);
            }
        }
    }
    best
}

/// Move points until every cluster holds `desired[j]` points.
///
/// Over-full clusters give away the point closest to the first member of an
/// under-filled cluster. When the desired sizes do not add up to the number of
/// assigned points, the loop stops as soon as no eligible move remains and the
/// result keeps some clusters over or under their target.
pub fn rebalance_custom(
    points: &[Coordinates],
    assignment: &[Option<usize>],
    desired: &[usize],
) -> Vec<Option<usize>> {
    let k = desired.len();
    let mut assign = assignment.to_vec();
    let mut buckets = build_buckets(&assign, k);
    let mut moves = 0;

    let mut changed = true;
    while changed {
        changed = false;

        for from in 0..k {
            let excess = buckets[from].len().saturating_sub(desired[from]);

            for _ in 0..excess {
                let Some((point, to)) = best_custom_move(points, &buckets, desired, from) else {
                    break;
                };
                move_point(&mut assign, &mut buckets, point, from, to);
                moves += 1;
                changed = true;
            }
        }
    }

    let misses = buckets
        .iter()
        .zip(desired)
        .filter(|(bucket, &target)| bucket.len() != target)
        .count();
    if misses > 0 {
        warn!(
            "{} clusters could not reach their desired size after {} moves",
            misses, moves
        );
    } else {
        debug!("Custom rebalancing done after {} moves", moves);
    }

    assign
}

fn best_custom_move(
    points: &[Coordinates],
    buckets: &[Vec<usize>],
    desired: &[usize],
    from: usize,
) -> Option<(usize, usize)> {
    let mut best = None;
    let mut best_distance = f64::INFINITY;

    for &p in &buckets[from] {
        for (to, &target) in desired.iter().enumerate() {
            if buckets[to].len() >= target {
                continue;
            }
            let Some(&anchor) = buckets[to].first() else {
                continue;
            };
            let d = squared_distance(&points[p], &points[anchor]);
            if d < best_distance {
                best_distance = d;
                best = Some((p, to));
            }
        }
    }

    if best.is_some() {
        return best;
    }

    // Only empty clusters are short: seed the first one with the outlier
    let to = desired
        .iter()
        .enumerate()
        .position(|(j, &target)| buckets[j].is_empty() && target > 0)?;
    outlier(points, &buckets[from]).map(|p| (p, to))
}
