//! Turns a cluster of points into a timed, priced route

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::defaults::{AVERAGE_SPEED_KMH, HANDLING_MINUTES_PER_STOP};
use crate::services::routing::{DistanceEstimator, RoutingOptimizer, WaypointKind};
use crate::types::{slot_letter, Coordinates, DeliveryPoint, Team, Tournee, TourneeStatus, Vehicle};

/// Driving time plus handling time at every stop, rounded to the minute
pub fn estimate_duration_minutes(
    distance_km: f64,
    stops: usize,
    average_speed_kmh: f64,
    handling_minutes_per_stop: f64,
) -> i64 {
    let driving = distance_km / average_speed_kmh * 60.0;
    let handling = stops as f64 * handling_minutes_per_stop;
    (driving + handling).round() as i64
}

pub fn estimate_cost(distance_km: f64, cost_per_km: f64) -> i64 {
    (distance_km * cost_per_km).round() as i64
}

/// One non-empty cluster ready for routing
#[derive(Debug, Clone)]
pub struct ClusterInput {
    pub cluster: usize,
    pub points: Vec<DeliveryPoint>,
    pub team: Team,
    pub vehicle: Vehicle,
}

/// Route obtained for a cluster, before a reference is issued
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRoute {
    pub cluster: usize,
    pub team_id: i64,
    pub vehicle_code: String,
    /// Delivered point ids in visiting order
    pub point_ids: Vec<String>,
    /// Cluster points the optimizer left out of the route
    pub undelivered_point_ids: Vec<String>,
    pub path: Vec<Coordinates>,
    pub distance_km: f64,
    pub duration_minutes: i64,
    pub cost: i64,
}

impl AssembledRoute {
    pub fn into_tournee(self, reference: String) -> Tournee {
        Tournee {
            reference,
            letter: slot_letter(self.cluster),
            status: TourneeStatus::Planned,
            team_id: self.team_id,
            vehicle_code: self.vehicle_code,
            point_ids: self.point_ids,
            path: self.path,
            distance_km: self.distance_km,
            duration_minutes: self.duration_minutes,
            cost: self.cost,
            assembly_minutes: 0,
            journee_reference: String::new(),
        }
    }
}

pub struct RouteAssembler {
    optimizer: Arc<dyn RoutingOptimizer>,
    distance: Arc<dyn DistanceEstimator>,
    average_speed_kmh: f64,
    handling_minutes_per_stop: f64,
}

impl RouteAssembler {
    pub fn new(optimizer: Arc<dyn RoutingOptimizer>, distance: Arc<dyn DistanceEstimator>) -> Self {
        Self {
            optimizer,
            distance,
            average_speed_kmh: AVERAGE_SPEED_KMH,
            handling_minutes_per_stop: HANDLING_MINUTES_PER_STOP,
        }
    }

    pub fn with_timing(mut self, average_speed_kmh: f64, handling_minutes_per_stop: f64) -> Self {
        self.average_speed_kmh = average_speed_kmh;
        self.handling_minutes_per_stop = handling_minutes_per_stop;
        self
    }

    /// Route one cluster.
    ///
    /// Returns `None` when a collaborator fails or the optimizer yields no
    /// usable route; the other clusters are not affected.
    pub async fn assemble(&self, input: &ClusterInput, depot: Coordinates) -> Option<AssembledRoute> {
        match self.try_assemble(input, depot).await {
            Ok(Some(route)) => Some(route),
            Ok(None) => {
                warn!(
                    "{} returned no usable route for cluster {} (team {})",
                    self.optimizer.name(),
                    input.cluster,
                    input.team.id
                );
                None
            }
            Err(e) => {
                warn!(
                    "Skipping cluster {} (team {}): {:#}",
                    input.cluster, input.team.id, e
                );
                None
            }
        }
    }

    async fn try_assemble(&self, input: &ClusterInput, depot: Coordinates) -> Result<Option<AssembledRoute>> {
        let waypoints = self
            .optimizer
            .optimize(depot, &input.points, &input.vehicle)
            .await
            .with_context(|| format!("{} optimization failed", self.optimizer.name()))?;

        if waypoints.len() < 2 {
            return Ok(None);
        }

        let path: Vec<Coordinates> = waypoints.iter().map(|w| w.coordinates).collect();
        let point_ids: Vec<String> = waypoints
            .iter()
            .filter(|w| w.kind == WaypointKind::Job)
            .filter_map(|w| w.job_index)
            .filter_map(|i| input.points.get(i))
            .map(|p| p.id.clone())
            .collect();

        let undelivered_point_ids: Vec<String> = input
            .points
            .iter()
            .filter(|p| !point_ids.contains(&p.id))
            .map(|p| p.id.clone())
            .collect();
        if !undelivered_point_ids.is_empty() {
            warn!(
                "Cluster {} route delivers {} of {} points, left out: {:?}",
                input.cluster,
                point_ids.len(),
                input.points.len(),
                undelivered_point_ids
            );
        }

        let distance_km = self
            .distance
            .distance_km(&path)
            .await
            .context("Distance estimation failed")?;

        let stops = path.len().saturating_sub(2);
        let duration_minutes = estimate_duration_minutes(
            distance_km,
            stops,
            self.average_speed_kmh,
            self.handling_minutes_per_stop,
        );
        let cost = estimate_cost(distance_km, input.vehicle.cost_per_km);

        debug!(
            "Cluster {}: {} stops, {:.1} km, {} min, cost {}",
            input.cluster, stops, distance_km, duration_minutes, cost
        );

        Ok(Some(AssembledRoute {
            cluster: input.cluster,
            team_id: input.team.id,
            vehicle_code: input.vehicle.code.clone(),
            point_ids,
            undelivered_point_ids,
            path,
            distance_km,
            duration_minutes,
            cost,
        }))
    }
}
