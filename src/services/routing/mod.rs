//! Route ordering and distance services
//!
//! Uses OpenRouteService for production, mock for tests.

mod ors;

pub use ors::{OrsClient, OrsConfig};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::geo::{haversine_distance, path_road_distance};
use crate::types::{Coordinates, DeliveryPoint, Vehicle};

/// Role of a waypoint in an optimized route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    Start,
    Job,
    End,
}

/// One step of an optimized route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub kind: WaypointKind,
    pub coordinates: Coordinates,
    /// Index into the points sent to the optimizer (job waypoints only)
    pub job_index: Option<usize>,
}

impl Waypoint {
    pub fn start(coordinates: Coordinates) -> Self {
        Self { kind: WaypointKind::Start, coordinates, job_index: None }
    }

    pub fn job(coordinates: Coordinates, job_index: usize) -> Self {
        Self { kind: WaypointKind::Job, coordinates, job_index: Some(job_index) }
    }

    pub fn end(coordinates: Coordinates) -> Self {
        Self { kind: WaypointKind::End, coordinates, job_index: None }
    }
}

/// Visiting order optimizer (abstraction over OpenRouteService, mock, etc.)
#[async_trait]
pub trait RoutingOptimizer: Send + Sync {
    /// Order `points` into a single route leaving from and returning to `depot`.
    ///
    /// An empty result means the optimizer found no usable route.
    async fn optimize(
        &self,
        depot: Coordinates,
        points: &[DeliveryPoint],
        vehicle: &Vehicle,
    ) -> Result<Vec<Waypoint>>;

    /// Get service name for logging
    fn name(&self) -> &str;
}

/// Road distance along an ordered path
#[async_trait]
pub trait DistanceEstimator: Send + Sync {
    async fn distance_km(&self, path: &[Coordinates]) -> Result<f64>;
}

/// Mock routing for tests and runs without an API key.
///
/// Orders stops greedily by nearest neighbour from the depot and estimates
/// distance as Haversine × road coefficient.
#[derive(Debug, Default)]
pub struct MockRouting;

impl MockRouting {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RoutingOptimizer for MockRouting {
    async fn optimize(
        &self,
        depot: Coordinates,
        points: &[DeliveryPoint],
        _vehicle: &Vehicle,
    ) -> Result<Vec<Waypoint>> {
        let mut remaining: Vec<usize> = (0..points.len()).collect();
        let mut waypoints = Vec::with_capacity(points.len() + 2);
        waypoints.push(Waypoint::start(depot));

        let mut current = depot;
        while !remaining.is_empty() {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (slot, &idx) in remaining.iter().enumerate() {
                let d = haversine_distance(&current, &points[idx].coordinates());
                if d < best_distance {
                    best_distance = d;
                    best = slot;
                }
            }

            let idx = remaining.remove(best);
            current = points[idx].coordinates();
            waypoints.push(Waypoint::job(current, idx));
        }

        waypoints.push(Waypoint::end(depot));
        Ok(waypoints)
    }

    fn name(&self) -> &str {
        "MockRouting"
    }
}

#[async_trait]
impl DistanceEstimator for MockRouting {
    async fn distance_km(&self, path: &[Coordinates]) -> Result<f64> {
        Ok(path_road_distance(path))
    }
}

/// Optimizer and distance estimator used by the planner
#[derive(Clone)]
pub struct RoutingBackend {
    pub optimizer: Arc<dyn RoutingOptimizer>,
    pub distance: Arc<dyn DistanceEstimator>,
}

impl RoutingBackend {
    pub fn mock() -> Self {
        let mock = Arc::new(MockRouting::new());
        Self {
            optimizer: mock.clone(),
            distance: mock,
        }
    }
}

/// Create routing backend based on configuration
///
/// Falls back to mock routing when no OpenRouteService key is configured.
pub fn create_routing_backend(config: Option<OrsConfig>) -> Result<RoutingBackend> {
    match config {
        Some(cfg) => {
            info!("Using OpenRouteService at {}", cfg.base_url);
            let client = Arc::new(OrsClient::new(cfg)?);
            Ok(RoutingBackend {
                optimizer: client.clone(),
                distance: client,
            })
        }
        None => {
            info!("Using mock routing service (OpenRouteService not configured)");
            Ok(RoutingBackend::mock())
        }
    }
}
