//! OpenRouteService client
//!
//! API documentation:
//! https://openrouteservice.org/dev/#/api-docs

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DistanceEstimator, RoutingOptimizer, Waypoint};
use crate::types::{Coordinates, DeliveryPoint, Vehicle};

const PROFILE: &str = "driving-car";

/// OpenRouteService client configuration
#[derive(Debug, Clone)]
pub struct OrsConfig {
    /// Base URL (e.g., "https://api.openrouteservice.org")
    pub base_url: String,
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl OrsConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_seconds: 30,
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// OpenRouteService routing client
pub struct OrsClient {
    client: Client,
    config: OrsConfig,
}

impl OrsClient {
    pub fn new(config: OrsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Single-vehicle optimization problem starting and ending at the depot
    fn build_optimization_request(
        depot: Coordinates,
        points: &[DeliveryPoint],
    ) -> OptimizationRequest {
        OptimizationRequest {
            vehicles: vec![OrsVehicle {
                id: 1,
                profile: PROFILE.to_string(),
                start: depot.to_lng_lat(),
                end: depot.to_lng_lat(),
                capacity: vec![points.len() as u32],
            }],
            jobs: points
                .iter()
                .enumerate()
                .map(|(i, p)| OrsJob {
                    id: i + 1,
                    location: p.coordinates().to_lng_lat(),
                    delivery: vec![1],
                })
                .collect(),
            geometry: true,
        }
    }

    async fn post<Req, Resp>(&self, path: &str, request: &Req, what: &str) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de> + Send,
    {
        let response = self
            .client
            .post(self.url(path))
            .header("Authorization", &self.config.api_key)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to OpenRouteService", what))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenRouteService {} returned error {}: {}", what, status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse OpenRouteService {} response", what))
    }
}

#[async_trait]
impl RoutingOptimizer for OrsClient {
    async fn optimize(
        &self,
        depot: Coordinates,
        points: &[DeliveryPoint],
        vehicle: &Vehicle,
    ) -> Result<Vec<Waypoint>> {
        let request = Self::build_optimization_request(depot, points);

        debug!(
            "Requesting optimization from OpenRouteService: {} jobs, vehicle {}",
            points.len(),
            vehicle.code
        );

        let response: OptimizationResponse = self.post("optimization", &request, "optimization").await?;

        if !response.unassigned.is_empty() {
            warn!(
                "OpenRouteService left {} jobs unassigned for vehicle {}",
                response.unassigned.len(),
                vehicle.code
            );
        }

        match response.routes.into_iter().next() {
            Some(route) => steps_to_waypoints(route.steps, points.len()),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "OpenRouteService"
    }
}

#[async_trait]
impl DistanceEstimator for OrsClient {
    async fn distance_km(&self, path: &[Coordinates]) -> Result<f64> {
        if path.len() < 2 {
            return Ok(0.0);
        }

        let request = DirectionsRequest {
            coordinates: path.iter().map(|c| c.to_lng_lat()).collect(),
        };

        debug!("Requesting directions from OpenRouteService for {} coordinates", path.len());

        let response: DirectionsResponse = self
            .post(&format!("v2/directions/{}/geojson", PROFILE), &request, "directions")
            .await?;

        let feature = response
            .features
            .into_iter()
            .next()
            .context("OpenRouteService directions returned no route")?;

        Ok(feature.properties.summary.distance / 1000.0)
    }
}

/// Convert optimization steps into waypoints.
///
/// Job ids are 1-based positions in the request; anything other than start,
/// job and end steps is skipped.
fn steps_to_waypoints(steps: Vec<OrsStep>, job_count: usize) -> Result<Vec<Waypoint>> {
    let mut waypoints = Vec::with_capacity(steps.len());

    for step in steps {
        let coordinates = Coordinates::from_lng_lat(step.location);
        match step.step_type.as_str() {
            "start" => waypoints.push(Waypoint::start(coordinates)),
            "end" => waypoints.push(Waypoint::end(coordinates)),
            "job" => {
                let id = step.job.context("OpenRouteService job step without job id")?;
                if id == 0 || id > job_count {
                    anyhow::bail!("OpenRouteService returned unknown job id {}", id);
                }
                waypoints.push(Waypoint::job(coordinates, id - 1));
            }
            other => debug!("Skipping OpenRouteService step of type {}", other),
        }
    }

    Ok(waypoints)
}

// OpenRouteService API types

#[derive(Debug, Serialize)]
struct OptimizationRequest {
    vehicles: Vec<OrsVehicle>,
    jobs: Vec<OrsJob>,
    geometry: bool,
}

#[derive(Debug, Serialize)]
struct OrsVehicle {
    id: u32,
    profile: String,
    start: [f64; 2],
    end: [f64; 2],
    capacity: Vec<u32>,
}

#[derive(Debug, Serialize)]
struct OrsJob {
    id: usize,
    location: [f64; 2],
    delivery: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct OptimizationResponse {
    #[serde(default)]
    routes: Vec<OrsRoute>,
    #[serde(default)]
    unassigned: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OrsRoute {
    #[serde(default)]
    steps: Vec<OrsStep>,
}

#[derive(Debug, Deserialize)]
struct OrsStep {
    #[serde(rename = "type")]
    step_type: String,
    location: [f64; 2],
    job: Option<usize>,
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<DirectionsFeature>,
}

#[derive(Debug, Deserialize)]
struct DirectionsFeature {
    properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    summary: RouteSummary,
}

#[derive(Debug, Deserialize)]
struct RouteSummary {
    /// Metres; omitted for zero-length routes
    #[serde(default)]
    distance: f64,
}
