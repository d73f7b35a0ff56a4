//! Planning request/response types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Coordinates, DeliveryPoint, PlanTotals, Team, Tournee, Vehicle};

/// Cluster size policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Sizes differ by at most one
    #[default]
    Balanced,
    /// Sizes match `desired_sizes`
    Custom,
}

/// Request to split delivery points into tournées
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRequest {
    pub points: Vec<DeliveryPoint>,
    pub teams: Vec<Team>,
    /// Aligned 1:1 with `teams`
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub strategy: Strategy,
    /// Required for the custom strategy, one entry per team
    #[serde(default)]
    pub desired_sizes: Option<Vec<usize>>,
    /// Falls back to the configured depot
    #[serde(default)]
    pub depot: Option<Coordinates>,
}

/// Clustering diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringReport {
    pub iterations: usize,
    pub converged: bool,
    /// Point count per cluster after rebalancing
    pub cluster_sizes: Vec<usize>,
}

/// Result of a planning run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningOutcome {
    pub tournees: Vec<Tournee>,
    pub totals: PlanTotals,
    pub clustering: ClusteringReport,
    /// Points left out because every cluster was full
    pub unassigned_point_ids: Vec<String>,
    /// Non-empty clusters for which no route could be obtained
    pub skipped_clusters: Vec<usize>,
}

/// Request to validate (persist) a planned day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDayRequest {
    /// Defaults to tomorrow
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub planner_email: String,
    pub tournees: Vec<Tournee>,
}

/// Request to load a persisted day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadDayRequest {
    /// Defaults to tomorrow
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Points still to be planned (request and response)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsPayload {
    pub points: Vec<DeliveryPoint>,
}
