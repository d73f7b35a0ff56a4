//! Tournée and journée types

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Tournée status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "tournee_status", rename_all = "snake_case")]
pub enum TourneeStatus {
    InProgress,
    Planned,
    Completed,
}

/// Priced delivery round for one team on one planning day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournee {
    /// Sequential reference ("TRN001", "TRN002", ...)
    pub reference: String,
    /// Display letter derived from the cluster slot ('A' for the first team)
    pub letter: String,
    pub status: TourneeStatus,
    pub team_id: i64,
    pub vehicle_code: String,
    /// Delivered point ids in visiting order
    pub point_ids: Vec<String>,
    /// Depot → stops → depot, as returned by the optimizer
    #[serde(default)]
    pub path: Vec<Coordinates>,
    pub distance_km: f64,
    pub duration_minutes: i64,
    pub cost: i64,
    /// Measured loading time, unknown at planning time
    #[serde(default)]
    pub assembly_minutes: i64,
    /// Empty until the day is validated
    #[serde(default)]
    pub journee_reference: String,
}

impl Tournee {
    pub fn deliveries(&self) -> usize {
        self.point_ids.len()
    }
}

/// Letter shown for a cluster slot: 0 → "A", 1 → "B", ...
pub fn slot_letter(cluster: usize) -> String {
    char::from_u32('A' as u32 + cluster as u32)
        .map(String::from)
        .unwrap_or_else(|| format!("#{}", cluster + 1))
}

/// Validated planning day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journee {
    /// Sequential reference ("JRN00000001", ...)
    pub reference: String,
    pub date: NaiveDate,
    pub planner_email: String,
    pub total_cost: i64,
    pub tournees: Vec<Tournee>,
}

/// Aggregate figures over a set of tournées
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTotals {
    pub total_distance_km: f64,
    pub total_cost: i64,
}

impl PlanTotals {
    pub fn from_tournees(tournees: &[Tournee]) -> Self {
        tournees.iter().fold(Self::default(), |acc, t| Self {
            total_distance_km: acc.total_distance_km + t.distance_km,
            total_cost: acc.total_cost + t.cost,
        })
    }
}

/// Per-team figures of a tournée
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub distance_km: f64,
    pub deliveries: usize,
    pub duration_minutes: i64,
    pub cost: i64,
}

/// A persisted day with its per-team figures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub journee: Journee,
    pub stats: BTreeMap<i64, TeamStats>,
}

impl DaySummary {
    /// Figures are summed over the tournées of each team
    pub fn from_journee(journee: Journee) -> Self {
        let mut stats: BTreeMap<i64, TeamStats> = BTreeMap::new();
        for t in &journee.tournees {
            let entry = stats.entry(t.team_id).or_insert(TeamStats {
                distance_km: 0.0,
                deliveries: 0,
                duration_minutes: 0,
                cost: 0,
            });
            entry.distance_km += t.distance_km;
            entry.deliveries += t.deliveries();
            entry.duration_minutes += t.duration_minutes;
            entry.cost += t.cost;
        }

        Self { journee, stats }
    }
}
