//! Planning errors

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by the planning operations
///
/// Validation variants are raised before any clustering or routing work starts.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("at least one team is required")]
    NoTeams,

    #[error("{vehicles} vehicles given for {teams} teams")]
    VehicleCountMismatch { teams: usize, vehicles: usize },

    #[error("custom strategy requires desired sizes")]
    MissingDesiredSizes,

    #[error("expected {expected} desired sizes (one per team), got {actual}")]
    DesiredSizesLength { expected: usize, actual: usize },

    #[error("desired sizes add up to {actual}, expected {expected} points")]
    DesiredSizesSum { expected: usize, actual: usize },

    #[error("cluster {cluster} asks for {size} points, ceiling is {ceiling}")]
    CeilingExceeded { cluster: usize, size: usize, ceiling: usize },

    #[error("a journée already exists for {0}")]
    DayAlreadyPlanned(NaiveDate),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl PlanningError {
    /// Stable code sent back in error responses
    pub fn code(&self) -> &'static str {
        match self {
            PlanningError::NoTeams
            | PlanningError::VehicleCountMismatch { .. }
            | PlanningError::MissingDesiredSizes
            | PlanningError::DesiredSizesLength { .. }
            | PlanningError::DesiredSizesSum { .. }
            | PlanningError::CeilingExceeded { .. } => "VALIDATION_ERROR",
            PlanningError::DayAlreadyPlanned(_) => "DAY_ALREADY_PLANNED",
            PlanningError::Store(_) => "STORE_ERROR",
        }
    }

    pub fn is_validation(&self) -> bool {
        self.code() == "VALIDATION_ERROR"
    }
}
