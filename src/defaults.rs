use chrono::{Days, NaiveDate};

use crate::types::Coordinates;

/// Hard ceiling of delivery points per team
pub const MAX_PER_CLUSTER: usize = 50;

pub const KMEANS_MAX_ITERATIONS: usize = 100;

/// Squared-distance threshold under which a centroid is considered still
pub const KMEANS_TOLERANCE: f64 = 1e-6;

pub const AVERAGE_SPEED_KMH: f64 = 40.0;

/// Handling time spent at each delivery stop
pub const HANDLING_MINUTES_PER_STOP: f64 = 10.0;

pub const TOURNEE_PREFIX: &str = "TRN";
pub const TOURNEE_PADDING: usize = 3;

pub const JOURNEE_PREFIX: &str = "JRN";
pub const JOURNEE_PADDING: usize = 8;

/// Warehouse the routes start from and return to
pub const fn default_depot() -> Coordinates {
    Coordinates::new(45.14852, 5.7369725)
}

/// Plans are prepared for the next day
pub fn default_planning_date(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}
