//! Configuration management

use std::str::FromStr;

use anyhow::{Context, Result};

use crate::defaults::{default_depot, MAX_PER_CLUSTER};
use crate::services::planning::PlanningConfig;
use crate::services::routing::OrsConfig;
use crate::types::Coordinates;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string (optional, falls back to in-memory store)
    pub database_url: Option<String>,

    /// OpenRouteService base URL
    pub ors_url: String,

    /// OpenRouteService API key (optional, falls back to mock routing)
    pub ors_api_key: Option<String>,

    /// Routing request timeout in seconds
    pub routing_timeout_seconds: u64,

    /// Warehouse every route starts from and returns to
    pub depot: Coordinates,

    /// Points per team ceiling
    pub max_per_cluster: usize,

    /// Clusters routed at the same time
    pub route_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from a variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let nats_url = var("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_string());
        let database_url = var("DATABASE_URL");
        let ors_url = var("ORS_URL").unwrap_or_else(|| "https://api.openrouteservice.org".to_string());
        let ors_api_key = var("ORS_API_KEY");

        let routing_timeout_seconds = parse_or(var("ROUTING_TIMEOUT_SECONDS"), "ROUTING_TIMEOUT_SECONDS", 30)?;
        let max_per_cluster = parse_or(var("MAX_PER_CLUSTER"), "MAX_PER_CLUSTER", MAX_PER_CLUSTER)?;
        let route_concurrency = parse_or(var("ROUTE_CONCURRENCY"), "ROUTE_CONCURRENCY", 1)?;

        let fallback = default_depot();
        let depot = Coordinates::new(
            parse_or(var("DEPOT_LAT"), "DEPOT_LAT", fallback.lat)?,
            parse_or(var("DEPOT_LNG"), "DEPOT_LNG", fallback.lng)?,
        );

        if max_per_cluster == 0 {
            anyhow::bail!("MAX_PER_CLUSTER must be at least 1");
        }
        if route_concurrency == 0 {
            anyhow::bail!("ROUTE_CONCURRENCY must be at least 1");
        }

        Ok(Self {
            nats_url,
            database_url,
            ors_url,
            ors_api_key,
            routing_timeout_seconds,
            depot,
            max_per_cluster,
            route_concurrency,
        })
    }

    /// OpenRouteService settings, if an API key is configured
    pub fn ors_config(&self) -> Option<OrsConfig> {
        self.ors_api_key.as_ref().map(|key| {
            OrsConfig::new(self.ors_url.clone(), key.clone()).with_timeout(self.routing_timeout_seconds)
        })
    }

    pub fn planning_config(&self) -> PlanningConfig {
        PlanningConfig {
            depot: self.depot,
            max_per_cluster: self.max_per_cluster,
            route_concurrency: self.route_concurrency,
            ..Default::default()
        }
    }
}

fn parse_or<T>(value: Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got {:?}", name, raw)),
        None => Ok(default),
    }
}
