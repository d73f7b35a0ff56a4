//! Tournée Planner - delivery round planning worker
//!
//! Clusters the day's delivery requests per team, routes every cluster and
//! prices the resulting tournées. Requests arrive over NATS.

mod cli;
mod config;
mod db;
mod defaults;
mod error;
mod handlers;
mod services;
mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::services::planning::{suggest_desired_sizes, PlanningOrchestrator};
use crate::services::routing::create_routing_backend;
use crate::services::store::{JourneeStore, MemoryStore};
use crate::types::{PlanningRequest, Strategy};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ../logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "tournee-planner.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tournee_planner=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    info!("Configuration loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(config).await,
        Command::Plan { input, output } => plan_file(config, input, output).await,
    }
}

async fn migrate(config: Config) -> Result<()> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to run migrations")?;

    let pool = db::create_pool(database_url).await?;
    info!("Connected to PostgreSQL");
    db::run_migrations(&pool).await
}

/// PostgreSQL store when a database is configured, in-memory store otherwise
async fn create_store(config: &Config) -> Result<Arc<dyn JourneeStore>> {
    match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            info!("Connected to PostgreSQL");
            db::run_migrations(&pool).await?;
            Ok(Arc::new(db::queries::PgJourneeStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, validated days are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn create_planner(config: &Config) -> Result<(Arc<PlanningOrchestrator>, String)> {
    let store = create_store(config).await?;
    let store_name = store.name().to_string();
    info!("Store initialized: {}", store_name);

    let routing = create_routing_backend(config.ors_config())?;
    info!("Routing service initialized: {}", routing.optimizer.name());

    let planner = PlanningOrchestrator::new(
        routing.optimizer,
        routing.distance,
        store,
        config.planning_config(),
    );

    Ok((Arc::new(planner), store_name))
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Tournée Planner...");

    let (planner, store_name) = create_planner(&config).await?;

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    let handler_result = handlers::start_handlers(nats_client, planner, store_name).await;

    if let Err(e) = handler_result {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}

async fn plan_file(
    config: Config,
    input: std::path::PathBuf,
    output: Option<std::path::PathBuf>,
) -> Result<()> {
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mut request: PlanningRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse planning request {}", input.display()))?;

    if request.strategy == Strategy::Custom && request.desired_sizes.is_none() {
        let sizes = suggest_desired_sizes(&request);
        info!("No desired sizes given, using even split {:?}", sizes);
        request.desired_sizes = Some(sizes);
    }

    let (planner, _) = create_planner(&config).await?;
    let outcome = planner.plan(&request).await?;
    let json = serde_json::to_string_pretty(&outcome)?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Outcome written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
