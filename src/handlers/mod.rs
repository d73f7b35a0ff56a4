//! NATS message handlers

pub mod ping;
pub mod planning;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use tokio::select;
use tracing::{error, info};

use crate::services::planning::PlanningOrchestrator;

pub const SUBJECT_PING: &str = "tournees.ping";
pub const SUBJECT_PLAN: &str = "tournees.plan";
pub const SUBJECT_VALIDATE_DAY: &str = "tournees.journee.validate";
pub const SUBJECT_LOAD_DAY: &str = "tournees.journee.load";
pub const SUBJECT_REMAINING_POINTS: &str = "tournees.points.remaining";

/// Start all message handlers
pub async fn start_handlers(
    client: Client,
    planner: Arc<PlanningOrchestrator>,
    store_name: String,
) -> Result<()> {
    info!("Starting message handlers...");

    // Subscribe to all subjects
    let ping_sub = client.subscribe(SUBJECT_PING).await?;
    let plan_sub = client.subscribe(SUBJECT_PLAN).await?;
    let validate_sub = client.subscribe(SUBJECT_VALIDATE_DAY).await?;
    let load_sub = client.subscribe(SUBJECT_LOAD_DAY).await?;
    let remaining_sub = client.subscribe(SUBJECT_REMAINING_POINTS).await?;

    info!(
        "Subscribed to {}, {}, {}, {}, {}",
        SUBJECT_PING, SUBJECT_PLAN, SUBJECT_VALIDATE_DAY, SUBJECT_LOAD_DAY, SUBJECT_REMAINING_POINTS
    );

    let client_ping = client.clone();
    let client_plan = client.clone();
    let client_validate = client.clone();
    let client_load = client.clone();
    let client_remaining = client;

    let planner_plan = Arc::clone(&planner);
    let planner_validate = Arc::clone(&planner);
    let planner_load = Arc::clone(&planner);
    let planner_remaining = planner;

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub, store_name).await
    });

    let plan_handle = tokio::spawn(async move {
        planning::handle_plan(client_plan, plan_sub, planner_plan).await
    });

    let validate_handle = tokio::spawn(async move {
        planning::handle_validate_day(client_validate, validate_sub, planner_validate).await
    });

    let load_handle = tokio::spawn(async move {
        planning::handle_load_day(client_load, load_sub, planner_load).await
    });

    let remaining_handle = tokio::spawn(async move {
        planning::handle_remaining_points(client_remaining, remaining_sub, planner_remaining).await
    });

    info!("All handlers started, waiting for messages...");

    // Wait for any handler to finish (which would indicate an error)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = plan_handle => {
            error!("Plan handler finished: {:?}", result);
        }
        result = validate_handle => {
            error!("Validate day handler finished: {:?}", result);
        }
        result = load_handle => {
            error!("Load day handler finished: {:?}", result);
        }
        result = remaining_handle => {
            error!("Remaining points handler finished: {:?}", result);
        }
    }

    Ok(())
}
