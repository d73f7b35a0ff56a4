//! Planning message handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subject, Subscriber};
use chrono::{NaiveDate, Utc};
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::defaults::default_planning_date;
use crate::error::PlanningError;
use crate::services::planning::PlanningOrchestrator;
use crate::types::{
    ErrorResponse, LoadDayRequest, PlanningRequest, PointsPayload, Request, SuccessResponse,
    ValidateDayRequest,
};

/// Day planned when a request names none
fn planning_date() -> NaiveDate {
    default_planning_date(Utc::now().date_naive())
}

async fn reply_success<T: Serialize>(client: &Client, reply: Subject, id: Uuid, payload: T) -> Result<()> {
    let response = SuccessResponse::new(id, payload);
    let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
    Ok(())
}

async fn reply_error(
    client: &Client,
    reply: Subject,
    id: Uuid,
    code: &str,
    message: impl Into<String>,
) -> Result<()> {
    let response = ErrorResponse::new(id, code, message);
    let _ = client.publish(reply, serde_json::to_vec(&response)?.into()).await;
    Ok(())
}

async fn reply_planning_error(client: &Client, reply: Subject, id: Uuid, e: PlanningError) -> Result<()> {
    if e.is_validation() {
        warn!("Rejected request {}: {}", id, e);
    } else {
        error!("Request {} failed: {}", id, e);
    }
    reply_error(client, reply, id, e.code(), e.to_string()).await
}

/// Handle tournees.plan requests
pub async fn handle_plan(
    client: Client,
    mut subscriber: Subscriber,
    planner: Arc<PlanningOrchestrator>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received plan message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                error!("Plan message without reply subject");
                continue;
            }
        };

        let request: Request<PlanningRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse plan request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        match planner.plan(&request.payload).await {
            Ok(outcome) => reply_success(&client, reply, request.id, outcome).await?,
            Err(e) => reply_planning_error(&client, reply, request.id, e).await?,
        }
    }

    Ok(())
}

/// Handle tournees.journee.validate requests
pub async fn handle_validate_day(
    client: Client,
    mut subscriber: Subscriber,
    planner: Arc<PlanningOrchestrator>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<ValidateDayRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse validate day request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        let ValidateDayRequest { date, planner_email, tournees } = request.payload;
        let date = date.unwrap_or_else(planning_date);
        match planner.validate_day(tournees, date, &planner_email).await {
            Ok(journee) => reply_success(&client, reply, request.id, journee).await?,
            Err(e) => reply_planning_error(&client, reply, request.id, e).await?,
        }
    }

    Ok(())
}

/// Handle tournees.journee.load requests
pub async fn handle_load_day(
    client: Client,
    mut subscriber: Subscriber,
    planner: Arc<PlanningOrchestrator>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<LoadDayRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse load day request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        match planner.load_day(request.payload.date.unwrap_or_else(planning_date)).await {
            Ok(summary) => reply_success(&client, reply, request.id, summary).await?,
            Err(e) => reply_planning_error(&client, reply, request.id, e).await?,
        }
    }

    Ok(())
}

/// Handle tournees.points.remaining requests
pub async fn handle_remaining_points(
    client: Client,
    mut subscriber: Subscriber,
    planner: Arc<PlanningOrchestrator>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<PointsPayload> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse remaining points request: {}", e);
                reply_error(&client, reply, Uuid::nil(), "INVALID_REQUEST", e.to_string()).await?;
                continue;
            }
        };

        match planner.remaining_points(request.payload.points).await {
            Ok(points) => reply_success(&client, reply, request.id, PointsPayload { points }).await?,
            Err(e) => reply_planning_error(&client, reply, request.id, e).await?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeliveryPoint, Strategy};

    #[test]
    fn test_plan_request_envelope_parses() {
        let json = r#"{
            "id": "7f1c2a64-3c43-4d3a-9a3e-3f3b8a0f5b11",
            "timestamp": "2026-10-19T08:00:00Z",
            "payload": {
                "points": [{"id": "CMD0001", "lat": 45.19, "lng": 5.72}],
                "teams": [{"id": 1}],
                "vehicles": [{"code": "CAM-01", "costPerKm": 1.1}],
                "strategy": "custom",
                "desiredSizes": [1]
            }
        }"#;

        let request: Request<PlanningRequest> = serde_json::from_str(json).unwrap();

        assert_eq!(request.payload.strategy, Strategy::Custom);
        assert_eq!(request.payload.desired_sizes, Some(vec![1]));
    }

    #[test]
    fn test_validate_day_envelope_parses() {
        let json = r#"{
            "id": "7f1c2a64-3c43-4d3a-9a3e-3f3b8a0f5b11",
            "timestamp": "2026-10-19T08:00:00Z",
            "payload": {"date": "2026-10-20", "plannerEmail": "planner@example.com", "tournees": []}
        }"#;

        let request: Request<ValidateDayRequest> = serde_json::from_str(json).unwrap();

        assert_eq!(request.payload.planner_email, "planner@example.com");
        assert_eq!(request.payload.date, NaiveDate::from_ymd_opt(2026, 10, 20));
        assert!(request.payload.tournees.is_empty());
    }

    #[test]
    fn test_load_day_without_date_defaults_to_tomorrow() {
        let json = r#"{
            "id": "7f1c2a64-3c43-4d3a-9a3e-3f3b8a0f5b11",
            "timestamp": "2026-10-19T08:00:00Z",
            "payload": {}
        }"#;

        let request: Request<LoadDayRequest> = serde_json::from_str(json).unwrap();

        assert!(request.payload.date.is_none());
        assert!(planning_date() > Utc::now().date_naive());
    }

    #[test]
    fn test_planning_error_response_shape() {
        let err = PlanningError::VehicleCountMismatch { teams: 2, vehicles: 1 };
        let response = ErrorResponse::new(Uuid::nil(), err.code(), err.to_string());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "1 vehicles given for 2 teams");
    }

    #[test]
    fn test_remaining_points_response_shape() {
        let request_id = Uuid::new_v4();
        let response = SuccessResponse::new(
            request_id,
            PointsPayload {
                points: vec![DeliveryPoint::new("CMD0001", 45.19, 5.72)],
            },
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["id"], request_id.to_string());
        assert_eq!(json["payload"]["points"][0]["id"], "CMD0001");
    }
}
