//! Journée database queries

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::services::store::{JourneeStore, JourneyLookup, JourneyPersister, ReferenceStore};
use crate::types::{Coordinates, Journee, Tournee, TourneeStatus};

#[derive(Debug, FromRow)]
struct JourneeRow {
    reference: String,
    day: NaiveDate,
    planner_email: String,
    total_cost: i64,
}

#[derive(Debug, FromRow)]
struct TourneeRow {
    reference: String,
    journee_reference: String,
    letter: String,
    status: TourneeStatus,
    team_id: i64,
    vehicle_code: String,
    point_ids: Vec<String>,
    path: Json<Vec<Coordinates>>,
    distance_km: f64,
    duration_minutes: i64,
    cost: i64,
    assembly_minutes: i64,
}

impl From<TourneeRow> for Tournee {
    fn from(row: TourneeRow) -> Self {
        Tournee {
            reference: row.reference,
            letter: row.letter,
            status: row.status,
            team_id: row.team_id,
            vehicle_code: row.vehicle_code,
            point_ids: row.point_ids,
            path: row.path.0,
            distance_km: row.distance_km,
            duration_minutes: row.duration_minutes,
            cost: row.cost,
            assembly_minutes: row.assembly_minutes,
            journee_reference: row.journee_reference,
        }
    }
}

impl JourneeRow {
    fn into_journee(self, tournees: Vec<TourneeRow>) -> Journee {
        Journee {
            reference: self.reference,
            date: self.day,
            planner_email: self.planner_email,
            total_cost: self.total_cost,
            tournees: tournees.into_iter().map(Tournee::from).collect(),
        }
    }
}

/// PostgreSQL-backed journée store
pub struct PgJourneeStore {
    pool: PgPool,
}

impl PgJourneeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tournees_of(&self, journee_reference: &str) -> Result<Vec<TourneeRow>> {
        let rows = sqlx::query_as::<_, TourneeRow>(
            r#"
            SELECT reference, journee_reference, letter, status, team_id, vehicle_code,
                   point_ids, path, distance_km, duration_minutes, cost, assembly_minutes
            FROM tournees
            WHERE journee_reference = $1
            ORDER BY position ASC
            "#,
        )
        .bind(journee_reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl ReferenceStore for PgJourneeStore {
    async fn existing_references(&self, prefix: &str) -> Result<Vec<String>> {
        let references = sqlx::query_scalar::<_, String>(
            r#"
            SELECT reference FROM journees WHERE reference LIKE $1
            UNION ALL
            SELECT reference FROM tournees WHERE reference LIKE $1
            "#,
        )
        .bind(format!("{}%", prefix))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list existing references")?;

        Ok(references)
    }
}

#[async_trait]
impl JourneyPersister for PgJourneeStore {
    async fn save(&self, journee: &Journee) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO journees (reference, day, planner_email, total_cost)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&journee.reference)
        .bind(journee.date)
        .bind(&journee.planner_email)
        .bind(journee.total_cost)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert journée {}", journee.reference))?;

        for (position, tournee) in journee.tournees.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO tournees (reference, journee_reference, position, letter, status,
                                      team_id, vehicle_code, point_ids, path, distance_km,
                                      duration_minutes, cost, assembly_minutes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(&tournee.reference)
            .bind(&journee.reference)
            .bind(position as i32)
            .bind(&tournee.letter)
            .bind(tournee.status)
            .bind(tournee.team_id)
            .bind(&tournee.vehicle_code)
            .bind(&tournee.point_ids)
            .bind(Json(&tournee.path))
            .bind(tournee.distance_km)
            .bind(tournee.duration_minutes)
            .bind(tournee.cost)
            .bind(tournee.assembly_minutes)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert tournée {}", tournee.reference))?;
        }

        tx.commit().await?;
        debug!(
            "Saved journée {} with {} tournées",
            journee.reference,
            journee.tournees.len()
        );
        Ok(())
    }
}

#[async_trait]
impl JourneyLookup for PgJourneeStore {
    async fn find_by_date(&self, date: NaiveDate) -> Result<Option<Journee>> {
        let row = sqlx::query_as::<_, JourneeRow>(
            r#"
            SELECT reference, day, planner_email, total_cost
            FROM journees
            WHERE day = $1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let tournees = self.tournees_of(&row.reference).await?;
                Ok(Some(row.into_journee(tournees)))
            }
            None => Ok(None),
        }
    }

    async fn planned_point_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT DISTINCT unnest(point_ids) FROM tournees")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}

impl JourneeStore for PgJourneeStore {
    fn name(&self) -> &str {
        "postgres"
    }
}
