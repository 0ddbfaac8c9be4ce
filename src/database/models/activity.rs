use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyActivity {
    pub id: Uuid,
    pub supervisor_id: Uuid,
    pub date: DateTime<Utc>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ACTIVITY_COLUMNS: &str = "id, supervisor_id, date, description, created_at, updated_at";

impl DailyActivity {
    pub async fn find_all(
        pool: &PgPool,
        supervisor_id: Option<Uuid>,
    ) -> Result<Vec<Self>, DatabaseError> {
        let activities = sqlx::query_as::<_, DailyActivity>(&format!(
            "SELECT {} FROM daily_activities
             WHERE ($1::uuid IS NULL OR supervisor_id = $1)
             ORDER BY date DESC",
            ACTIVITY_COLUMNS
        ))
        .bind(supervisor_id)
        .fetch_all(pool)
        .await?;
        Ok(activities)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, DatabaseError> {
        let activity = sqlx::query_as::<_, DailyActivity>(&format!(
            "SELECT {} FROM daily_activities WHERE id = $1",
            ACTIVITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(activity)
    }

    pub async fn create(
        pool: &PgPool,
        supervisor_id: Uuid,
        description: &str,
        date: DateTime<Utc>,
    ) -> Result<Self, DatabaseError> {
        let activity = sqlx::query_as::<_, DailyActivity>(&format!(
            "INSERT INTO daily_activities (id, supervisor_id, description, date)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            ACTIVITY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(supervisor_id)
        .bind(description)
        .bind(date)
        .fetch_one(pool)
        .await?;
        Ok(activity)
    }

    /// Delete only when `supervisor_id` authored the entry; returns whether a row went away
    pub async fn delete_owned(
        pool: &PgPool,
        id: Uuid,
        supervisor_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM daily_activities WHERE id = $1 AND supervisor_id = $2")
            .bind(id)
            .bind(supervisor_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
