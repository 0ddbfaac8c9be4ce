use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::expense::ReviewStatus;
use crate::database::DatabaseError;

/// Labour days and wages a supervisor reports for payment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub supervisor_id: Uuid,
    pub date: DateTime<Utc>,
    pub number_of_days: Decimal,
    pub wage_per_day: Decimal,
    pub total_amount: Decimal,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ATTENDANCE_COLUMNS: &str =
    "id, supervisor_id, date, number_of_days, wage_per_day, total_amount, status, created_at, updated_at";

impl Attendance {
    pub async fn find_all(
        pool: &PgPool,
        supervisor_id: Option<Uuid>,
    ) -> Result<Vec<Self>, DatabaseError> {
        let entries = sqlx::query_as::<_, Attendance>(&format!(
            "SELECT {} FROM attendance
             WHERE ($1::uuid IS NULL OR supervisor_id = $1)
             ORDER BY date DESC",
            ATTENDANCE_COLUMNS
        ))
        .bind(supervisor_id)
        .fetch_all(pool)
        .await?;
        Ok(entries)
    }

    pub async fn create(
        pool: &PgPool,
        supervisor_id: Uuid,
        number_of_days: Decimal,
        wage_per_day: Decimal,
        total_amount: Decimal,
        date: DateTime<Utc>,
    ) -> Result<Self, DatabaseError> {
        let entry = sqlx::query_as::<_, Attendance>(&format!(
            "INSERT INTO attendance (id, supervisor_id, number_of_days, wage_per_day, total_amount, date, status)
             VALUES ($1, $2, $3, $4, $5, $6, 'Pending')
             RETURNING {}",
            ATTENDANCE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(supervisor_id)
        .bind(number_of_days)
        .bind(wage_per_day)
        .bind(total_amount)
        .bind(date)
        .fetch_one(pool)
        .await?;
        Ok(entry)
    }

    pub async fn set_status(pool: &PgPool, id: Uuid, status: ReviewStatus) -> Result<Self, DatabaseError> {
        sqlx::query_as::<_, Attendance>(&format!(
            "UPDATE attendance SET status = $2, updated_at = now() WHERE id = $1 RETURNING {}",
            ATTENDANCE_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Attendance entry not found".to_string()))
    }

    pub async fn count_with_status(pool: &PgPool, status: ReviewStatus) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attendance WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
