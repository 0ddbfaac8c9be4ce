use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::DatabaseError;

/// Fund grant from a manager to a supervisor, joined with the supervisor's username
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Allocation {
    pub id: Uuid,
    pub supervisor_id: Uuid,
    pub supervisor_username: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub allocated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ALLOCATION_SELECT: &str = "SELECT a.id, a.supervisor_id, u.username AS supervisor_username,
        a.amount, a.date, a.allocated_by, a.created_at, a.updated_at
    FROM allocations a
    JOIN users u ON u.id = a.supervisor_id";

impl Allocation {
    /// All allocations, or only those granted to `supervisor_id`, newest first
    pub async fn find_all(
        pool: &PgPool,
        supervisor_id: Option<Uuid>,
    ) -> Result<Vec<Self>, DatabaseError> {
        let allocations = sqlx::query_as::<_, Allocation>(&format!(
            "{} WHERE ($1::uuid IS NULL OR a.supervisor_id = $1) ORDER BY a.date DESC",
            ALLOCATION_SELECT
        ))
        .bind(supervisor_id)
        .fetch_all(pool)
        .await?;
        Ok(allocations)
    }

    pub async fn create(
        pool: &PgPool,
        supervisor_id: Uuid,
        amount: Decimal,
        date: DateTime<Utc>,
        allocated_by: Uuid,
    ) -> Result<Self, DatabaseError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO allocations (id, supervisor_id, amount, date, allocated_by)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(supervisor_id)
        .bind(amount)
        .bind(date)
        .bind(allocated_by)
        .execute(pool)
        .await?;

        sqlx::query_as::<_, Allocation>(&format!("{} WHERE a.id = $1", ALLOCATION_SELECT))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Allocation not found".to_string()))
    }

    /// Sum of granted amounts, for one supervisor or everyone
    pub async fn total(pool: &PgPool, supervisor_id: Option<Uuid>) -> Result<Decimal, DatabaseError> {
        let (total,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) FROM allocations
             WHERE ($1::uuid IS NULL OR supervisor_id = $1)",
        )
        .bind(supervisor_id)
        .fetch_one(pool)
        .await?;
        Ok(total)
    }
}
