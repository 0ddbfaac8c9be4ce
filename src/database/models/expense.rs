use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgExecutor, PgPool, Type};
use uuid::Uuid;

use crate::database::DatabaseError;

/// Review state shared by expenses and attendance entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "review_status")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "Pending",
            ReviewStatus::Approved => "Approved",
            ReviewStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Material expense joined with the submitting supervisor's username and the site name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub supervisor_id: Uuid,
    pub supervisor_username: String,
    pub site_id: Uuid,
    pub site_name: String,
    pub material_id: Option<Uuid>,
    pub material_name: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub total_amount: Decimal,
    pub bill_number: Option<String>,
    pub bill_name: Option<String>,
    pub bill_type: Option<String>,
    pub status: ReviewStatus,
    pub rejection_reason: String,
    pub is_price_changed: bool,
    pub date: DateTime<Utc>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully computed expense content, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub site_id: Uuid,
    pub material_id: Option<Uuid>,
    pub material_name: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub total_amount: Decimal,
    pub bill_number: Option<String>,
    pub bill_name: Option<String>,
    pub bill_type: Option<String>,
    pub is_price_changed: bool,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub supervisor_id: Option<Uuid>,
    pub site_id: Option<Uuid>,
    pub status: Option<ReviewStatus>,
}

/// Aggregate of expense totals for one status
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StatusTotal {
    pub status: ReviewStatus,
    pub total: Decimal,
    pub count: i64,
}

const EXPENSE_SELECT: &str = "SELECT e.id, e.supervisor_id, u.username AS supervisor_username,
        e.site_id, s.name AS site_name, e.material_id, e.material_name,
        e.quantity, e.price_per_unit, e.total_amount,
        e.bill_number, e.bill_name, e.bill_type,
        e.status, e.rejection_reason, e.is_price_changed, e.date,
        e.reviewed_by, e.reviewed_at, e.created_at, e.updated_at
    FROM expenses e
    JOIN users u ON u.id = e.supervisor_id
    JOIN sites s ON s.id = e.site_id";

impl Expense {
    pub async fn find_all(pool: &PgPool, filter: &ExpenseFilter) -> Result<Vec<Self>, DatabaseError> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            "{}
             WHERE ($1::uuid IS NULL OR e.supervisor_id = $1)
               AND ($2::uuid IS NULL OR e.site_id = $2)
               AND ($3::review_status IS NULL OR e.status = $3)
             ORDER BY e.created_at DESC",
            EXPENSE_SELECT
        ))
        .bind(filter.supervisor_id)
        .bind(filter.site_id)
        .bind(filter.status)
        .fetch_all(pool)
        .await?;
        Ok(expenses)
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, DatabaseError> {
        let expense = sqlx::query_as::<_, Expense>(&format!("{} WHERE e.id = $1", EXPENSE_SELECT))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(expense)
    }

    /// Read the expense and hold a row lock on it until the surrounding transaction ends
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, DatabaseError> {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            "{} WHERE e.id = $1 FOR UPDATE OF e",
            EXPENSE_SELECT
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(expense)
    }

    pub async fn create(
        pool: &PgPool,
        supervisor_id: Uuid,
        draft: &ExpenseDraft,
    ) -> Result<Self, DatabaseError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO expenses (
                id, supervisor_id, site_id, material_id, material_name,
                quantity, price_per_unit, total_amount,
                bill_number, bill_name, bill_type, is_price_changed, date, status
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'Pending')",
        )
        .bind(id)
        .bind(supervisor_id)
        .bind(draft.site_id)
        .bind(draft.material_id)
        .bind(&draft.material_name)
        .bind(draft.quantity)
        .bind(draft.price_per_unit)
        .bind(draft.total_amount)
        .bind(draft.bill_number.as_deref())
        .bind(draft.bill_name.as_deref())
        .bind(draft.bill_type.as_deref())
        .bind(draft.is_price_changed)
        .bind(draft.date)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Expense not found".to_string()))
    }

    /// Write a review outcome. Runs inside the caller's transaction.
    pub async fn set_review(
        conn: &mut PgConnection,
        id: Uuid,
        status: ReviewStatus,
        rejection_reason: &str,
        reviewer: Uuid,
    ) -> Result<Self, DatabaseError> {
        sqlx::query(
            "UPDATE expenses
             SET status = $2, rejection_reason = $3, reviewed_by = $4,
                 reviewed_at = now(), updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(rejection_reason)
        .bind(reviewer)
        .execute(&mut *conn)
        .await?;

        Self::find_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Expense not found".to_string()))
    }

    /// Replace the content of a rejected expense and send it back to Pending.
    /// Returns `None` when the row is no longer rejected or belongs to someone else.
    pub async fn resubmit(
        pool: &PgPool,
        id: Uuid,
        supervisor_id: Uuid,
        draft: &ExpenseDraft,
    ) -> Result<Option<Self>, DatabaseError> {
        let result = sqlx::query(
            "UPDATE expenses
             SET site_id = $3, material_id = $4, material_name = $5,
                 quantity = $6, price_per_unit = $7, total_amount = $8,
                 bill_number = $9, bill_name = $10, bill_type = $11,
                 is_price_changed = $12, date = $13,
                 status = 'Pending', rejection_reason = '',
                 reviewed_by = NULL, reviewed_at = NULL, updated_at = now()
             WHERE id = $1 AND supervisor_id = $2 AND status = 'Rejected'",
        )
        .bind(id)
        .bind(supervisor_id)
        .bind(draft.site_id)
        .bind(draft.material_id)
        .bind(&draft.material_name)
        .bind(draft.quantity)
        .bind(draft.price_per_unit)
        .bind(draft.total_amount)
        .bind(draft.bill_number.as_deref())
        .bind(draft.bill_name.as_deref())
        .bind(draft.bill_type.as_deref())
        .bind(draft.is_price_changed)
        .bind(draft.date)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    /// Per-status sums and counts, for one supervisor or everyone
    pub async fn status_totals(
        pool: &PgPool,
        supervisor_id: Option<Uuid>,
    ) -> Result<Vec<StatusTotal>, DatabaseError> {
        let totals = sqlx::query_as::<_, StatusTotal>(
            "SELECT status, COALESCE(SUM(total_amount), 0) AS total, COUNT(*) AS count
             FROM expenses
             WHERE ($1::uuid IS NULL OR supervisor_id = $1)
             GROUP BY status",
        )
        .bind(supervisor_id)
        .fetch_all(pool)
        .await?;
        Ok(totals)
    }

    /// The draft this expense was written from, used as the base for resubmission
    pub fn to_draft(&self) -> ExpenseDraft {
        ExpenseDraft {
            site_id: self.site_id,
            material_id: self.material_id,
            material_name: self.material_name.clone(),
            quantity: self.quantity,
            price_per_unit: self.price_per_unit,
            total_amount: self.total_amount,
            bill_number: self.bill_number.clone(),
            bill_name: self.bill_name.clone(),
            bill_type: self.bill_type.clone(),
            is_price_changed: self.is_price_changed,
            date: self.date,
        }
    }
}
