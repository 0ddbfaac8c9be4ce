// handlers/protected/allocations.rs - fund grants and supervisor balances

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Allocation, Expense, Role, StatusTotal, User};
use crate::error::ApiError;
use crate::ledger::{self, BalanceSummary, ExpenseTotals};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct NewAllocation {
    pub supervisor_id: Uuid,
    pub amount: Decimal,
    #[serde(default, with = "crate::types::entry_date")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub supervisor_id: Option<Uuid>,
}

/// GET /api/allocations - managers see all, supervisors their own
pub async fn allocations_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Vec<Allocation>> {
    let allocations = Allocation::find_all(&state.pool, current.visible_supervisor()).await?;
    Ok(ApiResponse::success(allocations))
}

/// POST /api/allocations
pub async fn allocations_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewAllocation>,
) -> ApiResult<Allocation> {
    current.require_manager()?;
    if payload.amount <= Decimal::ZERO {
        return Err(ApiError::invalid_field("amount", "Amount must be greater than zero"));
    }

    match User::find_active_by_id(&state.pool, payload.supervisor_id).await? {
        Some(user) if user.role == Role::Supervisor => {}
        Some(_) => {
            return Err(ApiError::invalid_field(
                "supervisor_id",
                "Funds can only be allocated to supervisors",
            ))
        }
        None => return Err(ApiError::invalid_field("supervisor_id", "Supervisor not found")),
    }

    let allocation = Allocation::create(
        &state.pool,
        payload.supervisor_id,
        payload.amount,
        payload.date.unwrap_or_else(Utc::now),
        current.id,
    )
    .await?;

    tracing::info!(
        "'{}' allocated {} to '{}'",
        current.username,
        allocation.amount,
        allocation.supervisor_username
    );
    Ok(ApiResponse::created(allocation))
}

/// GET /api/allocations/balance?supervisor_id=
pub async fn balance_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<BalanceSummary> {
    let supervisor_id = match current.role {
        Role::Supervisor => current.id,
        Role::Manager => query.supervisor_id.ok_or_else(|| {
            ApiError::invalid_field("supervisor_id", "supervisor_id is required")
        })?,
    };

    let (allocations, status_totals) = futures::try_join!(
        Allocation::find_all(&state.pool, Some(supervisor_id)),
        Expense::status_totals(&state.pool, Some(supervisor_id)),
    )?;

    let summary = summarize(allocations.iter().map(|a| a.amount), &status_totals)?;
    Ok(ApiResponse::success(summary))
}

fn summarize<I>(allocated: I, status_totals: &[StatusTotal]) -> Result<BalanceSummary, ApiError>
where
    I: IntoIterator<Item = Decimal>,
{
    let totals = ExpenseTotals::from_status_totals(status_totals);
    ledger::sum(allocated)
        .and_then(|allocated| BalanceSummary::new(allocated, &totals))
        .ok_or_else(|| ApiError::invalid_field("supervisor_id", "Amount too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ReviewStatus;
    use axum::http::StatusCode;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn balance_is_allocated_minus_approved() {
        let totals = vec![StatusTotal {
            status: ReviewStatus::Approved,
            total: d("700"),
            count: 2,
        }];
        let summary = summarize(vec![d("500"), d("500")], &totals).unwrap();
        assert_eq!(summary.balance, d("300"));
    }

    #[test]
    fn overflowing_allocations_are_a_bad_request() {
        let err = summarize(vec![Decimal::MAX, Decimal::MAX], &[]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_json()["field_errors"]["supervisor_id"], "Amount too large");
    }
}
