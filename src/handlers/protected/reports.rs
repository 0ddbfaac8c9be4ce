// handlers/protected/reports.rs - manager dashboard figures

use axum::{extract::State, Extension};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::app::AppState;
use crate::database::models::{Allocation, Attendance, Expense, ReviewStatus};
use crate::ledger::ExpenseTotals;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_allocated: Decimal,
    pub approved_expense_total: Decimal,
    pub pending_expense_count: i64,
    pub pending_attendance_count: i64,
}

/// GET /api/reports/summary
pub async fn summary_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Summary> {
    current.require_manager()?;

    let (total_allocated, status_totals, pending_attendance_count) = futures::try_join!(
        Allocation::total(&state.pool, None),
        Expense::status_totals(&state.pool, None),
        Attendance::count_with_status(&state.pool, ReviewStatus::Pending),
    )?;
    let totals = ExpenseTotals::from_status_totals(&status_totals);

    Ok(ApiResponse::success(Summary {
        total_allocated,
        approved_expense_total: totals.approved_amount,
        pending_expense_count: totals.pending_count,
        pending_attendance_count,
    }))
}
