use axum::{extract::State, Extension, Json};

use crate::app::AppState;
use crate::database::models::Expense;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::{submit_expense, ExpenseInput};

/// POST /api/expenses - managers and supervisors may submit; the entry starts Pending
pub async fn expenses_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<Expense> {
    let expense = submit_expense(&state.pool, current.id, &input).await?;
    Ok(ApiResponse::created(expense))
}
