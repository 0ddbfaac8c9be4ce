use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Expense;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::{resubmit_expense, ExpenseInput};

/// PUT /api/expenses/:id - the submitter edits a Rejected expense, which goes back to Pending
pub async fn expense_put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<Expense> {
    let expense = resubmit_expense(&state.pool, id, current.id, &input).await?;
    Ok(ApiResponse::success(expense))
}
