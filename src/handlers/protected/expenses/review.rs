use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Expense;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::{review_expense, PgReviewTransaction, ReviewDecision, Reviewer};

/// PUT /api/expenses/:id/status - `{status: Approved|Rejected, rejection_reason?}`
///
/// Approval only sticks once the spreadsheet append succeeded; a sink
/// failure answers 502 and leaves the expense Pending.
pub async fn status_put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(decision): Json<ReviewDecision>,
) -> ApiResult<Expense> {
    current.require_manager()?;

    let reviewer = Reviewer {
        id: current.id,
        username: current.username.clone(),
    };
    let tx = PgReviewTransaction::begin(&state.pool).await?;
    let expense = review_expense(tx, state.sheets.as_ref(), id, &decision, &reviewer).await?;
    Ok(ApiResponse::success(expense))
}
