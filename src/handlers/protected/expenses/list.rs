use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Expense, ExpenseFilter, ReviewStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    pub status: Option<ReviewStatus>,
    /// Site id
    pub site: Option<Uuid>,
}

/// GET /api/expenses?status=&site= - newest first
pub async fn expenses_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ExpenseQuery>,
) -> ApiResult<Vec<Expense>> {
    let filter = ExpenseFilter {
        supervisor_id: current.visible_supervisor(),
        site_id: query.site,
        status: query.status,
    };
    Ok(ApiResponse::success(Expense::find_all(&state.pool, &filter).await?))
}

/// GET /api/expenses/:id
pub async fn expense_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Expense> {
    let expense = Expense::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;

    if !current.is_manager() && expense.supervisor_id != current.id {
        return Err(ApiError::forbidden("Not authorized to view this expense"));
    }
    Ok(ApiResponse::success(expense))
}
