// handlers/protected/activities.rs - daily work log

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::required_text;
use crate::app::AppState;
use crate::database::models::DailyActivity;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct NewActivity {
    pub description: String,
    #[serde(default, with = "crate::types::entry_date")]
    pub date: Option<DateTime<Utc>>,
}

/// GET /api/activities
pub async fn activities_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Vec<DailyActivity>> {
    let activities = DailyActivity::find_all(&state.pool, current.visible_supervisor()).await?;
    Ok(ApiResponse::success(activities))
}

/// POST /api/activities
pub async fn activities_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewActivity>,
) -> ApiResult<DailyActivity> {
    let description = required_text("description", &payload.description)?;
    let activity = DailyActivity::create(
        &state.pool,
        current.id,
        &description,
        payload.date.unwrap_or_else(Utc::now),
    )
    .await?;
    Ok(ApiResponse::created(activity))
}

/// DELETE /api/activities/:id - only the author may remove an entry
pub async fn activity_delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if DailyActivity::delete_owned(&state.pool, id, current.id).await? {
        return Ok(ApiResponse::success(json!({ "id": id, "deleted": true })));
    }

    match DailyActivity::find_by_id(&state.pool, id).await? {
        Some(_) => Err(ApiError::forbidden("Not authorized to delete this activity")),
        None => Err(ApiError::not_found("Activity not found")),
    }
}
