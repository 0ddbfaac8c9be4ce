// handlers/protected/attendance.rs - labour days and wages

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Attendance, ReviewStatus};
use crate::error::ApiError;
use crate::ledger;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct NewAttendance {
    pub number_of_days: Decimal,
    pub wage_per_day: Decimal,
    #[serde(default, with = "crate::types::entry_date")]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceStatus {
    pub status: ReviewStatus,
}

/// GET /api/attendance
pub async fn attendance_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Vec<Attendance>> {
    let entries = Attendance::find_all(&state.pool, current.visible_supervisor()).await?;
    Ok(ApiResponse::success(entries))
}

/// POST /api/attendance - supervisors only
pub async fn attendance_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewAttendance>,
) -> ApiResult<Attendance> {
    current.require_supervisor()?;
    let total = entry_total(&payload)?;

    let entry = Attendance::create(
        &state.pool,
        current.id,
        payload.number_of_days,
        payload.wage_per_day,
        total,
        payload.date.unwrap_or_else(Utc::now),
    )
    .await?;
    Ok(ApiResponse::created(entry))
}

/// Validated days × wage for a new entry
fn entry_total(payload: &NewAttendance) -> Result<Decimal, ApiError> {
    if payload.number_of_days <= Decimal::ZERO {
        return Err(ApiError::invalid_field("number_of_days", "Number of days must be greater than zero"));
    }
    if payload.wage_per_day <= Decimal::ZERO {
        return Err(ApiError::invalid_field("wage_per_day", "Wage per day must be greater than zero"));
    }
    ledger::wage_total(payload.number_of_days, payload.wage_per_day)
        .ok_or_else(|| ApiError::invalid_field("wage_per_day", "Amount too large"))
}

/// PUT /api/attendance/:id/status - manager sets any status
pub async fn status_put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttendanceStatus>,
) -> ApiResult<Attendance> {
    current.require_manager()?;
    let entry = Attendance::set_status(&state.pool, id, payload.status).await?;
    tracing::info!("Attendance {} set to {} by '{}'", id, entry.status, current.username);
    Ok(ApiResponse::success(entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn entry(days: &str, wage: &str) -> NewAttendance {
        NewAttendance {
            number_of_days: days.parse().unwrap(),
            wage_per_day: wage.parse().unwrap(),
            date: None,
        }
    }

    #[test]
    fn total_is_days_times_wage() {
        assert_eq!(entry_total(&entry("2.5", "600")).unwrap(), "1500".parse::<Decimal>().unwrap());
    }

    #[test]
    fn zero_days_are_refused() {
        let err = entry_total(&entry("0", "600")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_json()["field_errors"]["number_of_days"].is_string());
    }

    #[test]
    fn overflowing_wages_are_a_bad_request() {
        let err = entry_total(&entry("1000000000000000", "1000000000000000")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_json()["field_errors"]["wage_per_day"], "Amount too large");
    }
}
