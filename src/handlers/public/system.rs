// handlers/public/system.rs - service banner and health probe

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::AppState;
use crate::database::DatabaseManager;

/// GET / - service banner
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": {
            "name": "Site Ledger API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Construction-site expense, allocation and attendance tracking",
            "spreadsheet_sink": state.sheets.name(),
            "endpoints": {
                "auth": "/api/auth/login (public), /api/auth/register, /api/auth/me",
                "users": "/api/users/supervisors, /api/users/:id",
                "sites": "/api/sites[/:id]",
                "materials": "/api/materials[/:id]",
                "allocations": "/api/allocations, /api/allocations/balance",
                "expenses": "/api/expenses[/:id], /api/expenses/:id/status",
                "activities": "/api/activities[/:id]",
                "attendance": "/api/attendance, /api/attendance/:id/status",
                "reports": "/api/reports/summary",
            }
        }
    }))
}

/// GET /health - 200 when the database answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
