// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::verify_password;
use crate::database::models::{Role, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

/// POST /api/auth/login - Authenticate user and receive JWT token
///
/// Unknown users and wrong passwords get the same 401 so neither can be probed.
pub async fn login_post(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let user = User::find_active_by_username(&state.pool, username).await?;
    let user = match user {
        Some(user) if verify_password(&payload.password, &user.password_hash) => user,
        _ => {
            tracing::warn!("Failed login attempt for '{}'", username);
            return Err(ApiError::unauthorized("Invalid username or password"));
        }
    };

    let claims = state.keys.claims_for(user.id, &user.username, user.role);
    let token = state.keys.generate(&claims)?;

    tracing::info!("User '{}' logged in as {}", user.username, user.role);
    Ok(ApiResponse::success(LoginResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        token,
    }))
}
