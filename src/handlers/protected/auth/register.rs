// handlers/protected/auth/register.rs - POST /api/auth/register handler

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{hash_password_blocking, validate_password, validate_username};
use crate::database::models::{Role, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

/// POST /api/auth/register - manager creates a user (supervisor unless told otherwise)
pub async fn register_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<RegisteredUser> {
    current.require_manager()?;

    let username = payload.username.trim().to_string();
    validate_username(&username).map_err(|msg| ApiError::invalid_field("username", msg))?;
    validate_password(&payload.password).map_err(|msg| ApiError::invalid_field("password", msg))?;

    let role = payload.role.unwrap_or(Role::Supervisor);
    let phone = payload.phone.unwrap_or_default();
    let password_hash = hash_password_blocking(payload.password, state.bcrypt_cost).await?;

    let user = User::create(&state.pool, &username, &password_hash, role, phone.trim()).await?;

    tracing::info!("'{}' registered {} '{}'", current.username, user.role, user.username);
    Ok(ApiResponse::created(RegisteredUser {
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}
