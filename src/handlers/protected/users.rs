// handlers/protected/users.rs - manager-only user administration

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{hash_password_blocking, validate_password};
use crate::database::models::{Role, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// GET /api/users/supervisors
pub async fn supervisors_get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Vec<User>> {
    current.require_manager()?;
    let supervisors = User::list_active(&state.pool, Some(Role::Supervisor)).await?;
    Ok(ApiResponse::success(supervisors))
}

/// PUT /api/users/:id - change password and/or phone
pub async fn user_put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> ApiResult<User> {
    current.require_manager()?;

    let password = payload.password.filter(|p| !p.is_empty());
    let phone = payload.phone.map(|p| p.trim().to_string());
    if password.is_none() && phone.is_none() {
        return Err(ApiError::bad_request("Nothing to update: provide password and/or phone"));
    }

    let password_hash = match password {
        Some(password) => {
            validate_password(&password).map_err(|msg| ApiError::invalid_field("password", msg))?;
            Some(hash_password_blocking(password, state.bcrypt_cost).await?)
        }
        None => None,
    };

    let user = User::update_profile(&state.pool, id, password_hash.as_deref(), phone.as_deref()).await?;
    tracing::info!("'{}' updated profile of '{}'", current.username, user.username);
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:id - soft delete; the user's history stays intact
pub async fn user_delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    current.require_manager()?;
    if id == current.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    User::soft_delete(&state.pool, id).await?;
    tracing::warn!("'{}' deleted user {}", current.username, id);
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
