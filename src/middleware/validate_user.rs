use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::app::AppState;
use crate::database::models::{Role, User};
use crate::error::ApiError;

/// The authenticated user as currently stored; its role is authoritative over the token's
#[derive(Clone, Debug, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub phone: String,
}

impl CurrentUser {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn require_manager(&self) -> Result<(), ApiError> {
        self.require_role(Role::Manager)
    }

    pub fn require_supervisor(&self) -> Result<(), ApiError> {
        self.require_role(Role::Supervisor)
    }

    fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            return Ok(());
        }
        tracing::warn!(
            "Denied {} '{}' access to a {}-only operation",
            self.role,
            self.username,
            role
        );
        Err(ApiError::forbidden(format!("Access denied: {} role required", role)))
    }

    /// Supervisors are scoped to their own records; managers see everyone's
    pub fn visible_supervisor(&self) -> Option<Uuid> {
        match self.role {
            Role::Manager => None,
            Role::Supervisor => Some(self.id),
        }
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            phone: user.phone,
        }
    }
}

/// Middleware that checks the token's user still exists and has not been deleted
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = User::find_active_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                "Token for '{}' ({}) refused: user no longer active",
                auth_user.username,
                auth_user.user_id
            );
            ApiError::unauthorized("User no longer exists")
        })?;

    if user.role != auth_user.role {
        tracing::debug!(
            "Role of '{}' changed since token issue ({} -> {})",
            user.username,
            auth_user.role,
            user.role
        );
    }

    request.extensions_mut().insert(CurrentUser::from(user));

    Ok(next.run(request).await)
}
