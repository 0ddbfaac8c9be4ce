// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here sits behind jwt_auth_middleware and validate_user_middleware,
// so handlers can take `Extension<CurrentUser>` and trust its role.

pub mod activities;
pub mod allocations;
pub mod attendance;
pub mod auth;
pub mod expenses;
pub mod materials;
pub mod reports;
pub mod sites;
pub mod users;

use crate::error::ApiError;

/// Trimmed value of a required text field
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(field, format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
