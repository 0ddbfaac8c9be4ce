use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

/// GET /api/auth/me - the authenticated user's profile
pub async fn me_get(Extension(current): Extension<CurrentUser>) -> ApiResult<CurrentUser> {
    Ok(ApiResponse::success(current))
}
