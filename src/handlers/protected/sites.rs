// handlers/protected/sites.rs - construction sites

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::required_text;
use crate::app::AppState;
use crate::database::models::site::SiteChanges;
use crate::database::models::Site;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::sheets::SheetSink;

#[derive(Debug, Deserialize)]
pub struct NewSite {
    pub name: String,
    pub location: String,
}

/// Prepare the site's spreadsheet tab without holding up the request
fn prepare_tab_in_background(sheets: Arc<dyn SheetSink>, site_name: String) {
    tokio::spawn(async move {
        if let Err(e) = sheets.ensure_site_tab(&site_name).await {
            tracing::error!("Could not prepare spreadsheet tab for site '{}': {}", site_name, e);
        }
    });
}

/// GET /api/sites
pub async fn sites_get(State(state): State<AppState>) -> ApiResult<Vec<Site>> {
    Ok(ApiResponse::success(Site::find_all(&state.pool).await?))
}

/// POST /api/sites
pub async fn sites_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewSite>,
) -> ApiResult<Site> {
    current.require_manager()?;
    let name = required_text("name", &payload.name)?;
    let location = required_text("location", &payload.location)?;

    let site = Site::create(&state.pool, &name, &location).await?;
    tracing::info!("Site '{}' created by '{}'", site.name, current.username);

    prepare_tab_in_background(state.sheets.clone(), site.name.clone());
    Ok(ApiResponse::created(site))
}

/// PUT /api/sites/:id
pub async fn site_put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SiteChanges>,
) -> ApiResult<Site> {
    current.require_manager()?;
    let changes = SiteChanges {
        name: payload.name.as_deref().map(|n| required_text("name", n)).transpose()?,
        location: payload
            .location
            .as_deref()
            .map(|l| required_text("location", l))
            .transpose()?,
        status: payload.status,
    };

    let renamed = changes.name.is_some();
    let site = Site::update(&state.pool, id, &changes).await?;
    if renamed {
        prepare_tab_in_background(state.sheets.clone(), site.name.clone());
    }
    Ok(ApiResponse::success(site))
}
