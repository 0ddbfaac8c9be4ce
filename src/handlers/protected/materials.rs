// handlers/protected/materials.rs - material catalog

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::required_text;
use crate::app::AppState;
use crate::database::models::material::{MaterialChanges, NewMaterial};
use crate::database::models::Material;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

fn check_base_price(price: Decimal) -> Result<(), ApiError> {
    if price < Decimal::ZERO {
        return Err(ApiError::invalid_field("base_price", "Base price cannot be negative"));
    }
    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// GET /api/materials
pub async fn materials_get(State(state): State<AppState>) -> ApiResult<Vec<Material>> {
    Ok(ApiResponse::success(Material::find_all(&state.pool).await?))
}

/// POST /api/materials
pub async fn materials_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewMaterial>,
) -> ApiResult<Material> {
    current.require_manager()?;
    check_base_price(payload.base_price)?;

    let new = NewMaterial {
        name: required_text("name", &payload.name)?,
        unit: required_text("unit", &payload.unit)?,
        base_price: payload.base_price,
        shop_name: blank_to_none(payload.shop_name),
    };
    let material = Material::create(&state.pool, &new).await?;
    tracing::info!("Material '{}' added at {}/{}", material.name, material.base_price, material.unit);
    Ok(ApiResponse::created(material))
}

/// PUT /api/materials/:id
pub async fn material_put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MaterialChanges>,
) -> ApiResult<Material> {
    current.require_manager()?;
    if let Some(price) = payload.base_price {
        check_base_price(price)?;
    }

    let changes = MaterialChanges {
        name: payload.name.as_deref().map(|n| required_text("name", n)).transpose()?,
        unit: payload.unit.as_deref().map(|u| required_text("unit", u)).transpose()?,
        base_price: payload.base_price,
        shop_name: blank_to_none(payload.shop_name),
    };
    Ok(ApiResponse::success(Material::update(&state.pool, id, &changes).await?))
}
