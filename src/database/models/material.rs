use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::DatabaseError;

/// Catalog entry a supervisor can pick when submitting an expense
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub base_price: Decimal,
    pub shop_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMaterial {
    pub name: String,
    pub unit: String,
    pub base_price: Decimal,
    pub shop_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaterialChanges {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub base_price: Option<Decimal>,
    pub shop_name: Option<String>,
}

const MATERIAL_COLUMNS: &str = "id, name, unit, base_price, shop_name, created_at, updated_at";

impl Material {
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>, DatabaseError> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials ORDER BY name",
            MATERIAL_COLUMNS
        ))
        .fetch_all(pool)
        .await?;
        Ok(materials)
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, DatabaseError> {
        let material = sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE id = $1",
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(material)
    }

    pub async fn create(pool: &PgPool, new: &NewMaterial) -> Result<Self, DatabaseError> {
        let material = sqlx::query_as::<_, Material>(&format!(
            "INSERT INTO materials (id, name, unit, base_price, shop_name)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            MATERIAL_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.unit)
        .bind(new.base_price)
        .bind(new.shop_name.as_deref())
        .fetch_one(pool)
        .await?;
        Ok(material)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: &MaterialChanges,
    ) -> Result<Self, DatabaseError> {
        sqlx::query_as::<_, Material>(&format!(
            "UPDATE materials
             SET name = COALESCE($2, name),
                 unit = COALESCE($3, unit),
                 base_price = COALESCE($4, base_price),
                 shop_name = COALESCE($5, shop_name),
                 updated_at = now()
             WHERE id = $1
             RETURNING {}",
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.unit.as_deref())
        .bind(changes.base_price)
        .bind(changes.shop_name.as_deref())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Material not found".to_string()))
    }
}
