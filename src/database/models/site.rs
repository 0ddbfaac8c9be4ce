use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool, Type};
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "site_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub status: SiteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SiteChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub status: Option<SiteStatus>,
}

const SITE_COLUMNS: &str = "id, name, location, status, created_at, updated_at";

impl Site {
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>, DatabaseError> {
        let sites = sqlx::query_as::<_, Site>(&format!(
            "SELECT {} FROM sites ORDER BY name",
            SITE_COLUMNS
        ))
        .fetch_all(pool)
        .await?;
        Ok(sites)
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, DatabaseError> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT {} FROM sites WHERE id = $1",
            SITE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(site)
    }

    pub async fn create(pool: &PgPool, name: &str, location: &str) -> Result<Self, DatabaseError> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "INSERT INTO sites (id, name, location) VALUES ($1, $2, $3) RETURNING {}",
            SITE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(location)
        .fetch_one(pool)
        .await?;
        Ok(site)
    }

    pub async fn update(pool: &PgPool, id: Uuid, changes: &SiteChanges) -> Result<Self, DatabaseError> {
        sqlx::query_as::<_, Site>(&format!(
            "UPDATE sites
             SET name = COALESCE($2, name),
                 location = COALESCE($3, location),
                 status = COALESCE($4, status),
                 updated_at = now()
             WHERE id = $1
             RETURNING {}",
            SITE_COLUMNS
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.location.as_deref())
        .bind(changes.status)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Site not found".to_string()))
    }
}
