use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Supervisor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Supervisor => "supervisor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "supervisor" => Ok(Role::Supervisor),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str =
    "id, username, password_hash, role, phone, created_at, updated_at, deleted_at";

impl User {
    pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn find_active_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn list_active(pool: &PgPool, role: Option<Role>) -> Result<Vec<Self>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users
             WHERE deleted_at IS NULL AND ($1::user_role IS NULL OR role = $1)
             ORDER BY username",
            USER_COLUMNS
        ))
        .bind(role)
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    pub async fn create(
        pool: &PgPool,
        username: &str,
        password_hash: &str,
        role: Role,
        phone: &str,
    ) -> Result<Self, DatabaseError> {
        if Self::find_active_by_username(pool, username).await?.is_some() {
            return Err(DatabaseError::Conflict("User already exists".to_string()));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, password_hash, role, phone)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .bind(phone)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    /// Update password and/or phone; `None` leaves the column untouched
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        password_hash: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Self, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET password_hash = COALESCE($2, password_hash),
                 phone = COALESCE($3, phone),
                 updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(password_hash)
        .bind(phone)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
    }

    /// Soft delete: the row stays so historical entries keep their author
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = now(), updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Manager".parse::<Role>(), Ok(Role::Manager));
        assert_eq!("supervisor".parse::<Role>(), Ok(Role::Supervisor));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "e1".to_string(),
            password_hash: "$2b$10$secret".to_string(),
            role: Role::Supervisor,
            phone: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["role"], "supervisor");
        assert!(value.get("deleted_at").is_none());
    }
}
