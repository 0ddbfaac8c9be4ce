use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::user::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

/// Signing material for session tokens, built once from config
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours: expiry_hours as i64,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(&security.jwt_secret, security.jwt_expiry_hours)
    }

    pub fn claims_for(&self, user_id: Uuid, username: &str, role: Role) -> Claims {
        let now = Utc::now();
        Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn generate(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Verify signature and expiry and return the claims
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// bcrypt on the blocking pool so request workers stay responsive
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

/// Malformed stored hashes count as a mismatch
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        }
    }
}

/// Passwords shorter than this are refused at creation
pub const MIN_PASSWORD_LEN: usize = 3;

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LEN));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if username.len() > 50 {
        return Err("Username must be less than 50 characters".to_string());
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err("Username can only contain letters, numbers, dot, underscore, and hyphen".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_identity() {
        let keys = JwtKeys::new("unit-test-secret", 1);
        let id = Uuid::new_v4();
        let claims = keys.claims_for(id, "site-boss", Role::Manager);
        let token = keys.generate(&claims).unwrap();

        let decoded = keys.validate(&token).unwrap();
        assert_eq!(decoded.sub, id);
        assert_eq!(decoded.username, "site-boss");
        assert_eq!(decoded.role, Role::Manager);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = JwtKeys::new("first-secret", 1);
        let other = JwtKeys::new("second-secret", 1);
        let claims = keys.claims_for(Uuid::new_v4(), "e1", Role::Supervisor);
        let token = keys.generate(&claims).unwrap();

        assert!(matches!(other.validate(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::new("unit-test-secret", 1);
        let mut claims = keys.claims_for(Uuid::new_v4(), "e1", Role::Supervisor);
        claims.iat -= 7200;
        claims.exp = Utc::now().timestamp() - 3600;
        let token = keys.generate(&claims).unwrap();

        assert!(keys.validate(&token).is_err());
    }

    #[test]
    fn password_hash_verifies_only_its_password() {
        let hash = hash_password("123456", 4).unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_password("123456", &hash));
        assert!(!verify_password("654321", &hash));
        assert!(!verify_password("123456", "not-a-bcrypt-hash"));
    }

    #[tokio::test]
    async fn blocking_hash_matches_sync_verification() {
        let hash = hash_password_blocking("s3cret".to_string(), 4).await.unwrap();
        assert!(verify_password("s3cret", &hash));
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("e1").is_ok());
        assert!(validate_username("site.manager-2").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("drop table").is_err());
        assert!(validate_password("ab").is_err());
        assert!(validate_password("abc").is_ok());
    }
}
