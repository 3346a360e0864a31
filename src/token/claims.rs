/// JWT claim sets for access and refresh tokens
use crate::db::models::PrincipalRecord;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token claims: principal id plus denormalized profile fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl AccessClaims {
    pub fn for_principal(principal: &PrincipalRecord, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: principal.id.clone(),
            username: principal.username.clone(),
            email: principal.email.clone(),
            full_name: principal.full_name.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Refresh token claims: principal id only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two pairs minted in the same second differ
    pub jti: String,
}

impl RefreshClaims {
    pub fn for_principal(principal: &PrincipalRecord, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: principal.id.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}
