/// Token service
///
/// Issues, verifies and rotates access/refresh token pairs. Access tokens are
/// stateless; a refresh token is only honoured while it textually equals the
/// one stored on its principal, which makes rotation and logout authoritative.

mod claims;

pub use claims::{AccessClaims, RefreshClaims};

use crate::{
    config::AuthConfig,
    db::{models::PrincipalRecord, principals},
    error::{ApiError, ApiResult},
};
use chrono::Duration;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::SqlitePool;

/// Allowed clock skew when checking `exp`, in seconds
const CLOCK_SKEW_LEEWAY_SECS: u64 = 30;

/// Access and refresh token minted together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub struct TokenService {
    db: SqlitePool,
    access_keys: SigningKeys,
    refresh_keys: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(db: SqlitePool, config: &AuthConfig) -> ApiResult<Self> {
        let access_ttl = Duration::try_minutes(config.access_token_expiry_minutes)
            .ok_or_else(|| ApiError::Validation("Access token expiry out of range".to_string()))?;
        let refresh_ttl = Duration::try_days(config.refresh_token_expiry_days)
            .ok_or_else(|| ApiError::Validation("Refresh token expiry out of range".to_string()))?;

        Ok(Self {
            db,
            access_keys: SigningKeys::from_secret(&config.access_token_secret),
            refresh_keys: SigningKeys::from_secret(&config.refresh_token_secret),
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue a fresh pair and make its refresh token the principal's only live one.
    ///
    /// Both tokens are built before anything is persisted.
    pub async fn issue(&self, principal: &PrincipalRecord) -> ApiResult<TokenPair> {
        let pair = self.mint_pair(principal)?;

        if !principals::set_refresh_token(&self.db, &principal.id, &pair.refresh_token).await? {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        tracing::info!(principal_id = %principal.id, "Issued token pair");
        Ok(pair)
    }

    /// Verify an access token and return its claims
    pub fn verify_access(&self, token: &str) -> ApiResult<AccessClaims> {
        decode_claims::<AccessClaims>(token, &self.access_keys.decoding).map_err(|kind| {
            match kind {
                ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::TokenInvalid,
            }
        })
    }

    /// Exchange a live refresh token for a new pair, invalidating the old one.
    ///
    /// Every failure collapses into `RotationDenied` so the client falls back
    /// to a full login.
    pub async fn rotate(&self, refresh_token: &str) -> ApiResult<TokenPair> {
        let claims = decode_claims::<RefreshClaims>(refresh_token, &self.refresh_keys.decoding)
            .map_err(|kind| {
                tracing::warn!(?kind, "Rejected refresh token");
                ApiError::RotationDenied
            })?;

        let principal = principals::find_by_id(&self.db, &claims.sub)
            .await?
            .ok_or_else(|| {
                tracing::warn!(principal_id = %claims.sub, "Refresh token for unknown principal");
                ApiError::RotationDenied
            })?;

        if principal.refresh_token.as_deref() != Some(refresh_token) {
            tracing::warn!(principal_id = %principal.id, "Stale refresh token presented");
            return Err(ApiError::RotationDenied);
        }

        let pair = self.mint_pair(&principal)?;

        let swapped = match principals::replace_refresh_token(
            &self.db,
            &principal.id,
            refresh_token,
            &pair.refresh_token,
        )
        .await
        {
            Ok(swapped) => swapped,
            Err(e) if is_transient(&e) => {
                tracing::warn!(principal_id = %principal.id, "Retrying refresh token swap: {}", e);
                principals::replace_refresh_token(
                    &self.db,
                    &principal.id,
                    refresh_token,
                    &pair.refresh_token,
                )
                .await?
            }
            Err(e) => return Err(e.into()),
        };

        if !swapped {
            tracing::warn!(principal_id = %principal.id, "Lost refresh token rotation race");
            return Err(ApiError::RotationDenied);
        }

        tracing::info!(principal_id = %principal.id, "Rotated token pair");
        Ok(pair)
    }

    /// Forget the principal's refresh token. Idempotent.
    pub async fn revoke(&self, principal_id: &str) -> ApiResult<()> {
        principals::clear_refresh_token(&self.db, principal_id).await?;
        tracing::info!(principal_id, "Revoked refresh token");
        Ok(())
    }

    fn mint_pair(&self, principal: &PrincipalRecord) -> ApiResult<TokenPair> {
        let access_claims = AccessClaims::for_principal(principal, self.access_ttl);
        let refresh_claims = RefreshClaims::for_principal(principal, self.refresh_ttl);

        let access_token = encode(&Header::default(), &access_claims, &self.access_keys.encoding)
            .map_err(|e| ApiError::Jwt(format!("Failed to generate access token: {}", e)))?;
        let refresh_token =
            encode(&Header::default(), &refresh_claims, &self.refresh_keys.encoding)
                .map_err(|e| ApiError::Jwt(format!("Failed to generate refresh token: {}", e)))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

fn decode_claims<T: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<T, ErrorKind> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY_SECS;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<T>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| e.into_kind())
}

/// Storage failures worth one more attempt
fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_error) => db_error.message().contains("database is locked"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ServerConfig, db};

    async fn setup() -> (SqlitePool, TokenService, PrincipalRecord) {
        let pool = db::test_pool().await;
        let config = ServerConfig::for_tests();
        let service = TokenService::new(pool.clone(), &config.authentication).unwrap();
        let principal = principals::insert_test_principal(&pool, "alice").await;
        (pool, service, principal)
    }

    async fn stored_refresh_token(pool: &SqlitePool, id: &str) -> Option<String> {
        principals::find_by_id(pool, id)
            .await
            .unwrap()
            .unwrap()
            .refresh_token
    }

    #[tokio::test]
    async fn test_issue_persists_refresh_token() {
        let (pool, service, principal) = setup().await;

        let pair = service.issue(&principal).await.unwrap();

        assert_eq!(
            stored_refresh_token(&pool, &principal.id).await,
            Some(pair.refresh_token.clone())
        );

        let access = service.verify_access(&pair.access_token).unwrap();
        assert_eq!(access.sub, principal.id);
        assert_eq!(access.username, "alice");
        assert_eq!(access.email, "alice@example.com");
        assert_eq!(access.full_name, "alice Example");

        let refresh: RefreshClaims =
            decode_claims(&pair.refresh_token, &service.refresh_keys.decoding).unwrap();
        assert_eq!(refresh.sub, access.sub);
    }

    #[tokio::test]
    async fn test_second_login_replaces_refresh_token() {
        let (pool, service, principal) = setup().await;

        let first = service.issue(&principal).await.unwrap();
        let second = service.issue(&principal).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert_eq!(
            stored_refresh_token(&pool, &principal.id).await,
            Some(second.refresh_token)
        );

        let result = service.rotate(&first.refresh_token).await;
        assert!(matches!(result, Err(ApiError::RotationDenied)));
    }

    #[tokio::test]
    async fn test_rotation_is_single_use() {
        let (_pool, service, principal) = setup().await;

        let r1 = service.issue(&principal).await.unwrap().refresh_token;
        let pair2 = service.rotate(&r1).await.unwrap();
        assert_ne!(pair2.refresh_token, r1);

        let replay = service.rotate(&r1).await;
        assert!(matches!(replay, Err(ApiError::RotationDenied)));

        let pair3 = service.rotate(&pair2.refresh_token).await.unwrap();
        assert_eq!(
            service.verify_access(&pair3.access_token).unwrap().sub,
            principal.id
        );
    }

    #[tokio::test]
    async fn test_concurrent_rotations_only_one_wins() {
        let (_pool, service, principal) = setup().await;
        let refresh = service.issue(&principal).await.unwrap().refresh_token;

        let (a, b) = tokio::join!(service.rotate(&refresh), service.rotate(&refresh));

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        for result in [a, b] {
            if let Err(e) = result {
                assert!(matches!(e, ApiError::RotationDenied));
            }
        }
    }

    #[tokio::test]
    async fn test_revoke_blocks_rotation_and_is_idempotent() {
        let (pool, service, principal) = setup().await;
        let refresh = service.issue(&principal).await.unwrap().refresh_token;

        service.revoke(&principal.id).await.unwrap();
        service.revoke(&principal.id).await.unwrap();

        assert_eq!(stored_refresh_token(&pool, &principal.id).await, None);
        assert!(matches!(
            service.rotate(&refresh).await,
            Err(ApiError::RotationDenied)
        ));
    }

    #[tokio::test]
    async fn test_tokens_are_not_interchangeable() {
        let (_pool, service, principal) = setup().await;
        let pair = service.issue(&principal).await.unwrap();

        assert!(matches!(
            service.verify_access(&pair.refresh_token),
            Err(ApiError::TokenInvalid)
        ));
        assert!(matches!(
            service.rotate(&pair.access_token).await,
            Err(ApiError::RotationDenied)
        ));
    }

    #[tokio::test]
    async fn test_expired_access_token() {
        let pool = db::test_pool().await;
        let mut config = ServerConfig::for_tests();
        config.authentication.access_token_expiry_minutes = -5;
        let service = TokenService::new(pool.clone(), &config.authentication).unwrap();
        let principal = principals::insert_test_principal(&pool, "bob").await;

        let pair = service.issue(&principal).await.unwrap();

        assert!(matches!(
            service.verify_access(&pair.access_token),
            Err(ApiError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_expired_refresh_token_denied() {
        let pool = db::test_pool().await;
        let mut config = ServerConfig::for_tests();
        config.authentication.refresh_token_expiry_days = -1;
        let service = TokenService::new(pool.clone(), &config.authentication).unwrap();
        let principal = principals::insert_test_principal(&pool, "carol").await;

        let pair = service.issue(&principal).await.unwrap();

        assert!(matches!(
            service.rotate(&pair.refresh_token).await,
            Err(ApiError::RotationDenied)
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_rejected() {
        let pool = db::test_pool().await;
        let mut config = ServerConfig::for_tests();
        config.authentication.refresh_token_expiry_days = 1_000_000_000_000;

        assert!(matches!(
            TokenService::new(pool.clone(), &config.authentication),
            Err(ApiError::Validation(_))
        ));

        let mut config = ServerConfig::for_tests();
        config.authentication.access_token_expiry_minutes = i64::MAX;
        assert!(matches!(
            TokenService::new(pool, &config.authentication),
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_and_forged_tokens() {
        let (_pool, service, principal) = setup().await;

        assert!(matches!(
            service.verify_access("not.a.jwt"),
            Err(ApiError::TokenInvalid)
        ));

        let mut other = ServerConfig::for_tests();
        other.authentication.access_token_secret =
            "a-completely-different-access-secret-0003".to_string();
        let forger = TokenService::new(service.db.clone(), &other.authentication).unwrap();
        let forged = forger.mint_pair(&principal).unwrap();

        assert!(matches!(
            service.verify_access(&forged.access_token),
            Err(ApiError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_rotation_for_deleted_principal_denied() {
        let (pool, service, principal) = setup().await;
        let refresh = service.issue(&principal).await.unwrap().refresh_token;

        sqlx::query("DELETE FROM principal WHERE id = ?1")
            .bind(&principal.id)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            service.rotate(&refresh).await,
            Err(ApiError::RotationDenied)
        ));
    }
}
