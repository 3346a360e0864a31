/// Account manager implementation using runtime queries
use crate::{
    account::{ChannelProfile, RegisterRequest, UpdateAccountRequest},
    credentials::CredentialVerifier,
    db::{models::PrincipalRecord, principals, resources::is_unique_violation},
    error::{ApiError, ApiResult},
    relations::{RelationEngine, ToggleKind},
    token::{TokenPair, TokenService},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    credentials: CredentialVerifier,
    tokens: Arc<TokenService>,
    relations: Arc<RelationEngine>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(
        db: SqlitePool,
        credentials: CredentialVerifier,
        tokens: Arc<TokenService>,
        relations: Arc<RelationEngine>,
    ) -> Self {
        Self {
            db,
            credentials,
            tokens,
            relations,
        }
    }

    /// Register a new principal
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<PrincipalRecord> {
        let request = request.normalized();
        request.validate()?;

        let RegisterRequest {
            full_name,
            username,
            email,
            password,
        } = request;

        if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::Validation(
                "Username may only contain letters and digits".to_string(),
            ));
        }

        if principals::username_or_email_taken(&self.db, &username, &email).await? {
            return Err(ApiError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let password_hash = self.credentials.hash(&password).await?;

        let now = Utc::now();
        let principal = PrincipalRecord {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            full_name,
            password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        // A concurrent registration can still win the unique index
        principals::insert(&self.db, &principal)
            .await
            .map_err(|e| match e {
                ApiError::Database(ref db_error) if is_unique_violation(db_error) => {
                    ApiError::Conflict("User with email or username already exists".to_string())
                }
                other => other,
            })?;

        tracing::info!(principal_id = %principal.id, username = %principal.username, "Registered principal");
        Ok(principal)
    }

    /// Verify credentials and issue a token pair
    pub async fn login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
    ) -> ApiResult<(PrincipalRecord, TokenPair)> {
        let username = username.map(str::trim).filter(|s| !s.is_empty());
        let email = email.map(str::trim).filter(|s| !s.is_empty());

        let principal = match (username, email) {
            (Some(username), _) => principals::find_by_username(&self.db, username).await?,
            (None, Some(email)) => principals::find_by_email(&self.db, email).await?,
            (None, None) => {
                return Err(ApiError::Validation(
                    "Username or email is required".to_string(),
                ))
            }
        };

        // Unknown principal and wrong password are indistinguishable to the caller
        let principal = match principal {
            Some(principal) => principal,
            None => {
                tracing::warn!("Login attempt for unknown principal");
                return Err(ApiError::InvalidCredentials);
            }
        };

        if !self
            .credentials
            .verify(password, &principal.password_hash)
            .await
        {
            tracing::warn!(principal_id = %principal.id, "Login failed: wrong password");
            return Err(ApiError::InvalidCredentials);
        }

        let pair = self.tokens.issue(&principal).await?;

        tracing::info!(principal_id = %principal.id, "Principal logged in");
        Ok((principal, pair))
    }

    /// Revoke the principal's refresh token
    pub async fn logout(&self, principal_id: &str) -> ApiResult<()> {
        self.tokens.revoke(principal_id).await?;

        tracing::info!(principal_id, "Principal logged out");
        Ok(())
    }

    /// Rotate a refresh token into a new pair
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenPair> {
        self.tokens.rotate(refresh_token).await
    }

    /// Change password after verifying the old one
    pub async fn change_password(
        &self,
        principal_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let principal = self.current_user(principal_id).await?;

        if !self
            .credentials
            .verify(old_password, &principal.password_hash)
            .await
        {
            tracing::warn!(principal_id, "Password change rejected: wrong old password");
            return Err(ApiError::InvalidCredentials);
        }

        let password_hash = self.credentials.hash(new_password).await?;
        principals::update_password_hash(&self.db, principal_id, &password_hash).await?;

        tracing::info!(principal_id, "Password changed");
        Ok(())
    }

    /// Load the authenticated principal
    pub async fn current_user(&self, principal_id: &str) -> ApiResult<PrincipalRecord> {
        principals::find_by_id(&self.db, principal_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Update display name and email
    pub async fn update_account(
        &self,
        principal_id: &str,
        request: UpdateAccountRequest,
    ) -> ApiResult<PrincipalRecord> {
        let request = request.normalized();
        request.validate()?;

        let email = request.email;
        let full_name = request.full_name.as_str();

        if principals::email_taken_by_other(&self.db, &email, principal_id).await? {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        principals::update_details(&self.db, principal_id, full_name, &email, Utc::now())
            .await
            .map_err(|e| match e {
                ApiError::Database(ref db_error) if is_unique_violation(db_error) => {
                    ApiError::Conflict("Email already registered".to_string())
                }
                other => other,
            })?;

        tracing::info!(principal_id, "Account details updated");
        self.current_user(principal_id).await
    }

    /// Channel profile of `username` as seen by `viewer_id`
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: &str,
    ) -> ApiResult<ChannelProfile> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::Validation("Username is missing".to_string()));
        }

        let channel = principals::find_by_username(&self.db, username)
            .await?
            .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

        let subscribers_count = self
            .relations
            .count_for_target(&channel.id, ToggleKind::Subscription)
            .await?;
        let channels_subscribed_to_count = self
            .relations
            .count_for_subject(&channel.id, ToggleKind::Subscription)
            .await?;
        let is_subscribed = self
            .relations
            .exists(viewer_id, &channel.id, ToggleKind::Subscription)
            .await?;

        Ok(ChannelProfile {
            id: channel.id,
            username: channel.username,
            full_name: channel.full_name,
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
            created_at: channel.created_at,
        })
    }
}
