/// Authentication extractor
use crate::{context::AppContext, error::ApiError, token::AccessClaims};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated principal, resolved from the access token cookie or bearer header
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal_id: String,
    pub claims: AccessClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = state
            .session
            .access_token(&parts.headers)
            .ok_or_else(|| ApiError::Authentication("Unauthorized request".to_string()))?;

        let claims = state.tokens.verify_access(&token).map_err(|e| {
            tracing::warn!("Access token rejected: {}", e.kind());
            e
        })?;

        Ok(AuthContext {
            principal_id: claims.sub.clone(),
            claims,
        })
    }
}
