/// Unified error types for the VidTube core
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Username/email and password did not match a principal
    #[error("Invalid user credentials")]
    InvalidCredentials,

    /// No credential was presented at all
    #[error("Authentication required: {0}")]
    Authentication(String),

    /// Access token is malformed or carries a bad signature
    #[error("Invalid access token")]
    TokenInvalid,

    /// Access token is past its expiry
    #[error("Access token has expired")]
    TokenExpired,

    /// Refresh token was rejected (reused, mismatched, expired or forged)
    #[error("Refresh token is expired or used")]
    RotationDenied,

    /// Principal does not own the resource
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Not found errors (principal, resource, or toggle target)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed resource identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A principal tried to subscribe to their own channel
    #[error("You cannot subscribe to your own channel")]
    SelfReferenceDenied,

    /// Request body failed shape validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object store errors
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// JWT signing errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Stable machine-readable kind reported to clients
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidCredentials => "InvalidCredentials",
            ApiError::Authentication(_) => "AuthenticationRequired",
            ApiError::TokenInvalid => "TokenInvalid",
            ApiError::TokenExpired => "TokenExpired",
            ApiError::RotationDenied => "RotationDenied",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "NotFound",
            ApiError::InvalidIdentifier(_) => "InvalidIdentifier",
            ApiError::SelfReferenceDenied => "SelfReferenceDenied",
            ApiError::Validation(_) => "ValidationFailed",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Database(_)
            | ApiError::ObjectStore(_)
            | ApiError::Jwt(_)
            | ApiError::Internal(_)
            | ApiError::Io(_) => "InternalServerError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials
            | ApiError::Authentication(_)
            | ApiError::TokenInvalid
            | ApiError::TokenExpired
            | ApiError::RotationDenied => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidIdentifier(_)
            | ApiError::SelfReferenceDenied
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_)
            | ApiError::ObjectStore(_)
            | ApiError::Jwt(_)
            | ApiError::Internal(_)
            | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: self.kind().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        ApiError::Validation(format!("Invalid fields: {}", fields.join(", ")))
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
