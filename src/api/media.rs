/// Media upload endpoint
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub handle: String,
}

/// Build media routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/media", post(upload))
}

async fn upload(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    if body.is_empty() {
        return Err(ApiError::Validation("Upload body is empty".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let handle = ctx.object_store.put(body.to_vec(), content_type).await?;

    tracing::info!(
        principal_id = %auth.principal_id,
        username = %auth.claims.username,
        handle = %handle,
        "Media uploaded"
    );
    Ok((StatusCode::CREATED, Json(UploadResponse { handle })))
}
