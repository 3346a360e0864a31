/// Comment endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::models::Comment,
    error::{ApiError, ApiResult},
    ownership::{authorize, validate_identifier},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 2000, message = "Content is required"))]
    pub content: String,
}

/// Build comment routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/comments/:video_id", get(video_comments).post(add_comment))
        .route(
            "/comments/c/:comment_id",
            patch(update_comment).delete(delete_comment),
        )
}

async fn video_comments(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(video_id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    validate_identifier(&video_id, "video")?;

    Ok(Json(ctx.resources.list_comments_for_video(&video_id).await?))
}

async fn add_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate()?;
    validate_identifier(&video_id, "video")?;

    if ctx.resources.find_video(&video_id).await?.is_none() {
        return Err(ApiError::NotFound("Video not found".to_string()));
    }

    let comment = ctx
        .resources
        .create_comment(&auth.principal_id, &video_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(comment_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<Comment>> {
    req.validate()?;
    let comment: Comment = authorize(&*ctx.resources, &comment_id, &auth.principal_id).await?;

    Ok(Json(
        ctx.resources
            .update_comment(&comment.id, &req.content)
            .await?,
    ))
}

async fn delete_comment(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let comment: Comment = authorize(&*ctx.resources, &comment_id, &auth.principal_id).await?;

    ctx.resources.delete_comment(&comment.id).await?;

    Ok(Json(json!({})))
}
