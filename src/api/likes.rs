/// Like toggles for videos, comments and tweets
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::models::Video,
    error::ApiResult,
    relations::{ToggleKind, ToggleOutcome},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LikeStatus {
    pub status: ToggleOutcome,
}

/// Build like routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/likes/toggle/v/:video_id", post(toggle_video_like))
        .route("/likes/toggle/c/:comment_id", post(toggle_comment_like))
        .route("/likes/toggle/t/:tweet_id", post(toggle_tweet_like))
        .route("/likes/videos", get(liked_videos))
}

async fn toggle(
    ctx: &AppContext,
    auth: &AuthContext,
    target_id: &str,
    kind: ToggleKind,
) -> ApiResult<Json<LikeStatus>> {
    let status = ctx
        .relations
        .toggle(&auth.principal_id, target_id, kind)
        .await?;

    Ok(Json(LikeStatus { status }))
}

async fn toggle_video_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
) -> ApiResult<Json<LikeStatus>> {
    toggle(&ctx, &auth, &video_id, ToggleKind::VideoLike).await
}

async fn toggle_comment_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<LikeStatus>> {
    toggle(&ctx, &auth, &comment_id, ToggleKind::CommentLike).await
}

async fn toggle_tweet_like(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(tweet_id): Path<String>,
) -> ApiResult<Json<LikeStatus>> {
    toggle(&ctx, &auth, &tweet_id, ToggleKind::TweetLike).await
}

async fn liked_videos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Video>>> {
    Ok(Json(ctx.relations.liked_videos(&auth.principal_id).await?))
}
