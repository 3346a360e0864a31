/// Channel dashboard endpoints for the authenticated principal
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::models::{ChannelStats, Video},
    error::ApiResult,
};
use axum::{extract::State, routing::get, Json, Router};

/// Build dashboard routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/dashboard/stats", get(channel_stats))
        .route("/dashboard/videos", get(channel_videos))
}

async fn channel_stats(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<ChannelStats>> {
    // a token can outlive its principal
    let principal = ctx.account_manager.current_user(&auth.principal_id).await?;

    Ok(Json(ctx.resources.channel_stats(&principal.id).await?))
}

async fn channel_videos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Video>>> {
    let principal = ctx.account_manager.current_user(&auth.principal_id).await?;

    Ok(Json(ctx.resources.list_videos_by_owner(&principal.id).await?))
}
