/// Playlist endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::models::{Playlist, Video},
    error::{ApiError, ApiResult},
    ownership::{authorize, validate_identifier},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlaylistRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
}

/// Build playlist routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/playlists", post(create_playlist))
        .route(
            "/playlists/:playlist_id",
            get(get_playlist)
                .patch(update_playlist)
                .delete(delete_playlist),
        )
        .route("/playlists/user/:user_id", get(user_playlists))
        .route("/playlists/add/:video_id/:playlist_id", patch(add_video))
        .route("/playlists/remove/:video_id/:playlist_id", patch(remove_video))
}

async fn create_playlist(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<PlaylistRequest>,
) -> ApiResult<(StatusCode, Json<Playlist>)> {
    req.validate()?;

    let playlist = ctx
        .resources
        .create_playlist(&auth.principal_id, req.name.trim(), &req.description)
        .await?;

    Ok((StatusCode::CREATED, Json(playlist)))
}

async fn get_playlist(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(playlist_id): Path<String>,
) -> ApiResult<Json<Playlist>> {
    validate_identifier(&playlist_id, "playlist")?;

    let playlist = ctx
        .resources
        .find_playlist(&playlist_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;

    Ok(Json(playlist))
}

async fn user_playlists(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Playlist>>> {
    validate_identifier(&user_id, "user")?;

    Ok(Json(ctx.resources.list_playlists_by_owner(&user_id).await?))
}

async fn update_playlist(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(playlist_id): Path<String>,
    Json(req): Json<PlaylistRequest>,
) -> ApiResult<Json<Playlist>> {
    req.validate()?;
    let playlist: Playlist = authorize(&*ctx.resources, &playlist_id, &auth.principal_id).await?;

    let updated = ctx
        .resources
        .update_playlist(&playlist.id, req.name.trim(), &req.description)
        .await?;

    Ok(Json(updated))
}

async fn delete_playlist(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(playlist_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let playlist: Playlist = authorize(&*ctx.resources, &playlist_id, &auth.principal_id).await?;

    ctx.resources.delete_playlist(&playlist.id).await?;

    Ok(Json(json!({})))
}

async fn add_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> ApiResult<Json<Playlist>> {
    validate_identifier(&video_id, "video")?;
    let playlist: Playlist = authorize(&*ctx.resources, &playlist_id, &auth.principal_id).await?;

    let video: Option<Video> = ctx.resources.find_video(&video_id).await?;
    let video = video.ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    let updated = ctx
        .resources
        .add_video_to_playlist(&playlist.id, &video.id)
        .await?;

    Ok(Json(updated))
}

async fn remove_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> ApiResult<Json<Playlist>> {
    validate_identifier(&video_id, "video")?;
    let playlist: Playlist = authorize(&*ctx.resources, &playlist_id, &auth.principal_id).await?;

    let updated = ctx
        .resources
        .remove_video_from_playlist(&playlist.id, &video_id)
        .await?;

    Ok(Json(updated))
}
