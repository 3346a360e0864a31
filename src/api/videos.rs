/// Video endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::{
        models::Video,
        resources::{NewVideo, VideoQuery, VideoSort},
    },
    error::{ApiError, ApiResult},
    ownership::{authorize, validate_identifier},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

/// Video publish request; media fields are handles returned by `/media`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
}

/// Largest page a listing may request
const MAX_PAGE_SIZE: u32 = 100;

/// Query string of `GET /videos`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosParams {
    pub user_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
}

impl ListVideosParams {
    /// Check bounds and resolve defaults. Unpublished videos are only listed
    /// for their owner.
    fn into_query(self, viewer_id: &str, owner_id: &str) -> ApiResult<VideoQuery> {
        let defaults = VideoQuery::default();

        let page = self.page.unwrap_or(defaults.page);
        if page == 0 {
            return Err(ApiError::Validation("page must be at least 1".to_string()));
        }

        let limit = self.limit.unwrap_or(defaults.limit);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let sort_by = match self.sort_by.as_deref() {
            None => defaults.sort_by,
            Some(value) => VideoSort::parse(value).ok_or_else(|| {
                ApiError::Validation(
                    "sortBy must be one of createdAt, title, views, duration".to_string(),
                )
            })?,
        };

        let descending = match self.sort_type.as_deref() {
            None | Some("desc") => true,
            Some("asc") => false,
            Some(_) => {
                return Err(ApiError::Validation(
                    "sortType must be asc or desc".to_string(),
                ))
            }
        };

        let title_contains = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        Ok(VideoQuery {
            page,
            limit,
            title_contains,
            sort_by,
            descending,
            include_unpublished: viewer_id == owner_id,
        })
    }
}

/// Build video routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/videos", get(list_videos).post(create_video))
        .route(
            "/videos/:video_id",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/videos/toggle/publish/:video_id", patch(toggle_publish))
}

async fn create_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CreateVideoRequest>,
) -> ApiResult<(StatusCode, Json<Video>)> {
    req.validate()?;

    if !ctx.object_store.exists(&req.video_file).await? {
        return Err(ApiError::Validation("Video file is required".to_string()));
    }
    if !ctx.object_store.exists(&req.thumbnail).await? {
        return Err(ApiError::Validation("Thumbnail is required".to_string()));
    }

    let video = ctx
        .resources
        .create_video(
            &auth.principal_id,
            NewVideo {
                title: req.title,
                description: req.description,
                video_file: req.video_file,
                thumbnail: req.thumbnail,
                duration: req.duration,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(video)))
}

async fn list_videos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<ListVideosParams>,
) -> ApiResult<Json<Vec<Video>>> {
    let owner_id = params
        .user_id
        .clone()
        .ok_or_else(|| ApiError::Validation("userId is required".to_string()))?;
    validate_identifier(&owner_id, "user")?;

    let owner = ctx.account_manager.current_user(&owner_id).await?;
    let query = params.into_query(&auth.principal_id, &owner.id)?;

    Ok(Json(ctx.resources.list_videos(&owner.id, &query).await?))
}

async fn get_video(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(video_id): Path<String>,
) -> ApiResult<Json<Video>> {
    validate_identifier(&video_id, "video")?;

    let video = ctx
        .resources
        .find_video(&video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))?;

    Ok(Json(video))
}

async fn update_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
    Json(req): Json<UpdateVideoRequest>,
) -> ApiResult<Json<Video>> {
    req.validate()?;
    let video: Video = authorize(&*ctx.resources, &video_id, &auth.principal_id).await?;

    let updated = ctx
        .resources
        .update_video_details(&video.id, &req.title, &req.description)
        .await?;

    Ok(Json(updated))
}

async fn toggle_publish(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
) -> ApiResult<Json<Video>> {
    let video: Video = authorize(&*ctx.resources, &video_id, &auth.principal_id).await?;

    Ok(Json(ctx.resources.toggle_publish(&video.id).await?))
}

/// Media first, then the document
async fn delete_video(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let video: Video = authorize(&*ctx.resources, &video_id, &auth.principal_id).await?;

    ctx.object_store.delete(&video.video_file).await?;
    ctx.object_store.delete(&video.thumbnail).await?;
    ctx.resources.delete_video(&video.id).await?;

    Ok(Json(json!({})))
}
