/// Tweet endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::models::Tweet,
    error::ApiResult,
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
pub struct TweetRequest {
    #[validate(length(min = 1, max = 280, message = "Content is required"))]
    pub content: String,
}

/// Build tweet routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/tweets", post(create_tweet))
        .route("/tweets/user/:user_id", get(user_tweets))
        .route("/tweets/:tweet_id", patch(update_tweet).delete(delete_tweet))
}

async fn create_tweet(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<TweetRequest>,
) -> ApiResult<(StatusCode, Json<Tweet>)> {
    req.validate()?;

    let tweet = ctx
        .resources
        .create_tweet(&auth.principal_id, &req.content)
        .await?;

    Ok((StatusCode::CREATED, Json(tweet)))
}

async fn user_tweets(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Tweet>>> {
    validate_identifier(&user_id, "user")?;

    Ok(Json(ctx.resources.list_tweets_by_owner(&user_id).await?))
}

async fn update_tweet(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(tweet_id): Path<String>,
    Json(req): Json<TweetRequest>,
) -> ApiResult<Json<Tweet>> {
    req.validate()?;
    let tweet: Tweet = authorize(&*ctx.resources, &tweet_id, &auth.principal_id).await?;

    Ok(Json(ctx.resources.update_tweet(&tweet.id, &req.content).await?))
}

async fn delete_tweet(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(tweet_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let tweet: Tweet = authorize(&*ctx.resources, &tweet_id, &auth.principal_id).await?;

    ctx.resources.delete_tweet(&tweet.id).await?;

    Ok(Json(json!({})))
}
