/// Channel subscription endpoints
use crate::{
    auth::AuthContext,
    context::AppContext,
    db::models::ChannelSummary,
    error::ApiResult,
    relations::{ToggleKind, ToggleOutcome},
};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Subscribed,
    Unsubscribed,
}

impl From<ToggleOutcome> for SubscriptionStatus {
    fn from(outcome: ToggleOutcome) -> Self {
        match outcome {
            ToggleOutcome::Created => SubscriptionStatus::Subscribed,
            ToggleOutcome::Deleted => SubscriptionStatus::Unsubscribed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub status: SubscriptionStatus,
}

/// Build subscription routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/subscriptions/c/:channel_id",
            get(channel_subscribers).post(toggle_subscription),
        )
        .route("/subscriptions/u/:subscriber_id", get(subscribed_channels))
}

async fn toggle_subscription(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let outcome = ctx
        .relations
        .toggle(&auth.principal_id, &channel_id, ToggleKind::Subscription)
        .await?;

    Ok(Json(SubscriptionResponse {
        status: outcome.into(),
    }))
}

async fn channel_subscribers(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<Vec<ChannelSummary>>> {
    Ok(Json(ctx.relations.subscribers(&channel_id).await?))
}

async fn subscribed_channels(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Path(subscriber_id): Path<String>,
) -> ApiResult<Json<Vec<ChannelSummary>>> {
    Ok(Json(ctx.relations.subscribed_channels(&subscriber_id).await?))
}
