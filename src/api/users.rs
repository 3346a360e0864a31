/// User, session and watch history endpoints
use crate::{
    account::{
        ChangePasswordRequest, ChannelProfile, LoginRequest, LoginResponse, RefreshRequest,
        RegisterRequest, UpdateAccountRequest,
    },
    auth::AuthContext,
    context::AppContext,
    db::models::{PrincipalView, WatchedVideo},
    error::{ApiError, ApiResult},
    token::TokenPair,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use validator::Validate;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-token", post(refresh_token))
        .route("/users/change-password", post(change_password))
        .route("/users/current-user", get(current_user))
        .route("/users/update-account", patch(update_account))
        .route("/users/c/:username", get(channel_profile))
        .route("/users/history", get(watch_history))
        .route("/users/history/:video_id", post(record_watch))
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<PrincipalView>)> {
    let principal = ctx.account_manager.register(req).await?;

    Ok((StatusCode::CREATED, Json(PrincipalView::from(&principal))))
}

async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let (principal, pair) = ctx
        .account_manager
        .login(req.username.as_deref(), req.email.as_deref(), &req.password)
        .await?;

    let jar = ctx.session.attach(jar, &pair);

    Ok((
        jar,
        Json(LoginResponse::new(PrincipalView::from(&principal), &pair)),
    ))
}

async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Value>)> {
    ctx.account_manager.logout(&auth.principal_id).await?;

    Ok((ctx.session.clear(jar), Json(json!({}))))
}

async fn refresh_token(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieJar, Json<TokenPair>)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let presented = ctx
        .session
        .refresh_token(&jar, body.refresh_token.as_deref())
        .ok_or_else(|| ApiError::Authentication("Unauthorized request".to_string()))?;

    let pair = ctx.account_manager.refresh(&presented).await?;
    let jar = ctx.session.attach(jar, &pair);

    Ok((jar, Json(pair)))
}

async fn change_password(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    req.validate()?;

    ctx.account_manager
        .change_password(&auth.principal_id, &req.old_password, &req.new_password)
        .await?;

    Ok(Json(json!({})))
}

async fn current_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<PrincipalView>> {
    let principal = ctx.account_manager.current_user(&auth.principal_id).await?;

    Ok(Json(PrincipalView::from(&principal)))
}

async fn update_account(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<PrincipalView>> {
    let principal = ctx
        .account_manager
        .update_account(&auth.principal_id, req)
        .await?;

    Ok(Json(PrincipalView::from(&principal)))
}

async fn channel_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> ApiResult<Json<ChannelProfile>> {
    let profile = ctx
        .account_manager
        .channel_profile(&username, &auth.principal_id)
        .await?;

    Ok(Json(profile))
}

async fn watch_history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<WatchedVideo>>> {
    Ok(Json(ctx.watch_history.list(&auth.principal_id).await?))
}

async fn record_watch(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(video_id): Path<String>,
) -> ApiResult<Json<Vec<WatchedVideo>>> {
    ctx.watch_history
        .record(&auth.principal_id, &video_id)
        .await?;

    Ok(Json(ctx.watch_history.list(&auth.principal_id).await?))
}
