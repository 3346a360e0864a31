/// API routes and handlers
pub mod comments;
pub mod dashboard;
pub mod likes;
pub mod media;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;


use crate::context::AppContext;
use axum::Router;

/// Build API routes, mounted under `/api/v1`
pub fn routes() -> Router<AppContext> {
    let v1 = Router::new()
        .merge(users::routes())
        .merge(likes::routes())
        .merge(subscriptions::routes())
        .merge(playlists::routes())
        .merge(videos::routes())
        .merge(tweets::routes())
        .merge(comments::routes())
        .merge(dashboard::routes())
        .merge(media::routes());

    Router::new().nest("/api/v1", v1)
}
