/// VidTube core
///
/// Identity, session and authorization service for a social-video platform:
/// accounts, rotating token pairs carried in cookies, ownership-guarded
/// resources and idempotent like/subscribe relations.

mod account;
mod api;
mod auth;
mod config;
mod context;
mod credentials;
mod db;
mod error;
mod object_store;
mod ownership;
mod relations;
mod server;
mod session;
mod token;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidtube_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let config = ServerConfig::from_env()?;
    tracing::debug!(level = %config.logging.level, "Configuration loaded");

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
 _    ___     ________      __
| |  / (_)___/ /_  __/_  __/ /_  ___
| | / / / __  / / / / / / / __ \/ _ \
| |/ / / /_/ / / / / /_/ / /_/ /  __/
|___/_/\__,_/ /_/  \__,_/_.___/\___/

        VidTube core v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
