/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    credentials::CredentialVerifier,
    db::{self, resources::ResourceStore},
    error::{ApiError, ApiResult},
    object_store::{DiskObjectStore, ObjectStore},
    relations::{RelationEngine, WatchHistory},
    session::SessionTransport,
    token::TokenService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub tokens: Arc<TokenService>,
    pub session: Arc<SessionTransport>,
    pub resources: Arc<ResourceStore>,
    pub relations: Arc<RelationEngine>,
    pub watch_history: Arc<WatchHistory>,
    pub object_store: Arc<dyn ObjectStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database_path, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        tracing::info!("Database ready at {:?}", config.storage.database_path);

        Self::with_pool(config, db)
    }

    /// Wire every service onto an already migrated pool
    pub fn with_pool(config: ServerConfig, db: SqlitePool) -> ApiResult<Self> {
        config.validate()?;

        let credentials = CredentialVerifier::new(&config.authentication.password_hash)?;
        let tokens = Arc::new(TokenService::new(db.clone(), &config.authentication)?);
        let session = Arc::new(SessionTransport::new(&config.session)?);
        let relations = Arc::new(RelationEngine::new(db.clone()));
        let watch_history = Arc::new(WatchHistory::new(db.clone()));
        let resources = Arc::new(ResourceStore::new(db.clone()));
        let object_store: Arc<dyn ObjectStore> = Arc::new(DiskObjectStore::new(
            config.storage.media_directory.clone(),
        ));

        let account_manager = Arc::new(AccountManager::new(
            db.clone(),
            credentials,
            tokens.clone(),
            relations.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            account_manager,
            tokens,
            session,
            resources,
            relations,
            watch_history,
            object_store,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        let dirs = vec![
            &config.storage.data_directory,
            &config.storage.media_directory,
        ];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    ApiError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.host, self.config.service.port
        )
    }

    /// Context over an in-memory database with media under `media_directory`
    #[cfg(test)]
    pub async fn for_tests(media_directory: std::path::PathBuf) -> Self {
        let mut config = ServerConfig::for_tests();
        config.storage.media_directory = media_directory;

        Self::with_pool(config, db::test_pool().await).unwrap()
    }
}
