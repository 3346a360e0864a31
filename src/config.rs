/// Configuration management for the VidTube core
use crate::{
    error::{ApiError, ApiResult},
    session::parse_same_site,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to send credentialed (cookie) requests
    pub cors_origins: Vec<String>,
    pub media_upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database_path: PathBuf,
    pub media_directory: PathBuf,
}

/// Token and password hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_secret: String,
    pub refresh_token_expiry_days: i64,
    pub password_hash: PasswordHashConfig,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordHashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        // OWASP minimum for Argon2id; verifies in well under 100ms
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Cookie attributes for the session transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secure_cookies: bool,
    /// One of "strict", "lax" or "none"
    pub same_site: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Longest accepted access token lifetime (one week)
pub const MAX_ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 7 * 24 * 60;
/// Longest accepted refresh token lifetime (one year)
pub const MAX_REFRESH_TOKEN_EXPIRY_DAYS: i64 = 365;

/// Parse `key` when set, else use `default`. A set but malformed value is an error.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> ApiResult<T> {
    match env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ApiResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation(format!("Invalid value for {}: {:?}", key, value)))
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let host = env::var("VIDTUBE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("VIDTUBE_PORT", 8000)?;
        let cors_origins = env::var("VIDTUBE_CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();
        let media_upload_limit = env_or("VIDTUBE_MEDIA_UPLOAD_LIMIT", 100 * 1024 * 1024)?;

        let data_directory: PathBuf = env::var("VIDTUBE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database_path = env::var("VIDTUBE_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("vidtube.sqlite"));
        let media_directory = env::var("VIDTUBE_MEDIA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("media"));

        let access_token_secret = env::var("VIDTUBE_ACCESS_TOKEN_SECRET")
            .map_err(|_| ApiError::Validation("Access token secret required".to_string()))?;
        let refresh_token_secret = env::var("VIDTUBE_REFRESH_TOKEN_SECRET")
            .map_err(|_| ApiError::Validation("Refresh token secret required".to_string()))?;
        let access_token_expiry_minutes = env_or("VIDTUBE_ACCESS_TOKEN_EXPIRY_MINUTES", 15)?;
        let refresh_token_expiry_days = env_or("VIDTUBE_REFRESH_TOKEN_EXPIRY_DAYS", 10)?;

        let defaults = PasswordHashConfig::default();
        let password_hash = PasswordHashConfig {
            memory_kib: env_or("VIDTUBE_PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_or("VIDTUBE_PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: env_or("VIDTUBE_PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
        };

        let secure_cookies = env_or("VIDTUBE_COOKIE_SECURE", true)?;
        let same_site = env::var("VIDTUBE_COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                host,
                port,
                cors_origins,
                media_upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database_path,
                media_directory,
            },
            authentication: AuthConfig {
                access_token_secret,
                access_token_expiry_minutes,
                refresh_token_secret,
                refresh_token_expiry_days,
                password_hash,
            },
            session: SessionConfig {
                secure_cookies,
                same_site,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.host.is_empty() {
            return Err(ApiError::Validation("Host cannot be empty".to_string()));
        }

        let auth = &self.authentication;
        if auth.access_token_secret.len() < 32 || auth.refresh_token_secret.len() < 32 {
            return Err(ApiError::Validation(
                "Token secrets must be at least 32 characters".to_string(),
            ));
        }

        if auth.access_token_secret == auth.refresh_token_secret {
            return Err(ApiError::Validation(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        if !(1..=MAX_ACCESS_TOKEN_EXPIRY_MINUTES).contains(&auth.access_token_expiry_minutes) {
            return Err(ApiError::Validation(format!(
                "Access token expiry must be between 1 and {} minutes",
                MAX_ACCESS_TOKEN_EXPIRY_MINUTES
            )));
        }

        if !(1..=MAX_REFRESH_TOKEN_EXPIRY_DAYS).contains(&auth.refresh_token_expiry_days) {
            return Err(ApiError::Validation(format!(
                "Refresh token expiry must be between 1 and {} days",
                MAX_REFRESH_TOKEN_EXPIRY_DAYS
            )));
        }

        parse_same_site(&self.session.same_site)?;

        Ok(())
    }

    /// Minimal configuration for unit tests (cheap hashing, insecure cookies)
    #[cfg(test)]
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                host: "localhost".to_string(),
                port: 8000,
                cors_origins: vec!["http://localhost:3000".to_string()],
                media_upload_limit: 1024 * 1024,
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database_path: PathBuf::from(":memory:"),
                media_directory: PathBuf::from("./data/media"),
            },
            authentication: AuthConfig {
                access_token_secret: "test-access-secret-for-testing-only-0001".to_string(),
                access_token_expiry_minutes: 15,
                refresh_token_secret: "test-refresh-secret-for-testing-only-0002".to_string(),
                refresh_token_expiry_days: 10,
                password_hash: PasswordHashConfig {
                    memory_kib: 1024,
                    iterations: 1,
                    parallelism: 1,
                },
            },
            session: SessionConfig {
                secure_cookies: true,
                same_site: "strict".to_string(),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(ServerConfig::for_tests().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = ServerConfig::for_tests();
        config.authentication.access_token_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shared_secret_rejected() {
        let mut config = ServerConfig::for_tests();
        config.authentication.refresh_token_secret =
            config.authentication.access_token_secret.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_same_site_rejected() {
        let mut config = ServerConfig::for_tests();
        config.session.same_site = "sometimes".to_string();
        assert!(config.validate().is_err());

        config.session.same_site = "Lax".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_token_expiry_bounds() {
        let mut config = ServerConfig::for_tests();
        config.authentication.refresh_token_expiry_days = 1_000_000_000_000;
        assert!(matches!(config.validate(), Err(ApiError::Validation(_))));

        let mut config = ServerConfig::for_tests();
        config.authentication.access_token_expiry_minutes = MAX_ACCESS_TOKEN_EXPIRY_MINUTES + 1;
        assert!(matches!(config.validate(), Err(ApiError::Validation(_))));

        let mut config = ServerConfig::for_tests();
        config.authentication.access_token_expiry_minutes = 0;
        assert!(matches!(config.validate(), Err(ApiError::Validation(_))));

        let mut config = ServerConfig::for_tests();
        config.authentication.access_token_expiry_minutes = MAX_ACCESS_TOKEN_EXPIRY_MINUTES;
        config.authentication.refresh_token_expiry_days = MAX_REFRESH_TOKEN_EXPIRY_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(matches!(
            parse_value::<i64>("VIDTUBE_ACCESS_TOKEN_EXPIRY_MINUTES", "15m"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            parse_value::<bool>("VIDTUBE_COOKIE_SECURE", "flase"),
            Err(ApiError::Validation(_))
        ));
        assert_eq!(
            parse_value::<i64>("VIDTUBE_ACCESS_TOKEN_EXPIRY_MINUTES", " 30 ").unwrap(),
            30
        );
        assert!(!parse_value::<bool>("VIDTUBE_COOKIE_SECURE", "false").unwrap());
    }

    #[test]
    fn test_unset_value_uses_default() {
        let value: u32 = env_or("VIDTUBE_TEST_UNSET_VARIABLE_FOR_DEFAULTS", 7).unwrap();
        assert_eq!(value, 7);
    }
}
