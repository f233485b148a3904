// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; handlers only see the cached
//! `Config` inside the shared state.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Service identity ---
    /// Service name reported in telemetry resource attributes
    pub service_name: String,
    /// Service version reported in telemetry resource attributes
    pub service_version: String,
    /// Deployment environment (development/staging/production)
    pub environment: String,
    /// Server port
    pub port: u16,

    // --- Database ---
    /// MySQL host
    pub db_host: String,
    /// MySQL user
    pub db_user: String,
    /// MySQL password
    pub db_pass: String,
    /// MySQL database name
    pub db_name: String,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// Key for signing the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,

    // --- Google OAuth ---
    pub google_client_id: String,
    pub google_client_secret: String,
    /// Redirect URI registered with Google
    pub google_redirect_uri: String,

    // --- Telemetry ---
    /// OTLP collector endpoint (gRPC)
    pub otel_collector_url: String,

    // --- Static assets ---
    /// Directory served under /static
    pub static_dir: String,
    /// Directory holding HTML views (fallback routes)
    pub views_dir: String,
}

/// Environment variables that must be present for the service to be ready.
/// Checked by `/ready` in addition to startup loading.
pub const REQUIRED_ENV_VARS: &[&str] = &["JWT_SECRET", "DB_HOST", "DB_USER", "DB_NAME"];

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "learntrack".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),

            db_host: env::var("DB_HOST").map_err(|_| ConfigError::Missing("DB_HOST"))?,
            db_user: env::var("DB_USER").map_err(|_| ConfigError::Missing("DB_USER"))?,
            db_pass: env::var("DB_PASS").unwrap_or_default(),
            db_name: env::var("DB_NAME").map_err(|_| ConfigError::Missing("DB_NAME"))?,

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map(|v| v.into_bytes())
                .or_else(|_| {
                    // Falling back to the JWT secret keeps single-secret deployments working.
                    env::var("JWT_SECRET").map(|v| v.into_bytes())
                })
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?,

            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8000/api/auth/google/callback".to_string()),

            otel_collector_url: env::var("OTEL_COLLECTOR_URL")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),

            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
            views_dir: env::var("VIEWS_DIR").unwrap_or_else(|_| "views".to_string()),
        })
    }

    /// Build the MySQL connection URL from the individual DB settings.
    pub fn database_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}/{}",
            self.db_user, self.db_pass, self.db_host, self.db_name
        )
    }

    /// Names of required environment variables that are currently unset.
    pub fn missing_required_env() -> Vec<&'static str> {
        REQUIRED_ENV_VARS
            .iter()
            .copied()
            .filter(|var| env::var(var).is_err())
            .collect()
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            service_name: "learntrack-test".to_string(),
            service_version: "0.0.0".to_string(),
            environment: "test".to_string(),
            port: 8000,
            db_host: "127.0.0.1".to_string(),
            db_user: "root".to_string(),
            db_pass: String::new(),
            db_name: "learntrack_test".to_string(),
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            oauth_state_key: b"test_state_key".to_vec(),
            google_client_id: "test-client-id".to_string(),
            google_client_secret: "test-client-secret".to_string(),
            google_redirect_uri: "http://localhost:8000/api/auth/google/callback".to_string(),
            otel_collector_url: "http://localhost:4317".to_string(),
            static_dir: "static".to_string(),
            views_dir: "views".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
