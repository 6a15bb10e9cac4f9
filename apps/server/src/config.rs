//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Secret used when `SHOPDESK_JWT_SECRET` is not set. Development only.
const DEV_JWT_SECRET: &str = "shopdesk-dev-secret-change-in-production";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP port (0 picks a free port)
    pub http_port: u16,

    /// SQLite database file
    pub db_path: String,

    /// Upper bound of the connection pool
    pub db_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// Session token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Admin created on first start, when there are no users
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_port: 8080,
            db_path: "./data/shopdesk.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 12 * 60 * 60,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

/// Reads `var`, falling back to `default` when unset.
fn parsed<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string())),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            http_port: parsed("SHOPDESK_HTTP_PORT", defaults.http_port)?,

            db_path: env::var("SHOPDESK_DB_PATH").unwrap_or(defaults.db_path),

            db_max_connections: parsed("SHOPDESK_DB_MAX_CONNECTIONS", defaults.db_max_connections)?,

            jwt_secret: env::var("SHOPDESK_JWT_SECRET").unwrap_or(defaults.jwt_secret),

            jwt_lifetime_secs: parsed("SHOPDESK_JWT_LIFETIME_SECS", defaults.jwt_lifetime_secs)?,

            admin_username: env::var("SHOPDESK_ADMIN_USERNAME").unwrap_or(defaults.admin_username),

            admin_password: env::var("SHOPDESK_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "SHOPDESK_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "SHOPDESK_JWT_LIFETIME_SECS".to_string(),
            ));
        }
        if config.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("SHOPDESK_JWT_SECRET".to_string()));
        }

        Ok(config)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
