//! Shared application state.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::auth::JwtManager;
use crate::config::ServerConfig;
use shopdesk_db::Database;

/// Handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs);
        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }

    /// Calendar date in the server's local time zone.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
