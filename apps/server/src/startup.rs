//! Application startup and lifecycle management.

use std::net::SocketAddr;

use axum::Router;
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;
use shopdesk_core::{Role, User};
use shopdesk_db::{Database, DbConfig};

/// The full router with state and request tracing.
pub fn build_router(state: AppState) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the configured admin account when the database has no users.
///
/// Returns `true` when an account was created.
pub async fn bootstrap_admin(state: &AppState) -> anyhow::Result<bool> {
    if state.db.users().count().await? > 0 {
        return Ok(false);
    }

    let config = &state.config;
    let admin = User {
        id: Uuid::new_v4().to_string(),
        username: config.admin_username.clone(),
        display_name: "Administrator".to_string(),
        role: Role::Admin,
        is_active: true,
        created_at: Utc::now(),
    };
    let hash = hash_password(&config.admin_password)?;
    state.db.users().insert(&admin, &hash).await?;

    warn!(
        username = %admin.username,
        "No users found, created the bootstrap admin. Change its password."
    );
    Ok(true)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Opens the database, bootstraps the admin and binds the listener.
    pub async fn build(config: ServerConfig) -> anyhow::Result<Self> {
        if config.uses_dev_secret() {
            warn!("SHOPDESK_JWT_SECRET is not set, using the development secret");
        }

        let db = Database::new(
            DbConfig::new(&config.db_path).max_connections(config.db_max_connections),
        )
        .await?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
        let state = AppState::new(db, config);
        bootstrap_admin(&state).await?;

        // Port 0 picks a free port, used by tests.
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();
        info!(port, "ShopDesk server listening");

        Ok(Application {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Serves until Ctrl+C or SIGTERM, then closes the pool.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let db = self.state.db.clone();
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        db.close().await;
        info!("Server shutdown complete");
        Ok(())
    }
}

/// Graceful shutdown signal handler.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
