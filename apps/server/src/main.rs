//! # ShopDesk Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Web client ───► HTTP (8080) ───► Routes ───► shopdesk-core             │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                               shopdesk-db (SQLite)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::info;

use shopdesk_server::telemetry::init_tracing;
use shopdesk_server::{Application, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting ShopDesk server...");

    let config = ServerConfig::load()?;
    info!(
        port = config.http_port,
        db_path = %config.db_path,
        "Configuration loaded"
    );

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    Ok(())
}
