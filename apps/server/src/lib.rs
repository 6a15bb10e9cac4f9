//! # ShopDesk Server
//!
//! REST API for the ShopDesk point of sale.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ShopDesk Server                                 │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Catalog       │  │  Register      │  │  Back office               ││
//! │  │                │  │                │  │                            ││
//! │  │ • products     │  │ • sales, voids │  │ • reports (JSON / CSV)     ││
//! │  │ • customers    │  │ • orders       │  │ • forecast                 ││
//! │  │                │  │ • day open /   │  │ • invoices, payments       ││
//! │  │                │  │   close        │  │ • users, settings, backup  ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │  TraceLayer  │  │    JWT + argon2          ││  │
//! │  │  │ (shopdesk-db)│  │  (tracing)   │  │    (auth.rs)             ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `SHOPDESK_HTTP_PORT` - HTTP port (default: 8080)
//! - `SHOPDESK_DB_PATH` - SQLite file (default: ./data/shopdesk.db)
//! - `SHOPDESK_DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `SHOPDESK_JWT_SECRET` - Secret for JWT signing
//! - `SHOPDESK_JWT_LIFETIME_SECS` - Session lifetime (default: 43200)
//! - `SHOPDESK_ADMIN_USERNAME` / `SHOPDESK_ADMIN_PASSWORD` - first admin
//! - `RUST_LOG` - log filter

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod startup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use startup::{build_router, Application};
pub use state::AppState;
