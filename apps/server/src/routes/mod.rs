//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  /health                       open                                     │
//! │  /api/auth/login               open                                     │
//! │  /api/products/*               open                                     │
//! │  /api/auth/me, customers, sales, orders, accounting, invoices,          │
//! │       reports, forecast, settings (GET)          signed in (AuthUser)   │
//! │  /api/users, /api/backup, void, settings (PUT)   admin (AdminUser)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers stay thin: load what the core function needs, call it, persist
//! the result. Business rules live in `shopdesk-core`.

use axum::Router;

use crate::state::AppState;

pub mod accounting;
pub mod auth;
pub mod backup;
pub mod customers;
pub mod forecast;
pub mod health;
pub mod invoices;
pub mod orders;
pub mod products;
pub mod reports;
pub mod sales;
pub mod settings;
pub mod users;

/// All routes, without state or middleware.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/customers", customers::router())
        .nest("/sales", sales::router())
        .nest("/orders", orders::router())
        .nest("/accounting", accounting::router())
        .nest("/invoices", invoices::router())
        .nest("/reports", reports::router())
        .nest("/forecast", forecast::router())
        .nest("/backup", backup::router())
        .nest("/settings", settings::router());

    Router::new()
        .merge(health::router())
        .nest("/api", api)
}
