//! # shopdesk-db: Database Layer for ShopDesk
//!
//! SQLite persistence for every ShopDesk entity, through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ShopDesk Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /api/sales)                                         │
//! │       │  shopdesk_core::sale::prepare_sale()                            │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   shopdesk-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ products sales │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ invoices ...   │    │ 0001_init    │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (./data/shopdesk.db)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopdesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/shopdesk.db")).await?;
//! let low = db.products().list(Default::default()).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    AccountingRepository, BackupRepository, CustomerRepository, InvoiceRepository,
    OrderRepository, ProductFilter, ProductRepository, SaleRepository, SettingsRepository,
    StockChange, UserRepository,
};
