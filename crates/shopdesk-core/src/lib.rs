//! # shopdesk-core: Pure Business Logic for ShopDesk
//!
//! This crate is the **heart** of ShopDesk. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ShopDesk Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP Routes (apps/server)                    │   │
//! │  │    products, sales, accounting, invoices, reports, backup      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ shopdesk-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌────────────┐  ┌──────────┐    │   │
//! │  │   │  types   │  │  sale    │  │ accounting │  │ invoice  │    │   │
//! │  │   │  money   │  │  order   │  │  closures  │  │  aging   │    │   │
//! │  │   └──────────┘  └──────────┘  └────────────┘  └──────────┘    │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌────────────┐  ┌──────────┐    │   │
//! │  │   │ catalog  │  │  report  │  │  forecast  │  │  backup  │    │   │
//! │  │   └──────────┘  └──────────┘  └────────────┘  └──────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shopdesk-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: the current time and the current operational date
//!    are always passed in, never read from the clock
//! 2. **Integer Money**: all monetary values are in cents (i64)
//! 3. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use shopdesk_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! let line = price.multiply_quantity(3)?;
//! assert_eq!(line.to_string(), "$32.97");
//! # Ok::<(), shopdesk_core::CoreError>(())
//! ```

pub mod accounting;
pub mod backup;
pub mod catalog;
pub mod error;
pub mod forecast;
pub mod invoice;
pub mod money;
pub mod order;
pub mod report;
pub mod sale;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Maximum distinct lines allowed in a single sale or order.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typing 1000 instead of 10 at the register.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Number of products listed in "top products" report sections.
pub const TOP_PRODUCTS_LIMIT: usize = 10;
