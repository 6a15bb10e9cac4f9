//! # Repository Module
//!
//! One repository per aggregate. Each wraps a clone of the pool and maps
//! rows onto `shopdesk-core` types.
//!
//! ## Write Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  • Multi-statement writes run in ONE transaction                        │
//! │  • The first statement of such a transaction is a write, so the         │
//! │    SQLite write lock is taken before anything is read                   │
//! │  • Guarded updates (`WHERE stock >= ?`, `WHERE is_day_open = 1`,        │
//! │    `WHERE paid_cents = ?`) turn races into DbError::Conflict            │
//! │  • Inside a transaction every query goes through the transaction,       │
//! │    never the pool (an in-memory pool has a single connection)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod accounting;
pub mod backup;
pub mod customer;
pub mod invoice;
pub mod order;
pub mod product;
pub mod sale;
pub mod settings;
pub mod user;

pub use accounting::AccountingRepository;
pub use backup::BackupRepository;
pub use customer::CustomerRepository;
pub use invoice::InvoiceRepository;
pub use order::OrderRepository;
pub use product::{ProductFilter, ProductRepository, StockChange};
pub use sale::SaleRepository;
pub use settings::SettingsRepository;
pub use user::UserRepository;

/// Numeric suffix of a sequential document number
/// (`20261019-0007` → 7, `ORD-00012` → 12).
pub(crate) fn sequence_of(number: &str) -> i64 {
    number
        .rsplit('-')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, NaiveDate, Utc};
    use shopdesk_core::catalog::{build_product, NewProduct};
    use shopdesk_core::{AccountingSettings, Customer, Product};

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn now() -> DateTime<Utc> {
        Utc::now()
    }

    pub fn product(name: &str, price_cents: i64, stock: i64) -> Product {
        build_product(
            NewProduct {
                name: name.to_string(),
                category: "General".to_string(),
                price_cents,
                cost_price_cents: price_cents / 2,
                stock,
                unit: "unit".to_string(),
                image: None,
                description: None,
            },
            uuid::Uuid::new_v4().to_string(),
            now(),
        )
        .unwrap()
    }

    pub fn customer(name: &str) -> Customer {
        Customer {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    /// Opens `date` as the operational day and returns the stored state.
    pub async fn open_day(db: &Database, date: NaiveDate) -> AccountingSettings {
        let state = AccountingSettings {
            current_operational_date: date,
            is_day_open: true,
            opening_cash_cents: 0,
            opened_at: Some(now()),
            opened_by: Some("admin".to_string()),
            last_closure: None,
        };
        db.accounting().open_day(&state).await.unwrap();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::sequence_of;

    #[test]
    fn test_sequence_of() {
        assert_eq!(sequence_of("20261019-0007"), 7);
        assert_eq!(sequence_of("ORD-00012"), 12);
        assert_eq!(sequence_of("INV-000100"), 100);
        assert_eq!(sequence_of("garbage"), 0);
    }
}
