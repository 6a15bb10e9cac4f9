//! # Backup Repository
//!
//! Full export and replace-all import of the database.
//!
//! ## Import
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BackupData::parse() (core) ── rejects malformed files up front         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   DELETE children before parents                                        │
//! │   INSERT parents before children                                        │
//! │   restore accounting state + settings                                   │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure rolls back: the previous data stays untouched.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::repository::accounting::{insert_closure, write_state, AccountingRepository};
use crate::repository::customer::{insert_customer, CustomerRepository};
use crate::repository::invoice::{insert_invoice, insert_payment, InvoiceRepository};
use crate::repository::order::{insert_numbered_order, OrderRepository};
use crate::repository::product::{insert_product, ProductFilter, ProductRepository};
use crate::repository::sale::{insert_sale, SaleRepository};
use crate::repository::sequence_of;
use crate::repository::settings::{put_json, SettingsRepository, APP_KEY, BUSINESS_KEY};
use crate::repository::user::{insert_user, UserRepository};
use shopdesk_core::backup::{BackupCounts, BackupData, BackupUser, BACKUP_VERSION};

/// Tables in delete order (children first).
const TABLES: [&str; 11] = [
    "invoice_payments",
    "invoices",
    "sale_items",
    "sales",
    "order_items",
    "orders",
    "products",
    "customers",
    "users",
    "day_closures",
    "settings",
];

#[derive(Debug, Clone)]
pub struct BackupRepository {
    pool: SqlitePool,
}

impl BackupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BackupRepository { pool }
    }

    /// Reads every entity into a backup document stamped `now`.
    pub async fn export(&self, now: DateTime<Utc>) -> DbResult<BackupData> {
        let users = UserRepository::new(self.pool.clone())
            .list_credentials()
            .await?
            .into_iter()
            .map(|c| BackupUser {
                user: c.user,
                password_hash: c.password_hash,
            })
            .collect();

        let invoices = InvoiceRepository::new(self.pool.clone());
        let accounting = AccountingRepository::new(self.pool.clone());
        let settings = SettingsRepository::new(self.pool.clone());

        let data = BackupData {
            version: BACKUP_VERSION,
            backup_timestamp: now,
            products: ProductRepository::new(self.pool.clone())
                .list(ProductFilter::default())
                .await?,
            customers: CustomerRepository::new(self.pool.clone()).list(None).await?,
            users,
            sales: SaleRepository::new(self.pool.clone()).list_all().await?,
            orders: OrderRepository::new(self.pool.clone()).list(None).await?,
            invoices: invoices.list_all().await?,
            invoice_payments: invoices.list_payments().await?,
            closures: accounting.closures(None).await?,
            accounting_settings: accounting.get(now.date_naive()).await?,
            business_settings: settings.business().await?,
            app_settings: settings.app().await?,
        };

        info!(counts = ?data.counts(), "Backup exported");
        Ok(data)
    }

    /// Replaces all data with the backup's content.
    ///
    /// The backup must already have passed `BackupData::check`.
    pub async fn import(&self, data: &BackupData) -> DbResult<BackupCounts> {
        let mut tx = self.pool.begin().await?;

        for table in TABLES {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        for product in &data.products {
            insert_product(&mut tx, product).await?;
        }
        for customer in &data.customers {
            insert_customer(&mut tx, customer).await?;
        }
        for entry in &data.users {
            insert_user(&mut tx, &entry.user, &entry.password_hash).await?;
        }
        for sale in &data.sales {
            insert_sale(&mut tx, sale, sequence_of(&sale.receipt_number)).await?;
        }
        for order in &data.orders {
            insert_numbered_order(&mut tx, order, sequence_of(&order.order_number)).await?;
        }
        for invoice in &data.invoices {
            insert_invoice(&mut tx, invoice, sequence_of(&invoice.invoice_number)).await?;
        }
        for payment in &data.invoice_payments {
            insert_payment(&mut tx, payment).await?;
        }
        for closure in &data.closures {
            insert_closure(&mut tx, closure).await?;
        }

        write_state(&mut tx, &data.accounting_settings).await?;
        put_json(&mut tx, BUSINESS_KEY, &data.business_settings).await?;
        if !data.app_settings.is_null() {
            put_json(&mut tx, APP_KEY, &data.app_settings).await?;
        }

        tx.commit().await?;

        let counts = data.counts();
        info!(?counts, backup_timestamp = %data.backup_timestamp, "Backup imported");
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{customer, db, now, open_day, product};
    use crate::DbError;
    use chrono::NaiveDate;
    use shopdesk_core::order::{build_order, NewOrder};
    use shopdesk_core::sale::{prepare_sale, LineRequest, PaymentRequest, SaleContext, SaleRequest};
    use shopdesk_core::{BusinessSettings, Role, User};

    /// A database with one of everything.
    async fn populated() -> crate::Database {
        let db = db().await;
        let tea = product("Green Tea", 450, 10);
        db.products().insert(&tea).await.unwrap();
        let ana = customer("Ana");
        db.customers().insert(&ana).await.unwrap();
        db.users()
            .insert(
                &User {
                    id: "u-1".into(),
                    username: "admin".into(),
                    display_name: "Admin".into(),
                    role: Role::Admin,
                    is_active: true,
                    created_at: now(),
                },
                "$argon2id$hash",
            )
            .await
            .unwrap();

        let day = open_day(&db, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()).await;
        let prepared = prepare_sale(
            &SaleRequest {
                items: vec![LineRequest {
                    product_id: tea.id.clone(),
                    quantity: 2,
                }],
                payment: PaymentRequest::Credit { due_date: None },
                customer_id: Some(ana.id.clone()),
            },
            &[tea.clone()],
            &day,
            Some(&ana),
            &BusinessSettings::default(),
            SaleContext {
                sale_id: "s-1".into(),
                invoice_id: "i-1".into(),
                cashier_id: "u-1".into(),
                now: now(),
            },
        )
        .unwrap();
        db.sales().record(prepared).await.unwrap();

        let order = build_order(
            NewOrder {
                customer_id: Some(ana.id.clone()),
                items: vec![LineRequest {
                    product_id: tea.id.clone(),
                    quantity: 1,
                }],
                notes: None,
            },
            &[tea],
            "o-1".into(),
            now(),
        )
        .unwrap();
        db.orders().insert(&order).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let source = populated().await;
        let data = source.backup().export(now()).await.unwrap();

        let counts = data.counts();
        assert_eq!(counts.products, 1);
        assert_eq!(counts.sales, 1);
        assert_eq!(counts.invoices, 1);
        assert_eq!(counts.orders, 1);
        assert_eq!(counts.users, 1);

        // Through JSON, as a file would travel.
        let bytes = serde_json::to_vec(&data).unwrap();
        let parsed = BackupData::parse(&bytes).unwrap();

        let target = db().await;
        target.products().insert(&product("Leftover", 100, 1)).await.unwrap();
        let imported = target.backup().import(&parsed).await.unwrap();
        assert_eq!(imported, counts);

        let again = target.backup().export(now()).await.unwrap();
        assert_eq!(again.counts(), counts);
        assert_eq!(again.sales, data.sales);
        assert_eq!(again.users[0].password_hash, "$argon2id$hash");
        assert!(again.accounting_settings.is_day_open);

        // Sequences continue after the imported numbers.
        let order = again.orders[0].clone();
        let next = target
            .orders()
            .insert(&shopdesk_core::Order {
                id: "o-2".into(),
                ..order
            })
            .await
            .unwrap();
        assert_eq!(next.order_number, "ORD-00002");
    }

    #[tokio::test]
    async fn test_failed_import_leaves_data_untouched() {
        let db = populated().await;
        let mut data = db.backup().export(now()).await.unwrap();

        // Same name twice violates the unique index halfway through.
        let mut dup = data.products[0].clone();
        dup.id = "other".into();
        data.products.push(dup);

        let err = db.backup().import(&data).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(db.products().count().await.unwrap(), 1);
    }
}
