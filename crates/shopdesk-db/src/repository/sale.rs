//! # Sale Repository
//!
//! Persists prepared sales and voids them.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. day guard      UPDATE accounting_state ... WHERE is_day_open = 1   │
//! │                     AND current_operational_date = sale.date            │
//! │   2. receipt no.    MAX(daily_sequence) + 1 for the operational date    │
//! │   3. stock          UPDATE products SET stock = stock - q               │
//! │                     WHERE id = ? AND stock >= q       (per line)        │
//! │   4. invoice no.    MAX(sequence) + 1          (credit sales only)      │
//! │   5. INSERT sales, sale_items, invoices                                 │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any guard that matches 0 rows → DbError::Conflict, ROLLBACK            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Voiding
//! Marks the sale voided, puts its units back on the shelf and voids its
//! invoice, in one transaction. An invoice that already received money
//! blocks the void.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::invoice::{insert_invoice, invoice_number, next_invoice_sequence};
use shopdesk_core::sale::PreparedSale;
use shopdesk_core::{PaymentDetails, PaymentMethod, Sale, SaleItem, SaleStatus};

const SALE_COLUMNS: &str = r#"
    id, receipt_number, sold_at, operational_date, total_cents, cost_cents,
    payment_method, payment_json, customer_id, cashier_id, status, voided_at
"#;

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    receipt_number: String,
    sold_at: DateTime<Utc>,
    operational_date: NaiveDate,
    total_cents: i64,
    cost_cents: i64,
    payment_method: PaymentMethod,
    payment_json: String,
    customer_id: Option<String>,
    cashier_id: String,
    status: SaleStatus,
    voided_at: Option<DateTime<Utc>>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> DbResult<Sale> {
        let payment: PaymentDetails = serde_json::from_str(&self.payment_json)?;

        Ok(Sale {
            id: self.id,
            receipt_number: self.receipt_number,
            sold_at: self.sold_at,
            operational_date: self.operational_date,
            items,
            total_cents: self.total_cents,
            cost_cents: self.cost_cents,
            payment_method: self.payment_method,
            payment,
            customer_id: self.customer_id,
            cashier_id: self.cashier_id,
            status: self.status,
            voided_at: self.voided_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    sale_id: String,
    #[sqlx(flatten)]
    item: SaleItem,
}

const ITEM_COLUMNS: &str = r#"
    sale_id, product_id, name_snapshot, unit_price_cents, cost_price_cents,
    quantity, line_total_cents
"#;

/// Formats a receipt number: `20261019-0007`.
pub fn receipt_number(date: NaiveDate, sequence: i64) -> String {
    format!("{}-{:04}", date.format("%Y%m%d"), sequence)
}

/// Takes the write lock and checks that `date` is the open operational day.
pub(crate) async fn guard_open_day(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE accounting_state SET id = id
        WHERE id = 1 AND is_day_open = 1 AND current_operational_date = ?
        "#,
    )
    .bind(date)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict(format!(
            "operational day {} is not open",
            date
        )));
    }
    Ok(())
}

/// Inserts a sale row and its lines.
pub(crate) async fn insert_sale(
    conn: &mut SqliteConnection,
    sale: &Sale,
    daily_sequence: i64,
) -> DbResult<()> {
    let payment_json = serde_json::to_string(&sale.payment)?;

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, receipt_number, daily_sequence, sold_at, operational_date,
            total_cents, cost_cents, payment_method, payment_json,
            customer_id, cashier_id, status, voided_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.receipt_number)
    .bind(daily_sequence)
    .bind(sale.sold_at)
    .bind(sale.operational_date)
    .bind(sale.total_cents)
    .bind(sale.cost_cents)
    .bind(sale.payment_method)
    .bind(payment_json)
    .bind(&sale.customer_id)
    .bind(&sale.cashier_id)
    .bind(sale.status)
    .bind(sale.voided_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_value(&sale.receipt_number))?;

    for (line_no, item) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, line_no, product_id, name_snapshot, unit_price_cents,
                cost_price_cents, quantity, line_total_cents
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sale.id)
        .bind(line_no as i64 + 1)
        .bind(&item.product_id)
        .bind(&item.name_snapshot)
        .bind(item.unit_price_cents)
        .bind(item.cost_price_cents)
        .bind(item.quantity)
        .bind(item.line_total_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Attaches lines to sale rows, keeping the row order.
fn assemble(rows: Vec<SaleRow>, items: Vec<SaleItemRow>) -> DbResult<Vec<Sale>> {
    let mut by_sale: HashMap<String, Vec<SaleItem>> = HashMap::new();
    for row in items {
        by_sale.entry(row.sale_id).or_default().push(row.item);
    }

    rows.into_iter()
        .map(|row| {
            let items = by_sale.remove(&row.id).unwrap_or_default();
            row.into_sale(items)
        })
        .collect()
}

/// Sales with an operational date in `from..=to`, in receipt order.
pub(crate) async fn sales_between(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> DbResult<Vec<Sale>> {
    let rows = sqlx::query_as::<_, SaleRow>(&format!(
        r#"
        SELECT {} FROM sales
        WHERE operational_date BETWEEN ?1 AND ?2
        ORDER BY operational_date, daily_sequence
        "#,
        SALE_COLUMNS
    ))
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;

    let items = sqlx::query_as::<_, SaleItemRow>(&format!(
        r#"
        SELECT {} FROM sale_items
        WHERE sale_id IN (SELECT id FROM sales WHERE operational_date BETWEEN ?1 AND ?2)
        ORDER BY sale_id, line_no
        "#,
        ITEM_COLUMNS
    ))
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;

    assemble(rows, items)
}

async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let row = sqlx::query_as::<_, SaleRow>(&format!(
        "SELECT {} FROM sales WHERE id = ?",
        SALE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, SaleItemRow>(&format!(
        "SELECT {} FROM sale_items WHERE sale_id = ? ORDER BY line_no",
        ITEM_COLUMNS
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let mut sales = assemble(vec![row], items)?;
    Ok(sales.pop())
}

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a prepared sale and returns it with its receipt (and
    /// invoice) number assigned.
    ///
    /// ## Errors
    /// `Conflict` when the day was closed or stock was sold out from under
    /// the sale since it was prepared. Nothing is written in that case.
    pub async fn record(&self, mut prepared: PreparedSale) -> DbResult<PreparedSale> {
        let date = prepared.sale.operational_date;
        let mut tx = self.pool.begin().await?;

        guard_open_day(&mut tx, date).await?;

        let sequence: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(daily_sequence), 0) + 1 FROM sales WHERE operational_date = ?",
        )
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        for item in &prepared.sale.items {
            let result = sqlx::query(
                r#"
                UPDATE products SET stock = stock - ?1, updated_at = ?2
                WHERE id = ?3 AND stock >= ?1
                "#,
            )
            .bind(item.quantity)
            .bind(prepared.sale.sold_at)
            .bind(&item.product_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::conflict(format!(
                    "insufficient stock for {}",
                    item.name_snapshot
                )));
            }
        }

        let invoice_sequence = match prepared.invoice {
            Some(_) => Some(next_invoice_sequence(&mut tx).await?),
            None => None,
        };

        prepared.assign_numbers(
            receipt_number(date, sequence),
            invoice_sequence.map(invoice_number),
        );

        insert_sale(&mut tx, &prepared.sale, sequence).await?;
        if let (Some(invoice), Some(seq)) = (&prepared.invoice, invoice_sequence) {
            insert_invoice(&mut tx, invoice, seq).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %prepared.sale.id,
            receipt_number = %prepared.sale.receipt_number,
            total_cents = prepared.sale.total_cents,
            method = %prepared.sale.payment_method,
            "Sale recorded"
        );

        Ok(prepared)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// Sales booked on operational dates within `[from, to]`, oldest first.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Sale>> {
        debug!(%from, %to, "Listing sales");
        let mut conn = self.pool.acquire().await?;
        sales_between(&mut conn, from, to).await
    }

    /// Every sale, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales ORDER BY operational_date, daily_sequence",
            SALE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, SaleItemRow>(&format!(
            "SELECT {} FROM sale_items ORDER BY sale_id, line_no",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        assemble(rows, items)
    }

    /// Voids a completed sale of the open day.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown sale
    /// - `Conflict` when the sale is not a completed sale of the open day,
    ///   or its invoice has received payments
    pub async fn void(&self, id: &str, now: DateTime<Utc>) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sales SET status = 'voided', voided_at = ?1
            WHERE id = ?2
              AND status = 'completed'
              AND operational_date = (
                  SELECT current_operational_date FROM accounting_state
                  WHERE id = 1 AND is_day_open = 1
              )
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return match fetch_sale(&mut tx, id).await? {
                Some(sale) => Err(DbError::conflict(format!(
                    "sale {} cannot be voided",
                    sale.receipt_number
                ))),
                None => Err(DbError::not_found("Sale", id)),
            };
        }

        let sale = fetch_sale(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;

        // Products deleted since the sale are skipped.
        for item in &sale.items {
            sqlx::query("UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?")
                .bind(item.quantity)
                .bind(now)
                .bind(&item.product_id)
                .execute(&mut *tx)
                .await?;
        }

        let paid: Option<i64> =
            sqlx::query_scalar("SELECT paid_cents FROM invoices WHERE sale_id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        match paid {
            Some(paid) if paid > 0 => {
                return Err(DbError::conflict(format!(
                    "invoice of sale {} has received payments",
                    sale.receipt_number
                )));
            }
            Some(_) => {
                sqlx::query("UPDATE invoices SET status = 'voided' WHERE sale_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {}
        }

        tx.commit().await?;

        info!(sale_id = %id, receipt_number = %sale.receipt_number, "Sale voided");
        Ok(sale)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{customer, db, now, open_day, product};
    use shopdesk_core::sale::{prepare_sale, LineRequest, PaymentRequest, SaleContext, SaleRequest};
    use shopdesk_core::{AccountingSettings, BusinessSettings, Customer, InvoiceStatus, Product};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn prepare(
        products: &[Product],
        accounting: &AccountingSettings,
        lines: &[(&Product, i64)],
        payment: PaymentRequest,
        customer: Option<&Customer>,
    ) -> PreparedSale {
        let request = SaleRequest {
            items: lines
                .iter()
                .map(|(p, q)| LineRequest {
                    product_id: p.id.clone(),
                    quantity: *q,
                })
                .collect(),
            payment,
            customer_id: customer.map(|c| c.id.clone()),
        };
        prepare_sale(
            &request,
            products,
            accounting,
            customer,
            &BusinessSettings::default(),
            SaleContext {
                sale_id: uuid::Uuid::new_v4().to_string(),
                invoice_id: uuid::Uuid::new_v4().to_string(),
                cashier_id: "cashier-1".to_string(),
                now: now(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_record_assigns_daily_receipt_numbers_and_moves_stock() {
        let db = db().await;
        let tea = product("Green Tea", 450, 10);
        db.products().insert(&tea).await.unwrap();
        let day = open_day(&db, date("2026-10-19")).await;

        let cash = PaymentRequest::Cash { tendered_cents: 5000 };
        let first = db
            .sales()
            .record(prepare(&[tea.clone()], &day, &[(&tea, 2)], cash.clone(), None))
            .await
            .unwrap();
        let second = db
            .sales()
            .record(prepare(&[tea.clone()], &day, &[(&tea, 3)], cash, None))
            .await
            .unwrap();

        assert_eq!(first.sale.receipt_number, "20261019-0001");
        assert_eq!(second.sale.receipt_number, "20261019-0002");

        let stock = db.products().get_by_id(&tea.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 5);

        let loaded = db.sales().get_by_id(&first.sale.id).await.unwrap().unwrap();
        assert_eq!(loaded, first.sale);
        assert_eq!(
            db.sales()
                .list_between(date("2026-10-19"), date("2026-10-19"))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_record_rejects_stale_stock_and_writes_nothing() {
        let db = db().await;
        let tea = product("Green Tea", 450, 5);
        db.products().insert(&tea).await.unwrap();
        let day = open_day(&db, date("2026-10-19")).await;

        // Prepared against a stale read of 5 units.
        let prepared = prepare(
            &[tea.clone()],
            &day,
            &[(&tea, 4)],
            PaymentRequest::Card { reference: None },
            None,
        );
        db.products().adjust_stock(&tea.id, -3).await.unwrap();

        let err = db.sales().record(prepared).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.products().get_by_id(&tea.id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_record_requires_open_day() {
        let db = db().await;
        let tea = product("Green Tea", 450, 5);
        db.products().insert(&tea).await.unwrap();
        let mut day = AccountingSettings::initial(date("2026-10-19"));
        day.is_day_open = true;

        // Accounting state in the database is still closed.
        let prepared = prepare(
            &[tea.clone()],
            &day,
            &[(&tea, 1)],
            PaymentRequest::Card { reference: None },
            None,
        );
        let err = db.sales().record(prepared).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_credit_sale_creates_numbered_invoice() {
        let db = db().await;
        let tea = product("Green Tea", 450, 5);
        db.products().insert(&tea).await.unwrap();
        let ana = customer("Ana");
        db.customers().insert(&ana).await.unwrap();
        let day = open_day(&db, date("2026-10-19")).await;

        let recorded = db
            .sales()
            .record(prepare(
                &[tea.clone()],
                &day,
                &[(&tea, 2)],
                PaymentRequest::Credit { due_date: None },
                Some(&ana),
            ))
            .await
            .unwrap();

        let invoice = recorded.invoice.unwrap();
        assert_eq!(invoice.invoice_number, "INV-000001");
        match &recorded.sale.payment {
            PaymentDetails::Credit { invoice_number, .. } => {
                assert_eq!(invoice_number, "INV-000001")
            }
            other => panic!("unexpected payment {:?}", other),
        }

        let stored = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_cents, 900);
        assert_eq!(stored.status, InvoiceStatus::Pending);

        // A customer with an unpaid invoice cannot be deleted.
        assert!(matches!(
            db.customers().delete(&ana.id).await.unwrap_err(),
            DbError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_void_restores_stock_and_voids_invoice() {
        let db = db().await;
        let tea = product("Green Tea", 450, 5);
        db.products().insert(&tea).await.unwrap();
        let ana = customer("Ana");
        db.customers().insert(&ana).await.unwrap();
        let day = open_day(&db, date("2026-10-19")).await;

        let recorded = db
            .sales()
            .record(prepare(
                &[tea.clone()],
                &day,
                &[(&tea, 2)],
                PaymentRequest::Credit { due_date: None },
                Some(&ana),
            ))
            .await
            .unwrap();

        let voided = db.sales().void(&recorded.sale.id, now()).await.unwrap();
        assert_eq!(voided.status, SaleStatus::Voided);
        assert!(voided.voided_at.is_some());
        assert_eq!(db.products().get_by_id(&tea.id).await.unwrap().unwrap().stock, 5);

        let invoice = db
            .invoices()
            .get_by_sale(&recorded.sale.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Voided);

        // Second void is refused.
        assert!(matches!(
            db.sales().void(&recorded.sale.id, now()).await.unwrap_err(),
            DbError::Conflict(_)
        ));
        assert!(matches!(
            db.sales().void("missing", now()).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[test]
    fn test_receipt_number_format() {
        assert_eq!(receipt_number(date("2026-01-05"), 42), "20260105-0042");
    }
}
