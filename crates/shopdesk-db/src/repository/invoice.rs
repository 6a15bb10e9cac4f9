//! # Invoice Repository
//!
//! Accounts receivable: invoices raised by credit sales and the payments
//! received against them.
//!
//! ## Recording a Payment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read invoice (paid = 300) ──► apply_payment() ──► paid = 800           │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. day guard (payment is booked on the open operational date)         │
//! │   2. UPDATE invoices SET paid_cents = 800 ... WHERE paid_cents = 300    │
//! │        0 rows → someone else paid in between → DbError::Conflict        │
//! │   3. INSERT invoice_payments                                            │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::sale::guard_open_day;
use shopdesk_core::{Invoice, InvoicePaymentRecord, InvoiceStatus};

const INVOICE_COLUMNS: &str = r#"
    id, invoice_number, sale_id, customer_id, customer_name, issue_date,
    due_date, amount_cents, paid_cents, status, created_at, paid_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id, invoice_id, amount_cents, method, operational_date, paid_at,
    recorded_by, notes
"#;

/// Payments booked on `date`, oldest first.
pub(crate) async fn fetch_payments_on(
    conn: &mut SqliteConnection,
    date: NaiveDate,
) -> DbResult<Vec<InvoicePaymentRecord>> {
    let payments = sqlx::query_as::<_, InvoicePaymentRecord>(&format!(
        "SELECT {} FROM invoice_payments WHERE operational_date = ? ORDER BY paid_at",
        PAYMENT_COLUMNS
    ))
    .bind(date)
    .fetch_all(&mut *conn)
    .await?;

    Ok(payments)
}

/// Formats an invoice number: `INV-000042`.
pub fn invoice_number(sequence: i64) -> String {
    format!("INV-{:06}", sequence)
}

pub(crate) async fn next_invoice_sequence(conn: &mut SqliteConnection) -> DbResult<i64> {
    let sequence: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(sequence), 0) + 1 FROM invoices")
        .fetch_one(&mut *conn)
        .await?;
    Ok(sequence)
}

pub(crate) async fn insert_invoice(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    sequence: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, sequence, sale_id, customer_id, customer_name,
            issue_date, due_date, amount_cents, paid_cents, status, created_at, paid_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.invoice_number)
    .bind(sequence)
    .bind(&invoice.sale_id)
    .bind(&invoice.customer_id)
    .bind(&invoice.customer_name)
    .bind(invoice.issue_date)
    .bind(invoice.due_date)
    .bind(invoice.amount_cents)
    .bind(invoice.paid_cents)
    .bind(invoice.status)
    .bind(invoice.created_at)
    .bind(invoice.paid_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_value(&invoice.invoice_number))?;

    Ok(())
}

pub(crate) async fn insert_payment(
    conn: &mut SqliteConnection,
    payment: &InvoicePaymentRecord,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_payments (
            id, invoice_id, amount_cents, method, operational_date, paid_at,
            recorded_by, notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.invoice_id)
    .bind(payment.amount_cents)
    .bind(payment.method)
    .bind(payment.operational_date)
    .bind(payment.paid_at)
    .bind(&payment.recorded_by)
    .bind(&payment.notes)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE id = ?",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    pub async fn get_by_sale(&self, sale_id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE sale_id = ?",
            INVOICE_COLUMNS
        ))
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Lists invoices, newest first, optionally by stored status and
    /// customer. Call [`refresh_overdue`](Self::refresh_overdue) first so
    /// the stored status is current.
    pub async fn list(
        &self,
        status: Option<InvoiceStatus>,
        customer_id: Option<&str>,
    ) -> DbResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {} FROM invoices
            WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR customer_id = ?2)
            ORDER BY sequence DESC
            "#,
            INVOICE_COLUMNS
        ))
        .bind(status)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    pub async fn list_all(&self) -> DbResult<Vec<Invoice>> {
        self.list(None, None).await
    }

    pub async fn payments_for(&self, invoice_id: &str) -> DbResult<Vec<InvoicePaymentRecord>> {
        let payments = sqlx::query_as::<_, InvoicePaymentRecord>(&format!(
            "SELECT {} FROM invoice_payments WHERE invoice_id = ? ORDER BY paid_at",
            PAYMENT_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Payments booked on one operational date (for the day close).
    pub async fn payments_on(&self, date: NaiveDate) -> DbResult<Vec<InvoicePaymentRecord>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payments_on(&mut conn, date).await
    }

    pub async fn list_payments(&self) -> DbResult<Vec<InvoicePaymentRecord>> {
        let payments = sqlx::query_as::<_, InvoicePaymentRecord>(&format!(
            "SELECT {} FROM invoice_payments ORDER BY paid_at",
            PAYMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Stores a payment and the invoice it updated.
    ///
    /// `previous_paid_cents` is the paid amount the update was computed
    /// from; the write only succeeds if it is still current.
    ///
    /// ## Errors
    /// `Conflict` when the day is not open or the invoice changed meanwhile.
    pub async fn record_payment(
        &self,
        updated: &Invoice,
        previous_paid_cents: i64,
        payment: &InvoicePaymentRecord,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        guard_open_day(&mut tx, payment.operational_date).await?;

        let result = sqlx::query(
            r#"
            UPDATE invoices SET paid_cents = ?, status = ?, paid_at = ?
            WHERE id = ? AND paid_cents = ? AND status IN ('pending', 'overdue')
            "#,
        )
        .bind(updated.paid_cents)
        .bind(updated.status)
        .bind(updated.paid_at)
        .bind(&updated.id)
        .bind(previous_paid_cents)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!(
                "invoice {} changed while the payment was being recorded",
                updated.invoice_number
            )));
        }

        insert_payment(&mut tx, payment).await?;
        tx.commit().await?;

        info!(
            invoice = %updated.invoice_number,
            amount_cents = payment.amount_cents,
            method = %payment.method,
            status = %updated.status,
            "Invoice payment recorded"
        );
        Ok(())
    }

    /// Marks pending invoices past their due date as overdue. Returns how
    /// many changed.
    pub async fn refresh_overdue(&self, today: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE invoices SET status = 'overdue' WHERE status = 'pending' AND due_date < ?",
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!(count = result.rows_affected(), %today, "Invoices now overdue");
        }
        Ok(result.rows_affected())
    }
}
