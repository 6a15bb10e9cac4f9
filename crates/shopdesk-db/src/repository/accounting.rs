//! # Accounting Repository
//!
//! The single-row operational day state and the history of closed days.
//!
//! ## State Machine
//! ```text
//!            open_day()                             close_day()
//!   CLOSED ─────────────► OPEN (date D) ───────────────────────► CLOSED (date D)
//!     ▲   WHERE is_day_open = 0          WHERE is_day_open = 1        │
//!     │                                    AND date = D               │
//!     └───────────────────────────────────────────────────────────────┘
//! ```
//! Both transitions are conditional updates: a second register trying the
//! same transition matches zero rows and gets `DbError::Conflict`.
//!
//! Closing flips the state before reading the day's sales, so the totals in
//! the closure are taken under the write lock every sale needs.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::repository::invoice::fetch_payments_on;
use crate::repository::sale::sales_between;
use shopdesk_core::{AccountingSettings, ClosureDetails, InvoicePaymentRecord, Sale};

#[derive(Debug, FromRow)]
struct StateRow {
    current_operational_date: NaiveDate,
    is_day_open: bool,
    opening_cash_cents: i64,
    opened_at: Option<DateTime<Utc>>,
    opened_by: Option<String>,
}

pub(crate) async fn insert_closure(
    conn: &mut SqliteConnection,
    closure: &ClosureDetails,
) -> DbResult<()> {
    let details = serde_json::to_string(closure)?;

    sqlx::query(
        "INSERT INTO day_closures (operational_date, closed_at, details_json) VALUES (?, ?, ?)",
    )
    .bind(closure.operational_date)
    .bind(closure.closed_at)
    .bind(details)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_value(closure.operational_date.to_string()))?;

    Ok(())
}

/// Overwrites the day state. Used by backup import.
pub(crate) async fn write_state(
    conn: &mut SqliteConnection,
    state: &AccountingSettings,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE accounting_state SET
            current_operational_date = ?, is_day_open = ?, opening_cash_cents = ?,
            opened_at = ?, opened_by = ?
        WHERE id = 1
        "#,
    )
    .bind(state.current_operational_date)
    .bind(state.is_day_open)
    .bind(state.opening_cash_cents)
    .bind(state.opened_at)
    .bind(&state.opened_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct AccountingRepository {
    pool: SqlitePool,
}

impl AccountingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountingRepository { pool }
    }

    /// Current day state. On first use the operational date is set to
    /// `today`.
    pub async fn get(&self, today: NaiveDate) -> DbResult<AccountingSettings> {
        sqlx::query(
            r#"
            UPDATE accounting_state SET current_operational_date = ?
            WHERE id = 1 AND current_operational_date IS NULL
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, StateRow>(
            r#"
            SELECT current_operational_date, is_day_open, opening_cash_cents, opened_at, opened_by
            FROM accounting_state WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AccountingSettings {
            current_operational_date: row.current_operational_date,
            is_day_open: row.is_day_open,
            opening_cash_cents: row.opening_cash_cents,
            opened_at: row.opened_at,
            opened_by: row.opened_by,
            last_closure: self.last_closure().await?,
        })
    }

    /// Stores a freshly opened day.
    ///
    /// ## Errors
    /// `Conflict` when a day is already open.
    pub async fn open_day(&self, state: &AccountingSettings) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounting_state SET
                current_operational_date = ?, is_day_open = 1, opening_cash_cents = ?,
                opened_at = ?, opened_by = ?
            WHERE id = 1 AND is_day_open = 0
            "#,
        )
        .bind(state.current_operational_date)
        .bind(state.opening_cash_cents)
        .bind(state.opened_at)
        .bind(&state.opened_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("an operational day is already open"));
        }

        info!(
            date = %state.current_operational_date,
            opening_cash_cents = state.opening_cash_cents,
            by = state.opened_by.as_deref().unwrap_or_default(),
            "Operational day opened"
        );
        Ok(())
    }

    /// Closes the open day `date` and appends the closure `build` makes from
    /// the day's sales and invoice payments.
    ///
    /// No sale or payment can be booked between the read and the commit.
    /// Nothing is written when `build` fails.
    ///
    /// ## Errors
    /// `Conflict` when `date` is not the open day.
    pub async fn close_day<F, E>(&self, date: NaiveDate, build: F) -> Result<ClosureDetails, E>
    where
        F: FnOnce(&[Sale], &[InvoicePaymentRecord]) -> Result<ClosureDetails, E>,
        E: From<DbError>,
    {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE accounting_state SET
                is_day_open = 0, opening_cash_cents = 0, opened_at = NULL, opened_by = NULL
            WHERE id = 1 AND is_day_open = 1 AND current_operational_date = ?
            "#,
        )
        .bind(date)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!("operational day {} is not open", date)).into());
        }

        let sales = sales_between(&mut tx, date, date).await?;
        let payments = fetch_payments_on(&mut tx, date).await?;
        let closure = build(&sales, &payments)?;
        if closure.operational_date != date {
            return Err(DbError::conflict(format!(
                "closure for {} does not match open day {}",
                closure.operational_date, date
            ))
            .into());
        }

        insert_closure(&mut tx, &closure).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            date = %closure.operational_date,
            sales_count = closure.sales_count,
            expected_cents = closure.expected_cash_cents,
            counted_cents = closure.counted_cash_cents,
            difference_cents = closure.difference_cents,
            by = %closure.closed_by,
            "Operational day closed"
        );
        Ok(closure)
    }

    pub async fn last_closure(&self) -> DbResult<Option<ClosureDetails>> {
        let json: Option<String> = sqlx::query_scalar(
            "SELECT details_json FROM day_closures ORDER BY operational_date DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    /// Closed days, most recent first.
    pub async fn closures(&self, limit: Option<i64>) -> DbResult<Vec<ClosureDetails>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT details_json FROM day_closures ORDER BY operational_date DESC LIMIT ?",
        )
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|j| serde_json::from_str(j).map_err(DbError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, now, open_day, product};
    use shopdesk_core::sale::{prepare_sale, LineRequest, PaymentRequest, SaleContext, SaleRequest};
    use shopdesk_core::BusinessSettings;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn closure_for(day: NaiveDate) -> ClosureDetails {
        ClosureDetails {
            operational_date: day,
            opened_at: None,
            closed_at: now(),
            closed_by: "admin".to_string(),
            opening_cash_cents: 10000,
            sales_count: 3,
            total_sales_cents: 4500,
            cash_sales_cents: 3000,
            card_sales_cents: 1500,
            transfer_sales_cents: 0,
            credit_sales_cents: 0,
            invoice_cash_cents: 0,
            invoice_other_cents: 0,
            expected_cash_cents: 13000,
            counted_cash_cents: 12900,
            difference_cents: -100,
            cash_breakdown: Vec::new(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_first_read_initializes_date() {
        let db = db().await;
        let state = db.accounting().get(date("2026-10-19")).await.unwrap();
        assert_eq!(state.current_operational_date, date("2026-10-19"));
        assert!(!state.is_day_open);
        assert!(state.last_closure.is_none());

        // Later reads keep the stored date.
        let state = db.accounting().get(date("2026-10-25")).await.unwrap();
        assert_eq!(state.current_operational_date, date("2026-10-19"));
    }

    #[tokio::test]
    async fn test_open_twice_conflicts() {
        let db = db().await;
        let state = open_day(&db, date("2026-10-19")).await;

        let err = db.accounting().open_day(&state).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let stored = db.accounting().get(date("2026-10-19")).await.unwrap();
        assert!(stored.is_day_open);
        assert_eq!(stored.opened_by.as_deref(), Some("admin"));
    }

    async fn close(db: &crate::Database, day: NaiveDate) -> DbResult<ClosureDetails> {
        db.accounting()
            .close_day(day, |_, _| Ok::<_, DbError>(closure_for(day)))
            .await
    }

    #[tokio::test]
    async fn test_close_keeps_date_and_records_history() {
        let db = db().await;
        let day = date("2026-10-19");
        open_day(&db, day).await;

        let closure = close(&db, day).await.unwrap();

        let state = db.accounting().get(day).await.unwrap();
        assert!(!state.is_day_open);
        assert_eq!(state.current_operational_date, day);
        assert_eq!(state.opening_cash_cents, 0);
        assert_eq!(state.last_closure, Some(closure.clone()));

        // Closing again is refused.
        assert!(matches!(close(&db, day).await.unwrap_err(), DbError::Conflict(_)));

        open_day(&db, date("2026-10-20")).await;
        close(&db, date("2026-10-20")).await.unwrap();

        let history = db.accounting().closures(None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].operational_date, date("2026-10-20"));
        assert_eq!(db.accounting().closures(Some(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_close_counts_sales_booked_after_an_earlier_summary() {
        let db = db().await;
        let day = date("2026-10-19");
        let tea = product("Green Tea", 450, 10);
        db.products().insert(&tea).await.unwrap();
        let state = open_day(&db, day).await;

        // The register reads the day, then a sale lands before it closes.
        let seen_before = db.sales().list_between(day, day).await.unwrap().len();
        let request = SaleRequest {
            items: vec![LineRequest {
                product_id: tea.id.clone(),
                quantity: 2,
            }],
            payment: PaymentRequest::Cash { tendered_cents: 1000 },
            customer_id: None,
        };
        let prepared = prepare_sale(
            &request,
            &[tea.clone()],
            &state,
            None,
            &BusinessSettings::default(),
            SaleContext {
                sale_id: uuid::Uuid::new_v4().to_string(),
                invoice_id: uuid::Uuid::new_v4().to_string(),
                cashier_id: "cashier-1".to_string(),
                now: now(),
            },
        )
        .unwrap();
        db.sales().record(prepared).await.unwrap();

        let closure = db
            .accounting()
            .close_day(day, |sales, payments| {
                assert!(payments.is_empty());
                let mut closure = closure_for(day);
                closure.sales_count = sales.len() as i64;
                closure.cash_sales_cents = sales.iter().map(|s| s.total_cents).sum();
                Ok::<_, DbError>(closure)
            })
            .await
            .unwrap();

        assert_eq!(seen_before, 0);
        assert_eq!(closure.sales_count, 1);
        assert_eq!(closure.cash_sales_cents, 900);
        assert_eq!(db.accounting().last_closure().await.unwrap(), Some(closure));
    }

    #[tokio::test]
    async fn test_failed_close_leaves_day_open() {
        let db = db().await;
        let day = date("2026-10-19");
        open_day(&db, day).await;

        let err = db
            .accounting()
            .close_day(day, |_, _| Err::<ClosureDetails, _>(DbError::conflict("count rejected")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let state = db.accounting().get(day).await.unwrap();
        assert!(state.is_day_open);
        assert!(db.accounting().closures(None).await.unwrap().is_empty());

        // A closure for another date is refused too.
        let err = db
            .accounting()
            .close_day(day, |_, _| Ok::<_, DbError>(closure_for(date("2026-10-18"))))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert!(db.accounting().get(day).await.unwrap().is_day_open);
    }
}
