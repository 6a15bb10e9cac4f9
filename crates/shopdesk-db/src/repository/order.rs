//! # Order Repository
//!
//! Customer orders. Orders never touch stock.
//!
//! Order numbers (`ORD-00001`) are computed by the INSERT itself, so two
//! registers creating orders at the same time cannot get the same number.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use shopdesk_core::{Order, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str = r#"
    id, order_number, customer_id, status, total_amount_cents, notes,
    created_at, updated_at
"#;

const ITEM_COLUMNS: &str =
    "order_id, product_id, name_snapshot, unit_price_cents, quantity, line_total_cents";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    customer_id: Option<String>,
    status: OrderStatus,
    total_amount_cents: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            customer_id: self.customer_id,
            status: self.status,
            items,
            total_amount_cents: self.total_amount_cents,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    order_id: String,
    #[sqlx(flatten)]
    item: OrderItem,
}

fn assemble(rows: Vec<OrderRow>, items: Vec<OrderItemRow>) -> Vec<Order> {
    let mut by_order: HashMap<String, Vec<OrderItem>> = HashMap::new();
    for row in items {
        by_order.entry(row.order_id).or_default().push(row.item);
    }

    rows.into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect()
}

async fn insert_items(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    for (line_no, item) in order.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                order_id, line_no, product_id, name_snapshot, unit_price_cents,
                quantity, line_total_cents
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(line_no as i64 + 1)
        .bind(&item.product_id)
        .bind(&item.name_snapshot)
        .bind(item.unit_price_cents)
        .bind(item.quantity)
        .bind(item.line_total_cents)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Inserts an order that already carries its number (backup import).
pub(crate) async fn insert_numbered_order(
    conn: &mut SqliteConnection,
    order: &Order,
    sequence: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, sequence, customer_id, status, total_amount_cents,
            notes, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(sequence)
    .bind(&order.customer_id)
    .bind(order.status)
    .bind(order.total_amount_cents)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_value(&order.order_number))?;

    insert_items(conn, order).await
}

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a new order and returns it with its order number.
    pub async fn insert(&self, order: &Order) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order_number: String = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                id, order_number, sequence, customer_id, status, total_amount_cents,
                notes, created_at, updated_at
            )
            SELECT ?1, printf('ORD-%05d', n), n, ?2, ?3, ?4, ?5, ?6, ?7
            FROM (SELECT COALESCE(MAX(sequence), 0) + 1 AS n FROM orders)
            RETURNING order_number
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(order.status)
        .bind(order.total_amount_cents)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        insert_items(&mut tx, order).await?;
        tx.commit().await?;

        info!(order_id = %order.id, order_number = %order_number, "Order created");

        Ok(Order {
            order_number,
            ..order.clone()
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = ?",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {} FROM order_items WHERE order_id = ? ORDER BY line_no",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(vec![row], items).pop())
    }

    /// Orders, newest first, optionally with one status.
    pub async fn list(&self, status: Option<OrderStatus>) -> DbResult<Vec<Order>> {
        debug!(?status, "Listing orders");

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE ?1 IS NULL OR status = ?1 ORDER BY sequence DESC",
            ORDER_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            r#"
            SELECT {} FROM order_items
            WHERE order_id IN (SELECT id FROM orders WHERE ?1 IS NULL OR status = ?1)
            ORDER BY order_id, line_no
            "#,
            ITEM_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(rows, items))
    }

    /// Writes a status change computed from an order in status `from`.
    ///
    /// ## Errors
    /// `Conflict` when the stored status is no longer `from`.
    pub async fn update_status(&self, updated: &Order, from: OrderStatus) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(updated.status)
        .bind(updated.updated_at)
        .bind(&updated.id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!(
                "order {} is no longer {}",
                updated.order_number, from
            )));
        }

        info!(order = %updated.order_number, %from, to = %updated.status, "Order status changed");
        Ok(())
    }

    /// Deletes a pending or cancelled order.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "DELETE FROM orders WHERE id = ? AND status IN ('pending', 'cancelled')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(order) => Err(DbError::conflict(format!(
                    "order {} is {} and cannot be deleted",
                    order.order_number, order.status
                ))),
                None => Err(DbError::not_found("Order", id)),
            };
        }

        Ok(())
    }
}
