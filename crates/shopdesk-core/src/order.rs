//! # Orders
//!
//! Customer orders with a small status workflow. Orders record what a
//! customer asked for; they never move stock.
//!
//! ## Status Workflow
//! ```text
//!   pending ──► processing ──► completed
//!      │             │
//!      └─────┬───────┘
//!            ▼
//!        cancelled
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::sale::LineRequest;
use crate::types::{Order, OrderItem, OrderStatus, Product};
use crate::validation::{normalize_optional, validate_quantity};
use crate::MAX_LINE_ITEMS;

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewOrder {
    pub customer_id: Option<String>,
    pub items: Vec<LineRequest>,
    pub notes: Option<String>,
}

/// Body of `PATCH /api/orders/:id/status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

impl NewOrder {
    pub fn validate(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(ValidationError::required("items").into());
        }
        if self.items.len() > MAX_LINE_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: MAX_LINE_ITEMS as i64,
            }
            .into());
        }
        for line in &self.items {
            validate_quantity(line.quantity)?;
        }
        Ok(())
    }
}

impl OrderStatus {
    /// Whether the workflow allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Cancelled) | (Processing, Completed) | (Processing, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Builds an order priced at current catalog prices.
///
/// The order number is sequential and assigned by the database layer.
pub fn build_order(
    input: NewOrder,
    products: &[Product],
    id: String,
    now: DateTime<Utc>,
) -> CoreResult<Order> {
    input.validate()?;

    let mut items = Vec::with_capacity(input.items.len());
    for line in &input.items {
        let product = products
            .iter()
            .find(|p| p.id == line.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        items.push(OrderItem {
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity: line.quantity,
            line_total_cents: product.price().multiply_quantity(line.quantity)?.cents(),
        });
    }

    let mut total = Money::zero();
    for item in &items {
        total = total.try_add(Money::from_cents(item.line_total_cents))?;
    }

    Ok(Order {
        id,
        order_number: String::new(),
        customer_id: normalize_optional(input.customer_id),
        status: OrderStatus::Pending,
        items,
        total_amount_cents: total.cents(),
        notes: normalize_optional(input.notes),
        created_at: now,
        updated_at: now,
    })
}

/// Moves an order to a new status.
pub fn transition(order: &Order, next: OrderStatus, now: DateTime<Utc>) -> CoreResult<Order> {
    if !order.status.can_transition_to(next) {
        return Err(CoreError::InvalidStatusTransition {
            entity: format!("Order {}", order.order_number),
            from: order.status.to_string(),
            to: next.to_string(),
        });
    }

    let mut updated = order.clone();
    updated.status = next;
    updated.updated_at = now;
    Ok(updated)
}

/// Only orders that never went into processing, or were cancelled, may be
/// deleted.
pub fn check_deletable(order: &Order) -> CoreResult<()> {
    match order.status {
        OrderStatus::Pending | OrderStatus::Cancelled => Ok(()),
        other => Err(CoreError::InvalidStatusTransition {
            entity: format!("Order {}", order.order_number),
            from: other.to_string(),
            to: "deleted".to_string(),
        }),
    }
}
