//! # Sales Registration
//!
//! Turns a register request into a fully priced sale, enforcing the rules
//! the register must respect.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleRequest { items, payment, customerId }                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  prepare_sale() ← THIS MODULE                                           │
//! │       ├── day closed?            → DayClosed                            │
//! │       ├── unknown product?       → ProductNotFound                      │
//! │       ├── qty > stock?           → InsufficientStock                    │
//! │       ├── cash < total?          → InsufficientCash                     │
//! │       ├── credit w/o customer?   → CustomerRequired                     │
//! │       ▼                                                                 │
//! │  PreparedSale { sale, invoice? }                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleRepository::record() (receipt/invoice numbers, stock, one tx)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    AccountingSettings, BusinessSettings, Customer, Invoice, InvoiceStatus, PaymentDetails,
    Product, Sale, SaleItem, SaleStatus,
};
use crate::validation::{normalize_optional, validate_quantity};
use crate::MAX_LINE_ITEMS;

// =============================================================================
// Request Types
// =============================================================================

/// One requested line: which product and how many.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// How the customer pays.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "method", rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentRequest {
    #[serde(rename_all = "camelCase")]
    Cash { tendered_cents: i64 },
    #[serde(rename_all = "camelCase")]
    Card { reference: Option<String> },
    #[serde(rename_all = "camelCase")]
    Transfer { reference: Option<String> },
    /// On account. Due date defaults to the configured credit term.
    #[serde(rename_all = "camelCase")]
    Credit {
        #[ts(as = "Option<String>")]
        due_date: Option<NaiveDate>,
    },
}

/// Body of `POST /api/sales`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleRequest {
    pub items: Vec<LineRequest>,
    pub payment: PaymentRequest,
    pub customer_id: Option<String>,
}

/// Identity and time of the sale being prepared.
#[derive(Debug, Clone)]
pub struct SaleContext {
    pub sale_id: String,
    /// Used only when the sale raises an invoice.
    pub invoice_id: String,
    pub cashier_id: String,
    pub now: DateTime<Utc>,
}

/// A validated, priced sale waiting to be persisted.
///
/// Receipt and invoice numbers are sequential, so the database layer assigns
/// them inside the write transaction via [`PreparedSale::assign_numbers`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSale {
    pub sale: Sale,
    pub invoice: Option<Invoice>,
}

impl PreparedSale {
    /// Fills in the sequential numbers and keeps the sale's credit details in
    /// step with its invoice.
    pub fn assign_numbers(&mut self, receipt_number: String, invoice_number: Option<String>) {
        self.sale.receipt_number = receipt_number;

        if let (Some(invoice), Some(number)) = (self.invoice.as_mut(), invoice_number) {
            invoice.invoice_number = number.clone();
            if let PaymentDetails::Credit { invoice_number, .. } = &mut self.sale.payment {
                *invoice_number = number;
            }
        }
    }

    /// Quantity to take out of stock per product.
    pub fn stock_movements(&self) -> impl Iterator<Item = (&str, i64)> {
        self.sale
            .items
            .iter()
            .map(|item| (item.product_id.as_str(), item.quantity))
    }
}

// =============================================================================
// Preparation
// =============================================================================

/// Merges repeated product lines, keeping the first-seen order.
fn merge_lines(items: &[LineRequest]) -> Vec<(String, i64)> {
    let mut merged: Vec<(String, i64)> = Vec::with_capacity(items.len());
    for line in items {
        match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, qty)) => *qty += line.quantity,
            None => merged.push((line.product_id.clone(), line.quantity)),
        }
    }
    merged
}

/// Validates and prices a sale.
///
/// `products` must contain every product referenced by the request (extra
/// products are ignored). `customer` must be the customer named by
/// `request.customer_id`, if any.
pub fn prepare_sale(
    request: &SaleRequest,
    products: &[Product],
    accounting: &AccountingSettings,
    customer: Option<&Customer>,
    settings: &BusinessSettings,
    ctx: SaleContext,
) -> CoreResult<PreparedSale> {
    if !accounting.is_day_open {
        return Err(CoreError::DayClosed);
    }

    if request.items.is_empty() {
        return Err(ValidationError::required("items").into());
    }
    if request.items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        }
        .into());
    }
    for line in &request.items {
        validate_quantity(line.quantity)?;
    }

    let operational_date = accounting.current_operational_date;

    let mut items = Vec::new();
    for (product_id, quantity) in merge_lines(&request.items) {
        validate_quantity(quantity)?;

        let product = products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;

        if !product.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        items.push(SaleItem {
            product_id: product.id.clone(),
            name_snapshot: product.name.clone(),
            unit_price_cents: product.price_cents,
            cost_price_cents: product.cost_price_cents,
            quantity,
            line_total_cents: product.price().multiply_quantity(quantity)?.cents(),
        });
    }

    let mut total = Money::zero();
    let mut cost = Money::zero();
    for item in &items {
        total = total.try_add(Money::from_cents(item.line_total_cents))?;
        cost = cost.try_add(Money::from_cents(item.cost_price_cents).multiply_quantity(item.quantity)?)?;
    }

    let mut invoice = None;
    let payment = match &request.payment {
        PaymentRequest::Cash { tendered_cents } => {
            let tendered = Money::from_cents(*tendered_cents);
            if tendered < total {
                return Err(CoreError::InsufficientCash { total, tendered });
            }
            PaymentDetails::Cash {
                tendered_cents: tendered.cents(),
                change_cents: (tendered - total).cents(),
            }
        }
        PaymentRequest::Card { reference } => PaymentDetails::Card {
            reference: normalize_optional(reference.clone()),
        },
        PaymentRequest::Transfer { reference } => PaymentDetails::Transfer {
            reference: normalize_optional(reference.clone()),
        },
        PaymentRequest::Credit { due_date } => {
            let customer = customer.ok_or(CoreError::CustomerRequired)?;
            let due_date = due_date
                .unwrap_or_else(|| operational_date + Duration::days(settings.invoice_due_days.max(0)));
            if due_date < operational_date {
                return Err(ValidationError::invalid(
                    "dueDate",
                    "must not be before the operational date",
                )
                .into());
            }

            invoice = Some(Invoice {
                id: ctx.invoice_id.clone(),
                invoice_number: String::new(),
                sale_id: ctx.sale_id.clone(),
                customer_id: customer.id.clone(),
                customer_name: customer.name.clone(),
                issue_date: operational_date,
                due_date,
                amount_cents: total.cents(),
                paid_cents: 0,
                status: InvoiceStatus::Pending,
                created_at: ctx.now,
                paid_at: None,
            });

            PaymentDetails::Credit {
                invoice_id: ctx.invoice_id.clone(),
                invoice_number: String::new(),
                due_date,
            }
        }
    };

    let sale = Sale {
        id: ctx.sale_id,
        receipt_number: String::new(),
        sold_at: ctx.now,
        operational_date,
        items,
        total_cents: total.cents(),
        cost_cents: cost.cents(),
        payment_method: payment.method(),
        payment,
        customer_id: customer.map(|c| c.id.clone()),
        cashier_id: ctx.cashier_id,
        status: SaleStatus::Completed,
        voided_at: None,
    };

    Ok(PreparedSale { sale, invoice })
}

// =============================================================================
// Voiding
// =============================================================================

/// Checks whether a sale may be voided.
///
/// ## Rules
/// - the sale is still completed
/// - it belongs to the operational day that is currently open
/// - a linked invoice has not received any payment
pub fn check_voidable(
    sale: &Sale,
    accounting: &AccountingSettings,
    invoice: Option<&Invoice>,
) -> CoreResult<()> {
    let cannot = |reason: &str| CoreError::CannotVoid {
        receipt_number: sale.receipt_number.clone(),
        reason: reason.to_string(),
    };

    if sale.status == SaleStatus::Voided {
        return Err(cannot("it is already voided"));
    }

    if !accounting.is_day_open || sale.operational_date != accounting.current_operational_date {
        return Err(cannot("only sales of the open operational day can be voided"));
    }

    if invoice.is_some_and(|inv| inv.paid_cents > 0) {
        return Err(cannot("its invoice has received payments"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn product(id: &str, price: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            category: "General".to_string(),
            price_cents: price,
            cost_price_cents: price / 2,
            stock,
            unit: "unit".to_string(),
            image: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn open_day() -> AccountingSettings {
        AccountingSettings {
            is_day_open: true,
            opening_cash_cents: 10000,
            ..AccountingSettings::initial(date("2026-10-19"))
        }
    }

    fn customer() -> Customer {
        let now = Utc::now();
        Customer {
            id: "c-1".to_string(),
            name: "Ana Ruiz".to_string(),
            email: None,
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ctx() -> SaleContext {
        SaleContext {
            sale_id: "s-1".to_string(),
            invoice_id: "i-1".to_string(),
            cashier_id: "u-1".to_string(),
            now: Utc::now(),
        }
    }

    fn request(lines: &[(&str, i64)], payment: PaymentRequest) -> SaleRequest {
        SaleRequest {
            items: lines
                .iter()
                .map(|(id, qty)| LineRequest {
                    product_id: id.to_string(),
                    quantity: *qty,
                })
                .collect(),
            payment,
            customer_id: None,
        }
    }

    #[test]
    fn test_cash_sale_computes_change_and_cost() {
        let products = vec![product("a", 250, 10), product("b", 1000, 2)];
        let req = request(
            &[("a", 2), ("b", 1)],
            PaymentRequest::Cash { tendered_cents: 2000 },
        );

        let prepared = prepare_sale(
            &req,
            &products,
            &open_day(),
            None,
            &BusinessSettings::default(),
            ctx(),
        )
        .unwrap();

        assert_eq!(prepared.sale.total_cents, 1500);
        assert_eq!(prepared.sale.cost_cents, 750);
        assert_eq!(prepared.sale.operational_date, date("2026-10-19"));
        assert_eq!(
            prepared.sale.payment,
            PaymentDetails::Cash { tendered_cents: 2000, change_cents: 500 }
        );
        assert!(prepared.invoice.is_none());
    }

    #[test]
    fn test_sale_total_beyond_cents_is_rejected() {
        // Restored backups can carry prices no form would accept.
        let products = vec![product("a", i64::MAX / 2, 10)];
        let req = request(&[("a", 3)], PaymentRequest::Card { reference: None });

        let err = prepare_sale(&req, &products, &open_day(), None, &BusinessSettings::default(), ctx())
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow(_)));

        // Lines that fit alone but not together.
        let products = vec![product("a", i64::MAX / 2, 10), product("b", i64::MAX / 2, 10)];
        let req = request(&[("a", 1), ("b", 2)], PaymentRequest::Card { reference: None });
        let err = prepare_sale(&req, &products, &open_day(), None, &BusinessSettings::default(), ctx())
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow(_)));
    }

    #[test]
    fn test_sale_rejected_when_day_closed() {
        let products = vec![product("a", 250, 10)];
        let req = request(&[("a", 1)], PaymentRequest::Card { reference: None });
        let closed = AccountingSettings::initial(date("2026-10-19"));

        let err = prepare_sale(&req, &products, &closed, None, &BusinessSettings::default(), ctx())
            .unwrap_err();
        assert!(matches!(err, CoreError::DayClosed));
    }

    #[test]
    fn test_duplicate_lines_are_merged_before_stock_check() {
        let products = vec![product("a", 250, 3)];
        let req = request(&[("a", 2), ("a", 2)], PaymentRequest::Card { reference: None });

        let err = prepare_sale(&req, &products, &open_day(), None, &BusinessSettings::default(), ctx())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 3, requested: 4, .. }
        ));
    }

    #[test]
    fn test_insufficient_cash() {
        let products = vec![product("a", 1250, 3)];
        let req = request(&[("a", 1)], PaymentRequest::Cash { tendered_cents: 1000 });

        let err = prepare_sale(&req, &products, &open_day(), None, &BusinessSettings::default(), ctx())
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientCash { .. }));
    }

    #[test]
    fn test_unknown_product() {
        let req = request(&[("zzz", 1)], PaymentRequest::Card { reference: None });
        let err = prepare_sale(&req, &[], &open_day(), None, &BusinessSettings::default(), ctx())
            .unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == "zzz"));
    }

    #[test]
    fn test_credit_sale_requires_customer() {
        let products = vec![product("a", 500, 3)];
        let req = request(&[("a", 1)], PaymentRequest::Credit { due_date: None });

        let err = prepare_sale(&req, &products, &open_day(), None, &BusinessSettings::default(), ctx())
            .unwrap_err();
        assert!(matches!(err, CoreError::CustomerRequired));
    }

    #[test]
    fn test_credit_sale_creates_invoice_with_default_term() {
        let products = vec![product("a", 500, 3)];
        let req = request(&[("a", 2)], PaymentRequest::Credit { due_date: None });
        let customer = customer();

        let mut prepared = prepare_sale(
            &req,
            &products,
            &open_day(),
            Some(&customer),
            &BusinessSettings::default(),
            ctx(),
        )
        .unwrap();

        let invoice = prepared.invoice.clone().unwrap();
        assert_eq!(invoice.amount_cents, 1000);
        assert_eq!(invoice.due_date, date("2026-11-18"));
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(prepared.sale.customer_id.as_deref(), Some("c-1"));

        prepared.assign_numbers("20261019-0001".to_string(), Some("INV-000007".to_string()));
        assert_eq!(prepared.sale.receipt_number, "20261019-0001");
        assert_eq!(prepared.invoice.as_ref().unwrap().invoice_number, "INV-000007");
        assert!(matches!(
            &prepared.sale.payment,
            PaymentDetails::Credit { invoice_number, .. } if invoice_number == "INV-000007"
        ));
    }

    #[test]
    fn test_credit_due_date_before_operational_date() {
        let products = vec![product("a", 500, 3)];
        let req = request(
            &[("a", 1)],
            PaymentRequest::Credit { due_date: Some(date("2026-10-01")) },
        );
        let customer = customer();

        let err = prepare_sale(
            &req,
            &products,
            &open_day(),
            Some(&customer),
            &BusinessSettings::default(),
            ctx(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_check_voidable() {
        let products = vec![product("a", 500, 3)];
        let req = request(&[("a", 1)], PaymentRequest::Card { reference: None });
        let day = open_day();
        let prepared =
            prepare_sale(&req, &products, &day, None, &BusinessSettings::default(), ctx()).unwrap();

        assert!(check_voidable(&prepared.sale, &day, None).is_ok());

        let mut next_day = day.clone();
        next_day.current_operational_date = date("2026-10-20");
        assert!(check_voidable(&prepared.sale, &next_day, None).is_err());

        let mut voided = prepared.sale.clone();
        voided.status = SaleStatus::Voided;
        assert!(check_voidable(&voided, &day, None).is_err());
    }
}
