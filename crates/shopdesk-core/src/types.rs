//! # Domain Types
//!
//! Core domain types used throughout ShopDesk.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐        │
//! │  │   Product    │   │     Sale     │   │       Invoice        │        │
//! │  │  price_cents │◄──│  items[]     │──►│  (credit sales only) │        │
//! │  │  stock       │   │  payment     │   │  due_date, paid      │        │
//! │  └──────────────┘   │  op. date    │   └──────────┬───────────┘        │
//! │                     └──────┬───────┘              │                     │
//! │                            │                      ▼                     │
//! │  ┌──────────────┐          │           ┌──────────────────────┐        │
//! │  │    Order     │          │           │ InvoicePaymentRecord │        │
//! │  │  (no stock)  │          ▼           └──────────────────────┘        │
//! │  └──────────────┘   ┌──────────────────────┐                           │
//! │                     │  AccountingSettings  │ ── close ──► Closure      │
//! │                     │  is_day_open         │              Details      │
//! │                     └──────────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All wire JSON is camelCase; all amounts are integer cents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Display name, unique across the catalog (case-insensitive).
    pub name: String,
    pub category: String,
    /// Selling price in cents.
    pub price_cents: i64,
    /// Purchase cost in cents (for margin and stock valuation).
    pub cost_price_cents: i64,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Unit of measure shown next to quantities ("unit", "kg", "box").
    pub unit: String,
    pub image: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Checks if enough units are on hand.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Unit margin (price minus cost).
    pub fn margin(&self) -> Money {
        self.price() - self.cost_price()
    }

    #[inline]
    pub fn margin_cents(&self) -> i64 {
        self.margin().cents()
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Users & Roles
// =============================================================================

/// What a signed-in user may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    /// Full access: users, settings, backups, voids.
    Admin,
    /// Register sales, handle orders, open/close the day.
    Cashier,
}

impl Role {
    #[inline]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account. The password hash lives only in the database layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method & Details
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    /// Sold on account: creates an invoice.
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Method-specific details recorded with a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "method", rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentDetails {
    #[serde(rename_all = "camelCase")]
    Cash {
        tendered_cents: i64,
        change_cents: i64,
    },
    #[serde(rename_all = "camelCase")]
    Card { reference: Option<String> },
    #[serde(rename_all = "camelCase")]
    Transfer { reference: Option<String> },
    #[serde(rename_all = "camelCase")]
    Credit {
        invoice_id: String,
        invoice_number: String,
        #[ts(as = "String")]
        due_date: NaiveDate,
    },
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Cash { .. } => PaymentMethod::Cash,
            PaymentDetails::Card { .. } => PaymentMethod::Card,
            PaymentDetails::Transfer { .. } => PaymentMethod::Transfer,
            PaymentDetails::Credit { .. } => PaymentMethod::Credit,
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SaleStatus {
    Completed,
    Voided,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Voided => "voided",
        }
    }
}

/// A registered sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// `YYYYMMDD-NNNN`, sequential per operational date.
    pub receipt_number: String,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    /// Business day the sale is booked on (not the calendar timestamp).
    #[ts(as = "String")]
    pub operational_date: NaiveDate,
    pub items: Vec<SaleItem>,
    pub total_cents: i64,
    /// Sum of cost snapshots, for gross profit.
    pub cost_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment: PaymentDetails,
    pub customer_id: Option<String>,
    pub cashier_id: String,
    pub status: SaleStatus,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == SaleStatus::Completed
    }

    pub fn units(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// A line of a sale. Product data is frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub cost_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order. Orders never move stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// `ORD-00001`
    pub order_number: String,
    pub customer_id: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Accounting
// =============================================================================

/// One denomination line of a cash count (e.g. 7 × $20 bills).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DenominationCount {
    pub denomination_cents: i64,
    pub count: i64,
}

impl DenominationCount {
    pub fn subtotal(&self) -> CoreResult<Money> {
        Money::from_cents(self.denomination_cents).multiply_quantity(self.count)
    }
}

/// Current state of the business day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AccountingSettings {
    #[ts(as = "String")]
    pub current_operational_date: NaiveDate,
    pub is_day_open: bool,
    pub opening_cash_cents: i64,
    #[ts(as = "Option<String>")]
    pub opened_at: Option<DateTime<Utc>>,
    pub opened_by: Option<String>,
    pub last_closure: Option<ClosureDetails>,
}

impl AccountingSettings {
    /// Initial state: nothing opened yet.
    pub fn initial(today: NaiveDate) -> Self {
        AccountingSettings {
            current_operational_date: today,
            is_day_open: false,
            opening_cash_cents: 0,
            opened_at: None,
            opened_by: None,
            last_closure: None,
        }
    }

    /// Date of the last closed day, if any.
    pub fn last_closed_date(&self) -> Option<NaiveDate> {
        self.last_closure.as_ref().map(|c| c.operational_date)
    }
}

/// Result of closing an operational day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ClosureDetails {
    #[ts(as = "String")]
    pub operational_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub opened_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,
    pub closed_by: String,
    pub opening_cash_cents: i64,
    pub sales_count: i64,
    pub total_sales_cents: i64,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub transfer_sales_cents: i64,
    pub credit_sales_cents: i64,
    /// Cash collected on invoices during the day.
    pub invoice_cash_cents: i64,
    /// Card/transfer collected on invoices during the day.
    pub invoice_other_cents: i64,
    pub expected_cash_cents: i64,
    pub counted_cash_cents: i64,
    /// counted − expected. Positive is a surplus, negative a shortage.
    pub difference_cents: i64,
    pub cash_breakdown: Vec<DenominationCount>,
    pub notes: Option<String>,
}

// =============================================================================
// Invoices (accounts receivable)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum InvoiceStatus {
    Pending,
    Overdue,
    Paid,
    Voided,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Voided => "voided",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invoice raised by a credit sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// `INV-000001`
    pub invoice_number: String,
    pub sale_id: String,
    pub customer_id: String,
    pub customer_name: String,
    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

/// A payment received against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoicePaymentRecord {
    pub id: String,
    pub invoice_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[ts(as = "String")]
    pub operational_date: NaiveDate,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    pub recorded_by: String,
    pub notes: Option<String>,
}

// =============================================================================
// Settings
// =============================================================================

/// Business identity and store-wide rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct BusinessSettings {
    pub business_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub currency_symbol: String,
    /// Stock at or below this is reported as low.
    pub low_stock_threshold: i64,
    pub receipt_footer: Option<String>,
    /// Default credit term for invoices, in days.
    pub invoice_due_days: i64,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        BusinessSettings {
            business_name: "My Store".to_string(),
            address: None,
            phone: None,
            tax_id: None,
            currency_symbol: "$".to_string(),
            low_stock_threshold: 5,
            receipt_footer: None,
            invoice_due_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_details_wire_format() {
        let details = PaymentDetails::Cash {
            tendered_cents: 2000,
            change_cents: 250,
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["method"], "cash");
        assert_eq!(json["tenderedCents"], 2000);
        assert_eq!(json["changeCents"], 250);
        assert_eq!(details.method(), PaymentMethod::Cash);

        let credit: PaymentDetails = serde_json::from_str(
            r#"{"method":"credit","invoiceId":"i-1","invoiceNumber":"INV-000001","dueDate":"2026-11-18"}"#,
        )
        .unwrap();
        assert_eq!(credit.method(), PaymentMethod::Credit);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert!(Role::Admin.is_admin());
        assert!(!Role::Cashier.is_admin());
    }

    #[test]
    fn test_business_settings_defaults_fill_missing_fields() {
        let settings: BusinessSettings =
            serde_json::from_str(r#"{"businessName":"Corner Shop"}"#).unwrap();
        assert_eq!(settings.business_name, "Corner Shop");
        assert_eq!(settings.low_stock_threshold, 5);
        assert_eq!(settings.invoice_due_days, 30);
    }

    #[test]
    fn test_denomination_subtotal() {
        let line = DenominationCount {
            denomination_cents: 2000,
            count: 7,
        };
        assert_eq!(line.subtotal().unwrap().cents(), 14000);

        let huge = DenominationCount {
            denomination_cents: 10_000,
            count: i64::MAX / 100,
        };
        assert!(huge.subtotal().is_err());
    }
}
