//! # Reports
//!
//! Sales and inventory reports, and their CSV exports.
//!
//! ## Sales Report Shape
//! ```text
//! SalesReport
//! ├── totals      revenue, cost, gross profit, count, avg ticket, units
//! ├── byMethod    cash / card / transfer / credit
//! ├── daily[]     one bucket per date in [from, to], zero-filled
//! └── topProducts best 10 by revenue
//! ```
//!
//! Only completed sales count. Voided sales are ignored everywhere.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Product, Sale};
use crate::TOP_PRODUCTS_LIMIT;

// =============================================================================
// Sales Report
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MethodTotals {
    pub cash_cents: i64,
    pub card_cents: i64,
    pub transfer_cents: i64,
    pub credit_cents: i64,
}

impl MethodTotals {
    fn add(&mut self, method: PaymentMethod, cents: i64) {
        match method {
            PaymentMethod::Cash => self.cash_cents += cents,
            PaymentMethod::Card => self.card_cents += cents,
            PaymentMethod::Transfer => self.transfer_cents += cents,
            PaymentMethod::Credit => self.credit_cents += cents,
        }
    }
}

/// One day of the sales chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailyBucket {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sales_count: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductPerformance {
    pub product_id: String,
    pub name: String,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesReport {
    #[ts(as = "String")]
    pub from: NaiveDate,
    #[ts(as = "String")]
    pub to: NaiveDate,
    pub sales_count: i64,
    pub units_sold: i64,
    pub revenue_cents: i64,
    pub cost_cents: i64,
    pub gross_profit_cents: i64,
    pub average_ticket_cents: i64,
    pub by_method: MethodTotals,
    pub daily: Vec<DailyBucket>,
    pub top_products: Vec<ProductPerformance>,
}

impl SalesReport {
    /// Builds the report for `[from, to]` by operational date.
    pub fn build(from: NaiveDate, to: NaiveDate, sales: &[Sale]) -> Self {
        let mut daily: Vec<DailyBucket> = from
            .iter_days()
            .take_while(|d| *d <= to)
            .map(|date| DailyBucket {
                date,
                sales_count: 0,
                revenue_cents: 0,
            })
            .collect();

        let mut report = SalesReport {
            from,
            to,
            sales_count: 0,
            units_sold: 0,
            revenue_cents: 0,
            cost_cents: 0,
            gross_profit_cents: 0,
            average_ticket_cents: 0,
            by_method: MethodTotals::default(),
            daily: Vec::new(),
            top_products: Vec::new(),
        };

        let mut per_product: HashMap<&str, ProductPerformance> = HashMap::new();

        let in_range = sales
            .iter()
            .filter(|s| s.is_completed() && s.operational_date >= from && s.operational_date <= to);

        for sale in in_range {
            report.sales_count += 1;
            report.revenue_cents += sale.total_cents;
            report.cost_cents += sale.cost_cents;
            report.by_method.add(sale.payment_method, sale.total_cents);

            let offset = (sale.operational_date - from).num_days() as usize;
            if let Some(bucket) = daily.get_mut(offset) {
                bucket.sales_count += 1;
                bucket.revenue_cents += sale.total_cents;
            }

            for item in &sale.items {
                report.units_sold += item.quantity;
                let entry = per_product
                    .entry(item.product_id.as_str())
                    .or_insert_with(|| ProductPerformance {
                        product_id: item.product_id.clone(),
                        name: item.name_snapshot.clone(),
                        units_sold: 0,
                        revenue_cents: 0,
                    });
                entry.units_sold += item.quantity;
                entry.revenue_cents += item.line_total_cents;
            }
        }

        report.gross_profit_cents = report.revenue_cents - report.cost_cents;
        if report.sales_count > 0 {
            report.average_ticket_cents = report.revenue_cents / report.sales_count;
        }

        let mut top: Vec<ProductPerformance> = per_product.into_values().collect();
        top.sort_by(|a, b| {
            b.revenue_cents
                .cmp(&a.revenue_cents)
                .then_with(|| a.name.cmp(&b.name))
        });
        top.truncate(TOP_PRODUCTS_LIMIT);

        report.daily = daily;
        report.top_products = top;
        report
    }
}

// =============================================================================
// Inventory Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockAlert {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub stock: i64,
    pub unit: String,
}

impl From<&Product> for StockAlert {
    fn from(p: &Product) -> Self {
        StockAlert {
            product_id: p.id.clone(),
            name: p.name.clone(),
            category: p.category.clone(),
            stock: p.stock,
            unit: p.unit.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryReport {
    pub product_count: i64,
    pub total_units: i64,
    pub stock_value_cost_cents: i64,
    pub stock_value_retail_cents: i64,
    pub low_stock_threshold: i64,
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
}

impl InventoryReport {
    pub fn build(products: &[Product], low_stock_threshold: i64) -> Self {
        let mut low_stock: Vec<StockAlert> = products
            .iter()
            .filter(|p| p.stock > 0 && p.stock <= low_stock_threshold)
            .map(StockAlert::from)
            .collect();
        low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

        InventoryReport {
            product_count: products.len() as i64,
            total_units: products.iter().map(|p| p.stock).sum(),
            stock_value_cost_cents: products
                .iter()
                .map(|p| p.cost_price() * p.stock)
                .sum::<Money>()
                .cents(),
            stock_value_retail_cents: products
                .iter()
                .map(|p| p.price() * p.stock)
                .sum::<Money>()
                .cents(),
            low_stock_threshold,
            low_stock,
            out_of_stock: products
                .iter()
                .filter(|p| p.stock <= 0)
                .map(StockAlert::from)
                .collect(),
        }
    }
}

// =============================================================================
// CSV Export
// =============================================================================

fn decimal(cents: i64) -> String {
    let m = Money::from_cents(cents);
    let sign = if m.is_negative() { "-" } else { "" };
    format!("{}{}.{:02}", sign, m.dollars().abs(), m.cents_part())
}

fn export_err(e: impl std::fmt::Display) -> CoreError {
    CoreError::Export(e.to_string())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> CoreResult<String> {
    let bytes = writer.into_inner().map_err(export_err)?;
    String::from_utf8(bytes).map_err(export_err)
}

/// One row per sale, voided sales included with their status.
pub fn sales_csv(sales: &[Sale]) -> CoreResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "receipt_number",
            "operational_date",
            "sold_at",
            "status",
            "payment_method",
            "items",
            "units",
            "total",
            "cost",
            "customer_id",
        ])
        .map_err(export_err)?;

    for sale in sales {
        writer
            .write_record([
                sale.receipt_number.clone(),
                sale.operational_date.to_string(),
                sale.sold_at.to_rfc3339(),
                sale.status.as_str().to_string(),
                sale.payment_method.to_string(),
                sale.items.len().to_string(),
                sale.units().to_string(),
                decimal(sale.total_cents),
                decimal(sale.cost_cents),
                sale.customer_id.clone().unwrap_or_default(),
            ])
            .map_err(export_err)?;
    }

    finish(writer)
}

/// One row per product.
pub fn inventory_csv(products: &[Product]) -> CoreResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["name", "category", "unit", "stock", "price", "cost_price", "stock_value"])
        .map_err(export_err)?;

    for p in products {
        writer
            .write_record([
                p.name.clone(),
                p.category.clone(),
                p.unit.clone(),
                p.stock.to_string(),
                decimal(p.price_cents),
                decimal(p.cost_price_cents),
                decimal((p.cost_price() * p.stock).cents()),
            ])
            .map_err(export_err)?;
    }

    finish(writer)
}

/// Number of days in `[from, to]`.
pub fn days_in_range(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from + Duration::days(1)).num_days().max(0)
}
