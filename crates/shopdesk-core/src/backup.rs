//! # Backup Format
//!
//! Full-store JSON snapshot used by `GET/POST /api/backup`.
//!
//! ```text
//! {
//!   "version": 1,
//!   "backupTimestamp": "2026-10-19T21:04:11Z",
//!   "products": [...], "customers": [...], "users": [...],
//!   "sales": [...], "orders": [...], "invoices": [...],
//!   "invoicePayments": [...], "closures": [...],
//!   "accountingSettings": {...}, "businessSettings": {...}, "appSettings": {...}
//! }
//! ```
//!
//! Importing replaces everything, so a file is checked completely before
//! any of it is written.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{
    AccountingSettings, BusinessSettings, ClosureDetails, Customer, Invoice, InvoicePaymentRecord,
    Order, Product, Sale, User,
};

pub const BACKUP_VERSION: u32 = 1;

/// A user together with its password hash, as stored in backups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupUser {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    pub version: u32,
    pub backup_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub users: Vec<BackupUser>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub invoice_payments: Vec<InvoicePaymentRecord>,
    #[serde(default)]
    pub closures: Vec<ClosureDetails>,
    pub accounting_settings: AccountingSettings,
    #[serde(default)]
    pub business_settings: BusinessSettings,
    #[serde(default)]
    pub app_settings: serde_json::Value,
}

/// Entity counts, returned after export or import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCounts {
    pub products: usize,
    pub customers: usize,
    pub users: usize,
    pub sales: usize,
    pub orders: usize,
    pub invoices: usize,
    pub invoice_payments: usize,
    pub closures: usize,
}

fn malformed(msg: impl Into<String>) -> CoreError {
    CoreError::MalformedBackup(msg.into())
}

fn unique_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> CoreResult<HashSet<&'a str>> {
    let mut set = HashSet::new();
    for id in ids {
        if !set.insert(id) {
            return Err(malformed(format!("duplicate {} id {}", kind, id)));
        }
    }
    Ok(set)
}

impl BackupData {
    /// Parses and checks a backup file.
    ///
    /// ## Errors
    /// `MalformedBackup` for invalid JSON, an unsupported version, duplicate
    /// ids or references to records missing from the file.
    pub fn parse(bytes: &[u8]) -> CoreResult<Self> {
        let data: BackupData =
            serde_json::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
        data.check()?;
        Ok(data)
    }

    /// Referential checks. Sale and order lines carry product snapshots, so
    /// they may name products that no longer exist.
    pub fn check(&self) -> CoreResult<()> {
        if self.version != BACKUP_VERSION {
            return Err(malformed(format!(
                "unsupported version {} (expected {})",
                self.version, BACKUP_VERSION
            )));
        }

        unique_ids("product", self.products.iter().map(|p| p.id.as_str()))?;
        let customers = unique_ids("customer", self.customers.iter().map(|c| c.id.as_str()))?;
        unique_ids("user", self.users.iter().map(|u| u.user.id.as_str()))?;
        let sales = unique_ids("sale", self.sales.iter().map(|s| s.id.as_str()))?;
        unique_ids("order", self.orders.iter().map(|o| o.id.as_str()))?;
        let invoices = unique_ids("invoice", self.invoices.iter().map(|i| i.id.as_str()))?;
        unique_ids(
            "invoice payment",
            self.invoice_payments.iter().map(|p| p.id.as_str()),
        )?;

        let mut usernames = HashSet::new();
        for u in &self.users {
            if !usernames.insert(u.user.username.to_lowercase()) {
                return Err(malformed(format!("duplicate username {}", u.user.username)));
            }
        }

        for sale in &self.sales {
            if let Some(customer) = &sale.customer_id {
                if !customers.contains(customer.as_str()) {
                    return Err(malformed(format!(
                        "sale {} references unknown customer {}",
                        sale.receipt_number, customer
                    )));
                }
            }
        }

        for order in &self.orders {
            if let Some(customer) = &order.customer_id {
                if !customers.contains(customer.as_str()) {
                    return Err(malformed(format!(
                        "order {} references unknown customer {}",
                        order.order_number, customer
                    )));
                }
            }
        }

        for invoice in &self.invoices {
            if !sales.contains(invoice.sale_id.as_str()) {
                return Err(malformed(format!(
                    "invoice {} references unknown sale {}",
                    invoice.invoice_number, invoice.sale_id
                )));
            }
        }

        for payment in &self.invoice_payments {
            if !invoices.contains(payment.invoice_id.as_str()) {
                return Err(malformed(format!(
                    "payment {} references unknown invoice {}",
                    payment.id, payment.invoice_id
                )));
            }
        }

        Ok(())
    }

    /// Whether restoring this backup leaves someone able to sign in as admin.
    pub fn has_active_admin(&self) -> bool {
        self.users
            .iter()
            .any(|u| u.user.is_active && u.user.role.is_admin())
    }

    pub fn counts(&self) -> BackupCounts {
        BackupCounts {
            products: self.products.len(),
            customers: self.customers.len(),
            users: self.users.len(),
            sales: self.sales.len(),
            orders: self.orders.len(),
            invoices: self.invoices.len(),
            invoice_payments: self.invoice_payments.len(),
            closures: self.closures.len(),
        }
    }
}
