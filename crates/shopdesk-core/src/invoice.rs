//! # Accounts Receivable
//!
//! Invoice balances, status classification, payments and aging.
//!
//! ## Status Rules
//! ```text
//!   voided                         → voided (final)
//!   paid >= amount                 → paid
//!   today > due date               → overdue
//!   otherwise                      → pending
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus, PaymentMethod};
use crate::validation::validate_payment_amount;

/// Body of `POST /api/invoices/:id/payments`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoicePaymentRequest {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

impl InvoicePaymentRequest {
    pub fn validate(&self) -> CoreResult<()> {
        validate_payment_amount(self.amount_cents)?;
        if self.method == PaymentMethod::Credit {
            return Err(ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: vec!["cash".into(), "card".into(), "transfer".into()],
            }
            .into());
        }
        Ok(())
    }
}

impl Invoice {
    #[inline]
    pub fn outstanding_cents(&self) -> i64 {
        (self.amount_cents - self.paid_cents).max(0)
    }

    #[inline]
    pub fn outstanding(&self) -> Money {
        Money::from_cents(self.outstanding_cents())
    }

    /// Status as of `today`, regardless of what is stored.
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        if self.status == InvoiceStatus::Voided {
            InvoiceStatus::Voided
        } else if self.paid_cents >= self.amount_cents {
            InvoiceStatus::Paid
        } else if today > self.due_date {
            InvoiceStatus::Overdue
        } else {
            InvoiceStatus::Pending
        }
    }

    /// Days past the due date, zero if not yet due.
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        (today - self.due_date).num_days().max(0)
    }

    /// Whether the invoice can still take payments.
    pub fn is_open(&self) -> bool {
        !matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Voided)
            && self.paid_cents < self.amount_cents
    }
}

/// Applies a payment and returns the updated invoice.
///
/// ## Errors
/// - validation error for a non-positive amount
/// - `InvoiceClosed` for a paid or voided invoice
/// - `Overpayment` when the amount exceeds the outstanding balance
pub fn apply_payment(
    invoice: &Invoice,
    amount_cents: i64,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> CoreResult<Invoice> {
    validate_payment_amount(amount_cents)?;

    if !invoice.is_open() {
        return Err(CoreError::InvoiceClosed {
            invoice_number: invoice.invoice_number.clone(),
            status: invoice.effective_status(today).to_string(),
        });
    }

    let requested = Money::from_cents(amount_cents);
    let outstanding = invoice.outstanding();
    if requested > outstanding {
        return Err(CoreError::Overpayment {
            outstanding,
            requested,
        });
    }

    let mut updated = invoice.clone();
    updated.paid_cents += amount_cents;
    updated.status = updated.effective_status(today);
    if updated.status == InvoiceStatus::Paid {
        updated.paid_at = Some(now);
    }
    Ok(updated)
}

// =============================================================================
// Receivables Summary
// =============================================================================

/// Outstanding balance grouped by how late it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AgingBuckets {
    pub current_cents: i64,
    #[serde(rename = "days1To30Cents")]
    pub days_1_to_30_cents: i64,
    #[serde(rename = "days31To60Cents")]
    pub days_31_to_60_cents: i64,
    #[serde(rename = "days61To90Cents")]
    pub days_61_to_90_cents: i64,
    #[serde(rename = "over90Cents")]
    pub over_90_cents: i64,
}

/// Overview shown on the receivables screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceivablesSummary {
    pub pending_count: i64,
    pub pending_cents: i64,
    pub overdue_count: i64,
    pub overdue_cents: i64,
    pub paid_count: i64,
    pub paid_cents: i64,
    pub total_outstanding_cents: i64,
    pub aging: AgingBuckets,
}

impl ReceivablesSummary {
    /// Builds the summary as of `today`. Voided invoices are left out.
    pub fn build(invoices: &[Invoice], today: NaiveDate) -> Self {
        let mut summary = ReceivablesSummary::default();

        for invoice in invoices {
            let outstanding = invoice.outstanding_cents();
            match invoice.effective_status(today) {
                InvoiceStatus::Voided => continue,
                InvoiceStatus::Paid => {
                    summary.paid_count += 1;
                    summary.paid_cents += invoice.amount_cents;
                    continue;
                }
                InvoiceStatus::Pending => {
                    summary.pending_count += 1;
                    summary.pending_cents += outstanding;
                }
                InvoiceStatus::Overdue => {
                    summary.overdue_count += 1;
                    summary.overdue_cents += outstanding;
                }
            }

            summary.total_outstanding_cents += outstanding;

            let aging = &mut summary.aging;
            match invoice.days_overdue(today) {
                0 => aging.current_cents += outstanding,
                1..=30 => aging.days_1_to_30_cents += outstanding,
                31..=60 => aging.days_31_to_60_cents += outstanding,
                61..=90 => aging.days_61_to_90_cents += outstanding,
                _ => aging.over_90_cents += outstanding,
            }
        }

        summary
    }
}
