//! # Accounting Day
//!
//! Opening and closing the operational day, and reconciling the cash drawer.
//!
//! ## Day Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   CLOSED ── open_day(date?, opening cash) ──► OPEN                      │
//! │     ▲                                          │                        │
//! │     │                                          │ sales, invoice         │
//! │     │                                          │ payments booked on     │
//! │     │                                          │ the operational date   │
//! │     │                                          ▼                        │
//! │     └──── close_day(cash count) ◄──────── summarize_day()               │
//! │                                                                         │
//! │   expected cash = opening + cash sales + cash invoice payments          │
//! │   difference    = counted − expected   (+ surplus / − shortage)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    AccountingSettings, ClosureDetails, DenominationCount, InvoicePaymentRecord, PaymentMethod, Sale,
};
use crate::validation::{normalize_optional, validate_cash_count, validate_opening_cash};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/accounting/open`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OpenDayRequest {
    /// Defaults to the day after the last closure, or today if later.
    #[ts(as = "Option<String>")]
    pub operational_date: Option<NaiveDate>,
    #[serde(default)]
    pub opening_cash_cents: i64,
}

/// Body of `POST /api/accounting/close`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CloseDayRequest {
    pub cash_breakdown: Vec<DenominationCount>,
    pub notes: Option<String>,
}

/// A validated cash drawer count whose total fits in cents.
#[derive(Debug, Clone, PartialEq)]
pub struct CashCount {
    lines: Vec<DenominationCount>,
    total: Money,
}

impl CashCount {
    pub fn new(lines: Vec<DenominationCount>) -> CoreResult<Self> {
        validate_cash_count(&lines)?;

        let mut total = Money::zero();
        for line in &lines {
            total = total.try_add(line.subtotal()?)?;
        }

        Ok(CashCount { lines, total })
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn lines(&self) -> &[DenominationCount] {
        &self.lines
    }
}

// =============================================================================
// Opening
// =============================================================================

/// The date a new day opens on when none is given.
fn default_open_date(settings: &AccountingSettings, today: NaiveDate) -> NaiveDate {
    match settings.last_closed_date() {
        Some(closed) => {
            let next = closed + Duration::days(1);
            next.max(today)
        }
        None => today,
    }
}

/// Opens an operational day.
///
/// ## Errors
/// - `DayAlreadyOpen` if a day is open
/// - `DayAlreadyClosed` if the requested date is not after the last closure
/// - validation error for negative or oversized opening cash
pub fn open_day(
    settings: &AccountingSettings,
    request: &OpenDayRequest,
    user: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> CoreResult<AccountingSettings> {
    if settings.is_day_open {
        return Err(CoreError::DayAlreadyOpen {
            date: settings.current_operational_date,
        });
    }

    validate_opening_cash(request.opening_cash_cents)?;

    let date = request
        .operational_date
        .unwrap_or_else(|| default_open_date(settings, today));

    if let Some(closed) = settings.last_closed_date() {
        if date <= closed {
            return Err(CoreError::DayAlreadyClosed { date });
        }
    }

    Ok(AccountingSettings {
        current_operational_date: date,
        is_day_open: true,
        opening_cash_cents: request.opening_cash_cents,
        opened_at: Some(now),
        opened_by: Some(user.to_string()),
        last_closure: settings.last_closure.clone(),
    })
}

// =============================================================================
// Day Summary
// =============================================================================

/// Totals of one operational day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DaySummary {
    #[ts(as = "String")]
    pub operational_date: NaiveDate,
    pub sales_count: i64,
    pub voided_count: i64,
    pub total_sales_cents: i64,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub transfer_sales_cents: i64,
    pub credit_sales_cents: i64,
    pub invoice_payments_count: i64,
    pub invoice_cash_cents: i64,
    pub invoice_other_cents: i64,
    pub opening_cash_cents: i64,
    pub expected_cash_cents: i64,
}

impl DaySummary {
    pub fn expected_cash(&self) -> Money {
        Money::from_cents(self.expected_cash_cents)
    }
}

/// Computes the totals of `date` from its sales and invoice payments.
///
/// Records from other dates are ignored. Voided sales are counted apart and
/// contribute nothing to the totals.
pub fn summarize_day(
    date: NaiveDate,
    opening_cash_cents: i64,
    sales: &[Sale],
    invoice_payments: &[InvoicePaymentRecord],
) -> DaySummary {
    let mut summary = DaySummary {
        operational_date: date,
        opening_cash_cents,
        ..Default::default()
    };

    for sale in sales.iter().filter(|s| s.operational_date == date) {
        if !sale.is_completed() {
            summary.voided_count += 1;
            continue;
        }

        summary.sales_count += 1;
        summary.total_sales_cents += sale.total_cents;
        match sale.payment_method {
            PaymentMethod::Cash => summary.cash_sales_cents += sale.total_cents,
            PaymentMethod::Card => summary.card_sales_cents += sale.total_cents,
            PaymentMethod::Transfer => summary.transfer_sales_cents += sale.total_cents,
            PaymentMethod::Credit => summary.credit_sales_cents += sale.total_cents,
        }
    }

    for payment in invoice_payments.iter().filter(|p| p.operational_date == date) {
        summary.invoice_payments_count += 1;
        if payment.method == PaymentMethod::Cash {
            summary.invoice_cash_cents += payment.amount_cents;
        } else {
            summary.invoice_other_cents += payment.amount_cents;
        }
    }

    summary.expected_cash_cents =
        opening_cash_cents + summary.cash_sales_cents + summary.invoice_cash_cents;

    summary
}

// =============================================================================
// Closing
// =============================================================================

/// Closes the open day against a cash count.
///
/// Returns the new accounting state together with the closure record. The
/// operational date stays on the closed date until the next open.
pub fn close_day(
    settings: &AccountingSettings,
    summary: &DaySummary,
    count: CashCount,
    user: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<(AccountingSettings, ClosureDetails)> {
    if !settings.is_day_open {
        return Err(CoreError::DayClosed);
    }

    if summary.operational_date != settings.current_operational_date {
        return Err(ValidationError::invalid(
            "operationalDate",
            "summary does not belong to the open day",
        )
        .into());
    }

    let counted = count.total();
    let expected = summary.expected_cash();
    let difference = counted
        .checked_sub(expected)
        .ok_or_else(|| CoreError::AmountOverflow(format!("{counted} - {expected}")))?;

    let closure = ClosureDetails {
        operational_date: settings.current_operational_date,
        opened_at: settings.opened_at,
        closed_at: now,
        closed_by: user.to_string(),
        opening_cash_cents: settings.opening_cash_cents,
        sales_count: summary.sales_count,
        total_sales_cents: summary.total_sales_cents,
        cash_sales_cents: summary.cash_sales_cents,
        card_sales_cents: summary.card_sales_cents,
        transfer_sales_cents: summary.transfer_sales_cents,
        credit_sales_cents: summary.credit_sales_cents,
        invoice_cash_cents: summary.invoice_cash_cents,
        invoice_other_cents: summary.invoice_other_cents,
        expected_cash_cents: expected.cents(),
        counted_cash_cents: counted.cents(),
        difference_cents: difference.cents(),
        cash_breakdown: count.lines,
        notes: normalize_optional(notes),
    };

    let next = AccountingSettings {
        current_operational_date: settings.current_operational_date,
        is_day_open: false,
        opening_cash_cents: 0,
        opened_at: None,
        opened_by: None,
        last_closure: Some(closure.clone()),
    };

    Ok((next, closure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentDetails, SaleStatus};
    use crate::validation::{MAX_DENOMINATION_CENTS, MAX_DENOMINATION_COUNT};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sale(day: &str, method: PaymentMethod, total: i64, status: SaleStatus) -> Sale {
        let payment = match method {
            PaymentMethod::Cash => PaymentDetails::Cash { tendered_cents: total, change_cents: 0 },
            PaymentMethod::Card => PaymentDetails::Card { reference: None },
            PaymentMethod::Transfer => PaymentDetails::Transfer { reference: None },
            PaymentMethod::Credit => PaymentDetails::Credit {
                invoice_id: "i".into(),
                invoice_number: "INV-000001".into(),
                due_date: date(day),
            },
        };
        Sale {
            id: uuid::Uuid::new_v4().to_string(),
            receipt_number: String::new(),
            sold_at: Utc::now(),
            operational_date: date(day),
            items: vec![],
            total_cents: total,
            cost_cents: 0,
            payment_method: method,
            payment,
            customer_id: None,
            cashier_id: "u".into(),
            status,
            voided_at: None,
        }
    }

    fn payment(day: &str, method: PaymentMethod, amount: i64) -> InvoicePaymentRecord {
        InvoicePaymentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_id: "i".into(),
            amount_cents: amount,
            method,
            operational_date: date(day),
            paid_at: Utc::now(),
            recorded_by: "u".into(),
            notes: None,
        }
    }

    fn opened(day: &str, opening: i64) -> AccountingSettings {
        let request = OpenDayRequest {
            operational_date: Some(date(day)),
            opening_cash_cents: opening,
        };
        open_day(
            &AccountingSettings::initial(date(day)),
            &request,
            "admin",
            date(day),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_open_day_defaults_to_today() {
        let settings = AccountingSettings::initial(date("2026-10-01"));
        let open = open_day(
            &settings,
            &OpenDayRequest::default(),
            "admin",
            date("2026-10-19"),
            Utc::now(),
        )
        .unwrap();
        assert!(open.is_day_open);
        assert_eq!(open.current_operational_date, date("2026-10-19"));
        assert_eq!(open.opened_by.as_deref(), Some("admin"));
    }

    #[test]
    fn test_open_day_twice_fails() {
        let open = opened("2026-10-19", 0);
        let err = open_day(&open, &OpenDayRequest::default(), "admin", date("2026-10-19"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::DayAlreadyOpen { .. }));
    }

    #[test]
    fn test_open_after_late_closure_uses_next_day() {
        let open = opened("2026-10-19", 0);
        let summary = summarize_day(date("2026-10-19"), 0, &[], &[]);
        let (closed, _) =
            close_day(&open, &summary, CashCount::new(vec![]).unwrap(), "admin", None, Utc::now())
                .unwrap();

        // Closed late at night: "today" is still the closed date.
        let next = open_day(&closed, &OpenDayRequest::default(), "admin", date("2026-10-19"), Utc::now())
            .unwrap();
        assert_eq!(next.current_operational_date, date("2026-10-20"));

        let reopen = OpenDayRequest {
            operational_date: Some(date("2026-10-19")),
            opening_cash_cents: 0,
        };
        let err = open_day(&closed, &reopen, "admin", date("2026-10-19"), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::DayAlreadyClosed { .. }));
    }

    #[test]
    fn test_summarize_day() {
        let sales = vec![
            sale("2026-10-19", PaymentMethod::Cash, 1500, SaleStatus::Completed),
            sale("2026-10-19", PaymentMethod::Card, 2000, SaleStatus::Completed),
            sale("2026-10-19", PaymentMethod::Credit, 700, SaleStatus::Completed),
            sale("2026-10-19", PaymentMethod::Cash, 900, SaleStatus::Voided),
            sale("2026-10-18", PaymentMethod::Cash, 5000, SaleStatus::Completed),
        ];
        let payments = vec![
            payment("2026-10-19", PaymentMethod::Cash, 300),
            payment("2026-10-19", PaymentMethod::Transfer, 400),
        ];

        let summary = summarize_day(date("2026-10-19"), 10000, &sales, &payments);
        assert_eq!(summary.sales_count, 3);
        assert_eq!(summary.voided_count, 1);
        assert_eq!(summary.total_sales_cents, 4200);
        assert_eq!(summary.cash_sales_cents, 1500);
        assert_eq!(summary.credit_sales_cents, 700);
        assert_eq!(summary.invoice_cash_cents, 300);
        assert_eq!(summary.invoice_other_cents, 400);
        assert_eq!(summary.expected_cash_cents, 10000 + 1500 + 300);
    }

    #[test]
    fn test_close_day_reports_difference() {
        let open = opened("2026-10-19", 10000);
        let sales = vec![sale("2026-10-19", PaymentMethod::Cash, 2550, SaleStatus::Completed)];
        let summary = summarize_day(date("2026-10-19"), open.opening_cash_cents, &sales, &[]);

        // Expected 125.50, counted 125.00 → 0.50 short.
        let count = CashCount::new(vec![
            DenominationCount { denomination_cents: 10000, count: 1 },
            DenominationCount { denomination_cents: 2000, count: 1 },
            DenominationCount { denomination_cents: 500, count: 1 },
        ])
        .unwrap();

        let (state, closure) =
            close_day(&open, &summary, count, "admin", Some(" ok ".into()), Utc::now()).unwrap();

        assert!(!state.is_day_open);
        assert_eq!(state.current_operational_date, date("2026-10-19"));
        assert_eq!(closure.expected_cash_cents, 12550);
        assert_eq!(closure.counted_cash_cents, 12500);
        assert_eq!(closure.difference_cents, -50);
        assert_eq!(closure.notes.as_deref(), Some("ok"));
        assert_eq!(state.last_closure, Some(closure));
    }

    #[test]
    fn test_cash_count_rejects_amounts_beyond_cents() {
        let err = CashCount::new(vec![DenominationCount {
            denomination_cents: 10_000,
            count: i64::MAX / 100,
        }])
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let largest = CashCount::new(vec![DenominationCount {
            denomination_cents: MAX_DENOMINATION_CENTS,
            count: MAX_DENOMINATION_COUNT,
        }])
        .unwrap();
        assert_eq!(largest.total().cents(), MAX_DENOMINATION_CENTS * MAX_DENOMINATION_COUNT);
    }

    #[test]
    fn test_open_day_rejects_oversized_float() {
        let settings = AccountingSettings::initial(date("2026-10-19"));
        let request = OpenDayRequest {
            operational_date: None,
            opening_cash_cents: i64::MAX,
        };
        let err = open_day(&settings, &request, "admin", date("2026-10-19"), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_close_requires_open_day() {
        let settings = AccountingSettings::initial(date("2026-10-19"));
        let summary = summarize_day(date("2026-10-19"), 0, &[], &[]);
        let err = close_day(
            &settings,
            &summary,
            CashCount::new(vec![]).unwrap(),
            "admin",
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::DayClosed));
    }
}
