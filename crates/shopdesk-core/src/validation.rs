//! # Validation Module
//!
//! Input validation utilities for ShopDesk.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (serde)                                       │
//! │  └── Shape and type of the request body                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Lengths, ranges, formats                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE and FOREIGN KEY constraints                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{BusinessSettings, DenominationCount};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest report window accepted.
pub const MAX_REPORT_DAYS: i64 = 366;

/// Highest unit price or cost (10,000,000.00).
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Highest stock level. Also bounds a single relative adjustment.
pub const MAX_STOCK: i64 = 1_000_000_000;

/// Largest note or coin in a cash count (100,000.00).
pub const MAX_DENOMINATION_CENTS: i64 = 10_000_000;

/// Most pieces of one denomination in a cash count.
pub const MAX_DENOMINATION_COUNT: i64 = 1_000_000;

/// Most denomination lines in one cash count.
pub const MAX_CASH_COUNT_LINES: usize = 50;

/// Largest opening float (100,000,000.00).
pub const MAX_OPENING_CASH_CENTS: i64 = 10_000_000_000;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name (1..=200 characters).
///
/// ```rust
/// use shopdesk_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Ground Coffee 250g").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

/// Validates a product category (1..=100 characters).
pub fn validate_category(category: &str) -> ValidationResult<()> {
    validate_text("category", category, 100)
}

/// Validates a unit of measure (1..=30 characters).
pub fn validate_unit(unit: &str) -> ValidationResult<()> {
    validate_text("unit", unit, 30)
}

/// Validates a person or business name (1..=150 characters).
pub fn validate_person_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 150)
}

/// Validates a username.
///
/// ## Rules
/// - 3 to 50 characters
/// - letters, digits, `.`, `_`, `-`
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }

    if username.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 50,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(ValidationError::invalid(
            "username",
            "must contain only letters, numbers, dots, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a password (at least 6 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        });
    }
    Ok(())
}

/// Validates an optional email address.
///
/// Empty or missing is fine. Present values need an `@` followed by a
/// domain containing a dot.
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::invalid("email", "must be a valid email address"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity (1..=999).
///
/// ```rust
/// use shopdesk_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(1000).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

fn validate_upper(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Validates a price in cents (0..=[`MAX_PRICE_CENTS`]). Zero is allowed
/// (free items).
///
/// ```rust
/// use shopdesk_core::validation::{validate_price_cents, MAX_PRICE_CENTS};
///
/// assert!(validate_price_cents("price", 0).is_ok());
/// assert!(validate_price_cents("price", -1).is_err());
/// assert!(validate_price_cents("price", MAX_PRICE_CENTS + 1).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    validate_upper(field, cents, 0, MAX_PRICE_CENTS)
}

/// Validates a stock level (0..=[`MAX_STOCK`]).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }
    validate_upper("stock", stock, 0, MAX_STOCK)
}

/// Validates a relative stock adjustment (±[`MAX_STOCK`]).
pub fn validate_stock_delta(delta: i64) -> ValidationResult<()> {
    if !(-MAX_STOCK..=MAX_STOCK).contains(&delta) {
        return Err(ValidationError::OutOfRange {
            field: "stockDelta".to_string(),
            min: -MAX_STOCK,
            max: MAX_STOCK,
        });
    }
    Ok(())
}

/// Validates the cash in the drawer when a day opens.
pub fn validate_opening_cash(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "openingCash".to_string(),
        });
    }
    validate_upper("openingCash", cents, 0, MAX_OPENING_CASH_CENTS)
}

/// Validates a payment amount in cents (must be > 0).
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a cash drawer count.
///
/// ## Rules
/// - every denomination is positive, at most [`MAX_DENOMINATION_CENTS`]
/// - every count is 0..=[`MAX_DENOMINATION_COUNT`]
/// - a denomination appears at most once
/// - at most [`MAX_CASH_COUNT_LINES`] lines
pub fn validate_cash_count(lines: &[DenominationCount]) -> ValidationResult<()> {
    if lines.len() > MAX_CASH_COUNT_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cashBreakdown".to_string(),
            min: 0,
            max: MAX_CASH_COUNT_LINES as i64,
        });
    }

    let mut seen = Vec::with_capacity(lines.len());

    for line in lines {
        if line.denomination_cents <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "denomination".to_string(),
            });
        }
        validate_upper(
            "denomination",
            line.denomination_cents,
            1,
            MAX_DENOMINATION_CENTS,
        )?;
        if line.count < 0 {
            return Err(ValidationError::Negative {
                field: "count".to_string(),
            });
        }
        validate_upper("count", line.count, 0, MAX_DENOMINATION_COUNT)?;
        if seen.contains(&line.denomination_cents) {
            return Err(ValidationError::invalid(
                "cashBreakdown",
                format!("denomination {} listed twice", line.denomination_cents),
            ));
        }
        seen.push(line.denomination_cents);
    }

    Ok(())
}

/// Longest credit term accepted for invoices.
pub const MAX_INVOICE_DUE_DAYS: i64 = 365;

/// Validates store-wide settings before they are saved.
pub fn validate_business_settings(settings: &BusinessSettings) -> ValidationResult<()> {
    validate_text("businessName", &settings.business_name, 150)?;
    validate_text("currencySymbol", &settings.currency_symbol, 5)?;

    if settings.low_stock_threshold < 0 {
        return Err(ValidationError::Negative {
            field: "lowStockThreshold".to_string(),
        });
    }

    if !(0..=MAX_INVOICE_DUE_DAYS).contains(&settings.invoice_due_days) {
        return Err(ValidationError::OutOfRange {
            field: "invoiceDueDays".to_string(),
            min: 0,
            max: MAX_INVOICE_DUE_DAYS,
        });
    }

    Ok(())
}

// =============================================================================
// Identifier / Date Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use shopdesk_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::invalid("id", "must be a valid UUID"))?;

    Ok(())
}

/// Validates a report date range.
///
/// `from` must not be after `to`, and the range spans at most
/// [`MAX_REPORT_DAYS`] days.
pub fn validate_date_range(from: NaiveDate, to: NaiveDate) -> ValidationResult<()> {
    if from > to {
        return Err(ValidationError::invalid("from", "must not be after `to`"));
    }

    let days = (to - from).num_days() + 1;
    if days > MAX_REPORT_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "date range (days)".to_string(),
            min: 1,
            max: MAX_REPORT_DAYS,
        });
    }

    Ok(())
}

/// Trims an optional text field and turns blanks into `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Ground Coffee 250g").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("maria.lopez").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("  ")).is_ok());
        assert!(validate_email(Some("ana@shop.com")).is_ok());
        assert!(validate_email(Some("ana@shop")).is_err());
        assert!(validate_email(Some("@shop.com")).is_err());
        assert!(validate_email(Some("ana.shop.com")).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_prices_and_stock() {
        assert!(validate_price_cents("price", 0).is_ok());
        assert!(validate_price_cents("price", -1).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-3).is_err());
        assert!(validate_payment_amount(0).is_err());

        assert!(validate_price_cents("price", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents("price", i64::MAX / 2),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_stock(MAX_STOCK + 1).is_err());

        assert!(validate_stock_delta(-MAX_STOCK).is_ok());
        assert!(validate_stock_delta(i64::MAX).is_err());
        assert!(validate_stock_delta(i64::MIN).is_err());

        assert!(validate_opening_cash(10_000).is_ok());
        assert!(validate_opening_cash(-1).is_err());
        assert!(validate_opening_cash(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_cash_count() {
        let ok = [
            DenominationCount { denomination_cents: 2000, count: 3 },
            DenominationCount { denomination_cents: 25, count: 0 },
        ];
        assert!(validate_cash_count(&ok).is_ok());

        let negative = [DenominationCount { denomination_cents: 100, count: -1 }];
        assert!(validate_cash_count(&negative).is_err());

        let zero_denomination = [DenominationCount { denomination_cents: 0, count: 1 }];
        assert!(validate_cash_count(&zero_denomination).is_err());

        let duplicated = [
            DenominationCount { denomination_cents: 100, count: 1 },
            DenominationCount { denomination_cents: 100, count: 2 },
        ];
        assert!(validate_cash_count(&duplicated).is_err());

        let huge_count = [DenominationCount { denomination_cents: 10_000, count: i64::MAX / 100 }];
        assert!(validate_cash_count(&huge_count).is_err());

        let huge_note = [DenominationCount { denomination_cents: i64::MAX, count: 1 }];
        assert!(validate_cash_count(&huge_note).is_err());

        let too_many: Vec<DenominationCount> = (1..=MAX_CASH_COUNT_LINES as i64 + 1)
            .map(|d| DenominationCount { denomination_cents: d, count: 1 })
            .collect();
        assert!(validate_cash_count(&too_many).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert!(validate_date_range(d("2026-10-01"), d("2026-10-31")).is_ok());
        assert!(validate_date_range(d("2026-10-01"), d("2026-10-01")).is_ok());
        assert!(validate_date_range(d("2026-10-31"), d("2026-10-01")).is_err());
        assert!(validate_date_range(d("2025-01-01"), d("2026-10-01")).is_err());
    }

    #[test]
    fn test_validate_business_settings() {
        let mut settings = BusinessSettings::default();
        assert!(validate_business_settings(&settings).is_ok());

        settings.invoice_due_days = 400;
        assert!(validate_business_settings(&settings).is_err());

        settings.invoice_due_days = 0;
        settings.business_name = "  ".to_string();
        assert!(validate_business_settings(&settings).is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(normalize_optional(Some("   ".to_string())), None);
        assert_eq!(normalize_optional(None), None);
    }
}
