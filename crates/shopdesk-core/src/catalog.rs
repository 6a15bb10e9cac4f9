//! # Catalog
//!
//! Input types and rules for creating and editing products and customers.
//!
//! ## Edit Modes
//! ```text
//! POST  /api/products       NewProduct      → build_product()
//! PUT   /api/products/:id   ProductUpdate   → apply_update()   (full replace)
//! PATCH /api/products/:id   ProductPatch    → apply_patch()    (partial, stock delta)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Customer, Product};
use crate::validation::{
    normalize_optional, validate_category, validate_email, validate_person_name,
    validate_price_cents, validate_product_name, validate_stock, validate_stock_delta, validate_unit,
};

fn default_unit() -> String {
    "unit".to_string()
}

// =============================================================================
// Products
// =============================================================================

/// Body of `POST /api/products`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> CoreResult<()> {
        validate_product_name(&self.name)?;
        validate_category(&self.category)?;
        validate_unit(&self.unit)?;
        validate_price_cents("price", self.price_cents)?;
        validate_price_cents("costPrice", self.cost_price_cents)?;
        validate_stock(self.stock)?;
        Ok(())
    }
}

/// Body of `PUT /api/products/:id`. Replaces every editable field.
pub type ProductUpdate = NewProduct;

/// Body of `PATCH /api/products/:id`. Only present fields change.
///
/// `stockDelta` adjusts stock relative to the current level (restock or
/// shrinkage) and is applied after an absolute `stock`, if both are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_price_cents: Option<i64>,
    pub stock: Option<i64>,
    pub stock_delta: Option<i64>,
    pub unit: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price_cents.is_none()
            && self.cost_price_cents.is_none()
            && self.stock.is_none()
            && self.stock_delta.is_none()
            && self.unit.is_none()
            && self.image.is_none()
            && self.description.is_none()
    }
}

/// Builds a new catalog product.
pub fn build_product(input: NewProduct, id: String, now: DateTime<Utc>) -> CoreResult<Product> {
    input.validate()?;

    Ok(Product {
        id,
        name: input.name.trim().to_string(),
        category: input.category.trim().to_string(),
        price_cents: input.price_cents,
        cost_price_cents: input.cost_price_cents,
        stock: input.stock,
        unit: input.unit.trim().to_string(),
        image: normalize_optional(input.image),
        description: normalize_optional(input.description),
        created_at: now,
        updated_at: now,
    })
}

/// Replaces all editable fields of a product.
pub fn apply_update(product: &Product, input: ProductUpdate, now: DateTime<Utc>) -> CoreResult<Product> {
    let mut updated = build_product(input, product.id.clone(), now)?;
    updated.created_at = product.created_at;
    Ok(updated)
}

/// Applies a partial edit.
///
/// ## Errors
/// - field validation failures
/// - `InsufficientStock` when a negative `stockDelta` would take stock
///   below zero
/// - validation error when the resulting stock is above the maximum
pub fn apply_patch(product: &Product, patch: ProductPatch, now: DateTime<Utc>) -> CoreResult<Product> {
    let mut updated = product.clone();

    if let Some(name) = patch.name {
        validate_product_name(&name)?;
        updated.name = name.trim().to_string();
    }
    if let Some(category) = patch.category {
        validate_category(&category)?;
        updated.category = category.trim().to_string();
    }
    if let Some(unit) = patch.unit {
        validate_unit(&unit)?;
        updated.unit = unit.trim().to_string();
    }
    if let Some(price) = patch.price_cents {
        validate_price_cents("price", price)?;
        updated.price_cents = price;
    }
    if let Some(cost) = patch.cost_price_cents {
        validate_price_cents("costPrice", cost)?;
        updated.cost_price_cents = cost;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
        updated.stock = stock;
    }
    if let Some(delta) = patch.stock_delta {
        validate_stock_delta(delta)?;
        let next = updated.stock.saturating_add(delta);
        if next < 0 {
            return Err(CoreError::InsufficientStock {
                product: updated.name.clone(),
                available: updated.stock,
                requested: -delta,
            });
        }
        validate_stock(next)?;
        updated.stock = next;
    }
    if patch.image.is_some() {
        updated.image = normalize_optional(patch.image);
    }
    if patch.description.is_some() {
        updated.description = normalize_optional(patch.description);
    }

    updated.updated_at = now;
    Ok(updated)
}

// =============================================================================
// Customers
// =============================================================================

/// Body of `POST /api/customers` and `PUT /api/customers/:id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerInput {
    pub fn validate(&self) -> CoreResult<()> {
        validate_person_name(&self.name)?;
        validate_email(self.email.as_deref())?;
        Ok(())
    }
}

/// Builds a new customer record.
pub fn build_customer(input: CustomerInput, id: String, now: DateTime<Utc>) -> CoreResult<Customer> {
    input.validate()?;

    Ok(Customer {
        id,
        name: input.name.trim().to_string(),
        email: normalize_optional(input.email),
        phone: normalize_optional(input.phone),
        address: normalize_optional(input.address),
        created_at: now,
        updated_at: now,
    })
}

/// Replaces the editable fields of a customer.
pub fn apply_customer_update(
    customer: &Customer,
    input: CustomerInput,
    now: DateTime<Utc>,
) -> CoreResult<Customer> {
    let mut updated = build_customer(input, customer.id.clone(), now)?;
    updated.created_at = customer.created_at;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MAX_STOCK;

    fn coffee() -> NewProduct {
        NewProduct {
            name: "  Ground Coffee 250g ".to_string(),
            category: "Groceries".to_string(),
            price_cents: 899,
            cost_price_cents: 520,
            stock: 12,
            unit: "bag".to_string(),
            image: Some("   ".to_string()),
            description: None,
        }
    }

    #[test]
    fn test_build_product_trims_and_normalizes() {
        let now = Utc::now();
        let product = build_product(coffee(), "p-1".to_string(), now).unwrap();
        assert_eq!(product.name, "Ground Coffee 250g");
        assert_eq!(product.image, None);
        assert_eq!(product.margin().cents(), 379);
        assert!(product.can_sell(12));
        assert!(!product.can_sell(13));
    }

    #[test]
    fn test_build_product_rejects_negative_price() {
        let mut input = coffee();
        input.price_cents = -1;
        assert!(build_product(input, "p-1".to_string(), Utc::now()).is_err());
    }

    #[test]
    fn test_apply_update_keeps_creation_time() {
        let created = Utc::now() - chrono::Duration::days(3);
        let product = build_product(coffee(), "p-1".to_string(), created).unwrap();

        let mut input = coffee();
        input.price_cents = 950;
        let updated = apply_update(&product, input, Utc::now()).unwrap();

        assert_eq!(updated.id, "p-1");
        assert_eq!(updated.price_cents, 950);
        assert_eq!(updated.created_at, created);
    }

    #[test]
    fn test_apply_patch_stock_delta() {
        let product = build_product(coffee(), "p-1".to_string(), Utc::now()).unwrap();

        let restock = ProductPatch {
            stock_delta: Some(8),
            ..Default::default()
        };
        let updated = apply_patch(&product, restock, Utc::now()).unwrap();
        assert_eq!(updated.stock, 20);
        assert_eq!(updated.name, product.name);

        let shrink = ProductPatch {
            stock_delta: Some(-13),
            ..Default::default()
        };
        let err = apply_patch(&product, shrink, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 12, requested: 13, .. }
        ));
    }

    #[test]
    fn test_apply_patch_rejects_extreme_values() {
        let product = build_product(coffee(), "p-1".to_string(), Utc::now()).unwrap();

        for delta in [i64::MAX, i64::MIN, MAX_STOCK + 1] {
            let patch = ProductPatch {
                stock_delta: Some(delta),
                ..Default::default()
            };
            let err = apply_patch(&product, patch, Utc::now()).unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "delta {delta}");
        }

        // In range alone, out of range once added to current stock.
        let patch = ProductPatch {
            stock_delta: Some(MAX_STOCK),
            ..Default::default()
        };
        assert!(matches!(
            apply_patch(&product, patch, Utc::now()),
            Err(CoreError::Validation(_))
        ));

        let patch = ProductPatch {
            price_cents: Some(i64::MAX / 2),
            ..Default::default()
        };
        assert!(apply_patch(&product, patch, Utc::now()).is_err());
    }

    #[test]
    fn test_apply_patch_absolute_then_delta() {
        let product = build_product(coffee(), "p-1".to_string(), Utc::now()).unwrap();
        let patch = ProductPatch {
            stock: Some(0),
            stock_delta: Some(5),
            price_cents: Some(1000),
            ..Default::default()
        };
        let updated = apply_patch(&product, patch, Utc::now()).unwrap();
        assert_eq!(updated.stock, 5);
        assert_eq!(updated.price_cents, 1000);
    }

    #[test]
    fn test_empty_patch() {
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn test_build_customer_validates_email() {
        let input = CustomerInput {
            name: "Ana Ruiz".to_string(),
            email: Some("ana-at-mail".to_string()),
            phone: None,
            address: None,
        };
        assert!(build_customer(input, "c-1".to_string(), Utc::now()).is_err());
    }
}
