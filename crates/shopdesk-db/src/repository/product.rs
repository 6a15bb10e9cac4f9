//! # Product Repository
//!
//! Catalog CRUD and stock adjustments.
//!
//! ## Stock Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register A: sells 3 ─┐                                                 │
//! │  Register B: sells 2 ─┼─► UPDATE products SET stock = stock + ?delta    │
//! │                       │   WHERE id = ? AND stock + ?delta >= 0          │
//! │                       ▼                                                 │
//! │  0 rows affected → DbError::Conflict, nothing written                   │
//! │                                                                         │
//! │  Stock stays within 0..=MAX_STOCK, whatever order the writes land in.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use shopdesk_core::validation::MAX_STOCK;
use shopdesk_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, name, category, price_cents, cost_price_cents, stock, unit,
    image, description, created_at, updated_at
"#;

/// Optional filters for [`ProductRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
}

/// How [`ProductRepository::patch`] treats the stock column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    /// Leave the stored level alone.
    Keep,
    /// Write `product.stock` as the new level.
    Set,
    /// Add a delta under the stock guard.
    Adjust(i64),
}

async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = ?",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

/// Guarded `stock = stock + delta`. Returns the new level.
async fn adjust_stock_on(conn: &mut SqliteConnection, id: &str, delta: i64) -> DbResult<i64> {
    let stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products SET stock = stock + ?1, updated_at = ?2
        WHERE id = ?3 AND stock + ?1 >= 0 AND stock + ?1 <= ?4
        RETURNING stock
        "#,
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(id)
    .bind(MAX_STOCK)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = stock {
        return Ok(stock);
    }

    match fetch_product(conn, id).await? {
        Some(p) if p.stock.saturating_add(delta) < 0 => Err(DbError::conflict(format!(
            "insufficient stock for {}: available {}, requested {}",
            p.name,
            p.stock,
            delta.unsigned_abs()
        ))),
        Some(p) => Err(DbError::conflict(format!(
            "stock for {} would exceed {}: available {}, adding {}",
            p.name, MAX_STOCK, p.stock, delta
        ))),
        None => Err(DbError::not_found("Product", id)),
    }
}

pub(crate) async fn insert_product(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, category, price_cents, cost_price_cents, stock, unit,
            image, description, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.category)
    .bind(product.price_cents)
    .bind(product.cost_price_cents)
    .bind(product.stock)
    .bind(&product.unit)
    .bind(&product.image)
    .bind(&product.description)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_value(&product.name))?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products ordered by name.
    pub async fn list(&self, filter: ProductFilter) -> DbResult<Vec<Product>> {
        debug!(?filter, "Listing products");

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM products WHERE 1 = 1", PRODUCT_COLUMNS));

        if let Some(category) = filter.category.filter(|c| !c.trim().is_empty()) {
            qb.push(" AND category = ").push_bind(category.trim().to_string());
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            qb.push(" AND name LIKE ")
                .push_bind(format!("%{}%", search.trim()));
        }
        qb.push(" ORDER BY name COLLATE NOCASE");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Fetches the products with the given ids. Unknown ids are skipped.
    pub async fn get_many(&self, ids: &[&str]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM products WHERE id IN (", PRODUCT_COLUMNS));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        Ok(qb.build_query_as::<Product>().fetch_all(&self.pool).await?)
    }

    /// Inserts a product.
    ///
    /// ## Errors
    /// `UniqueViolation` when the name is taken (case-insensitive).
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");
        let mut conn = self.pool.acquire().await?;
        insert_product(&mut conn, product).await
    }

    /// Writes every editable field of an existing product.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?, category = ?, price_cents = ?, cost_price_cents = ?,
                stock = ?, unit = ?, image = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_price_cents)
        .bind(product.stock)
        .bind(&product.unit)
        .bind(&product.image)
        .bind(&product.description)
        .bind(product.updated_at)
        .bind(&product.id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&product.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Deletes a product. Past sales keep their snapshot of it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Distinct categories, sorted.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM products ORDER BY category COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Adds `delta` to stock (negative to remove) and returns the new level.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown product
    /// - `Conflict` when stock would drop below zero or pass `MAX_STOCK`
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<i64> {
        debug!(id = %id, delta = %delta, "Adjusting stock");
        let mut conn = self.pool.acquire().await?;
        adjust_stock_on(&mut conn, id, delta).await
    }

    /// Writes the edited fields and the stock change in one transaction and
    /// returns the stored product.
    ///
    /// Stock is only touched as `stock` says, so a concurrent sale is not
    /// overwritten by the level read before the edit. When the stock guard
    /// rejects the change none of the fields are saved.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown product
    /// - `UniqueViolation` when the new name is taken
    /// - `Conflict` when an adjustment leaves the allowed range
    pub async fn patch(&self, product: &Product, stock: StockChange) -> DbResult<Product> {
        debug!(id = %product.id, ?stock, "Patching product");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?1, category = ?2, price_cents = ?3, cost_price_cents = ?4,
                stock = CASE WHEN ?5 THEN ?6 ELSE stock END,
                unit = ?7, image = ?8, description = ?9, updated_at = ?10
            WHERE id = ?11
            "#,
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_price_cents)
        .bind(stock == StockChange::Set)
        .bind(product.stock)
        .bind(&product.unit)
        .bind(&product.image)
        .bind(&product.description)
        .bind(product.updated_at)
        .bind(&product.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(&product.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        if let StockChange::Adjust(delta) = stock {
            adjust_stock_on(&mut tx, &product.id, delta).await?;
        }

        let saved = fetch_product(&mut tx, &product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))?;

        tx.commit().await?;
        Ok(saved)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, product};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let repo = db.products();
        let tea = product("Green Tea", 450, 10);

        repo.insert(&tea).await.unwrap();

        let loaded = repo.get_by_id(&tea.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Green Tea");
        assert_eq!(loaded.price_cents, 450);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_case_insensitive() {
        let db = db().await;
        let repo = db.products();
        repo.insert(&product("Green Tea", 450, 10)).await.unwrap();

        let err = repo.insert(&product("GREEN TEA", 500, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, ref value } if field == "name" && value == "GREEN TEA"
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = db().await;
        let repo = db.products();
        let mut cake = product("Carrot Cake", 300, 4);
        cake.category = "Bakery".to_string();
        repo.insert(&cake).await.unwrap();
        repo.insert(&product("Green Tea", 450, 10)).await.unwrap();
        repo.insert(&product("Black Tea", 400, 10)).await.unwrap();

        let all = repo.list(ProductFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["Black Tea", "Carrot Cake", "Green Tea"]
        );

        let teas = repo
            .list(ProductFilter {
                search: Some("tea".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(teas.len(), 2);

        let bakery = repo
            .list(ProductFilter {
                category: Some("Bakery".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(bakery.len(), 1);

        assert_eq!(repo.categories().await.unwrap(), vec!["Bakery", "General"]);

        let some = repo.get_many(&[cake.id.as_str(), "nope"]).await.unwrap();
        assert_eq!(some.len(), 1);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let db = db().await;
        let repo = db.products();
        let tea = product("Green Tea", 450, 3);
        repo.insert(&tea).await.unwrap();

        assert_eq!(repo.adjust_stock(&tea.id, 5).await.unwrap(), 8);
        assert_eq!(repo.adjust_stock(&tea.id, -8).await.unwrap(), 0);

        let err = repo.adjust_stock(&tea.id, -1).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let err = repo.adjust_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock_extreme_deltas_conflict() {
        let db = db().await;
        let repo = db.products();
        let tea = product("Green Tea", 450, 3);
        repo.insert(&tea).await.unwrap();

        let err = repo.adjust_stock(&tea.id, i64::MIN).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref m) if m.contains("requested 9223372036854775808")));

        let err = repo.adjust_stock(&tea.id, MAX_STOCK).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(ref m) if m.contains("would exceed")));

        assert_eq!(repo.get_by_id(&tea.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_patch_rolls_back_fields_when_stock_guard_fails() {
        let db = db().await;
        let repo = db.products();
        let tea = product("Green Tea", 450, 5);
        repo.insert(&tea).await.unwrap();

        let mut renamed = tea.clone();
        renamed.name = "Renamed".to_string();
        let err = repo.patch(&renamed, StockChange::Adjust(-100)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let stored = repo.get_by_id(&tea.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Green Tea");
        assert_eq!(stored.stock, 5);

        let saved = repo.patch(&renamed, StockChange::Adjust(-2)).await.unwrap();
        assert_eq!(saved.name, "Renamed");
        assert_eq!(saved.stock, 3);
    }

    #[tokio::test]
    async fn test_patch_keeps_stock_written_by_a_sale() {
        let db = db().await;
        let repo = db.products();
        let tea = product("Green Tea", 450, 5);
        repo.insert(&tea).await.unwrap();

        // A sale lands between reading the product and saving the edit.
        repo.adjust_stock(&tea.id, -2).await.unwrap();

        let mut repriced = tea.clone();
        repriced.price_cents = 500;
        let saved = repo.patch(&repriced, StockChange::Keep).await.unwrap();
        assert_eq!(saved.price_cents, 500);
        assert_eq!(saved.stock, 3);

        let mut recounted = saved.clone();
        recounted.stock = 40;
        assert_eq!(repo.patch(&recounted, StockChange::Set).await.unwrap().stock, 40);

        let mut ghost = tea.clone();
        ghost.id = "missing".to_string();
        assert!(matches!(
            repo.patch(&ghost, StockChange::Keep).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = db().await;
        let repo = db.products();
        let mut tea = product("Green Tea", 450, 3);
        repo.insert(&tea).await.unwrap();

        tea.price_cents = 475;
        repo.update(&tea).await.unwrap();
        assert_eq!(repo.get_by_id(&tea.id).await.unwrap().unwrap().price_cents, 475);

        repo.delete(&tea.id).await.unwrap();
        assert!(matches!(
            repo.delete(&tea.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
