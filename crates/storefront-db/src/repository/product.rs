//! # Product Repository
//!
//! Catalog row access: get, list, insert, update, delete.
//!
//! Stock is deliberately absent from [`ProductRepository::update`]; every stock
//! movement goes through the inventory ledger so that it is a single
//! conditional statement.
//!
//! ## Optimistic Edits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Admin A reads product (version 4)     Admin B reads product (version 4)│
//! │       │                                      │                          │
//! │       ▼                                      ▼                          │
//! │  UPDATE ... WHERE id=? AND version=4    UPDATE ... WHERE version=4      │
//! │       │                                      │                          │
//! │       ▼                                      ▼                          │
//! │  1 row, version → 5                     0 rows → ConcurrencyConflict    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_price_cents, validate_product_name, validate_stock};
use storefront_core::Product;

/// Fields needed to create a catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub category_id: Option<String>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, category_id,
                   version, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Like [`get_by_id`](Self::get_by_id) but a missing product is an error.
    pub async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Lists products, optionally restricted to one category, ordered by name.
    pub async fn list(&self, category_id: Option<&str>, limit: u32) -> DbResult<Vec<Product>> {
        debug!(category_id = ?category_id, limit = %limit, "Listing products");

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, category_id,
                   version, created_at, updated_at
            FROM products
            WHERE (?1 IS NULL OR category_id = ?1)
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(category_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Creates a product with a generated id and version 1.
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        validate_product_name(&new.name)?;
        validate_price_cents(new.price_cents)?;
        validate_stock(new.stock)?;

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: new.name.trim().to_string(),
            description: new.description,
            price_cents: new.price_cents,
            stock: new.stock,
            category_id: new.category_id,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        self.insert(&product).await
    }

    /// Inserts a product as-is (id generated beforehand).
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_cents, stock, category_id,
                version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.category_id)
        .bind(product.version)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates catalog fields (name, description, price, category).
    ///
    /// `product.version` must be the version that was read. On success the
    /// stored version is bumped and the fresh row is returned.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - product doesn't exist
    /// * `DbError::ConcurrencyConflict` - someone else wrote since it was read
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, version = product.version, "Updating product");

        validate_product_name(&product.name)?;
        validate_price_cents(product.price_cents)?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                description = ?4,
                price_cents = ?5,
                category_id = ?6,
                updated_at = ?7,
                version = version + 1
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&product.id)
        .bind(product.version)
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.category_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(&product.id).await? {
                Some(current) => Err(DbError::ConcurrencyConflict(format!(
                    "product {} is at version {}, update was based on {}",
                    product.id, current.version, product.version
                ))),
                None => Err(DbError::not_found("Product", &product.id)),
            };
        }

        self.require(&product.id).await
    }

    /// Deletes a product.
    ///
    /// Cart lines referencing it are removed with it. A product that appears
    /// on any order cannot be deleted (`ForeignKeyViolation`).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts catalog products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
