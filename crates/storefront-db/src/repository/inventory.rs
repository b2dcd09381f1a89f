//! # Inventory Ledger
//!
//! Owns product stock counts. Every movement is one conditional statement,
//! so there is never a gap between "check" and "act".
//!
//! ## Reserve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                        │
//! │     SET stock = stock - :qty, version = version + 1                     │
//! │   WHERE id = :id AND stock >= :qty                                      │
//! │  RETURNING stock                                                        │
//! │                                                                         │
//! │  1 row  → reserved, remaining stock returned                           │
//! │  0 rows → product missing  → NotFound                                  │
//! │         → stock too low    → InsufficientStock { available, requested } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_on` functions run on a caller-supplied connection so the checkout
//! transaction can reserve several products atomically. The repository
//! methods wrap them for standalone use.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::validation::validate_quantity;
use storefront_core::CoreError;

/// Atomically decrements stock by `quantity` if enough is on hand.
///
/// Returns the remaining stock.
pub async fn reserve_on(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<i64> {
    validate_quantity(quantity)?;

    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock - ?2,
            version = version + 1,
            updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        RETURNING stock
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(remaining) = remaining {
        debug!(product_id = %product_id, quantity, remaining, "Stock reserved");
        return Ok(remaining);
    }

    let current: Option<(String, i64)> =
        sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        Some((name, available)) => Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            product_name: name,
            available,
            requested: quantity,
        }
        .into()),
        None => Err(DbError::not_found("Product", product_id)),
    }
}

/// Returns `quantity` units to stock. Returns the new stock level.
pub async fn release_on(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<i64> {
    if quantity <= 0 {
        return Err(storefront_core::ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    let stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock + ?2,
            version = version + 1,
            updated_at = ?3
        WHERE id = ?1
        RETURNING stock
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    stock.ok_or_else(|| DbError::not_found("Product", product_id))
}

/// Repository facade over the ledger functions.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Reserves stock outside of a checkout (single product).
    pub async fn reserve(&self, product_id: &str, quantity: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        reserve_on(&mut conn, product_id, quantity).await
    }

    /// Returns previously reserved stock.
    pub async fn release(&self, product_id: &str, quantity: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let stock = release_on(&mut conn, product_id, quantity).await?;
        debug!(product_id = %product_id, quantity, stock, "Stock released");
        Ok(stock)
    }

    /// Adds newly received stock.
    pub async fn restock(&self, product_id: &str, quantity: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let stock = release_on(&mut conn, product_id, quantity).await?;
        tracing::info!(product_id = %product_id, quantity, stock, "Product restocked");
        Ok(stock)
    }

    /// Current stock for a product.
    pub async fn stock(&self, product_id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        stock.ok_or_else(|| DbError::not_found("Product", product_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
