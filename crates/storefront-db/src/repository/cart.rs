//! # Cart Repository
//!
//! Persisted per-user carts.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Lifecycle                                    │
//! │                                                                         │
//! │  1. READ (no row yet)                                                  │
//! │     └── get_cart() → Cart { items: [] }   (nothing is created)         │
//! │                                                                         │
//! │  2. FIRST MUTATION                                                     │
//! │     └── add_item() → carts row created lazily, line inserted           │
//! │                                                                         │
//! │  3. EDIT                                                               │
//! │     └── add_item() again → quantity incremented (one line per product) │
//! │     └── update_quantity() / remove_item() → ItemNotFound if absent     │
//! │                                                                         │
//! │  4. CHECKOUT                                                           │
//! │     └── lines deleted inside the checkout transaction; row persists    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{validate_cart_size, validate_quantity};
use storefront_core::{Cart, CartLine, CoreError, ValidationError, MAX_ITEM_QUANTITY};

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Returns the user's cart, or an empty cart if none was ever created.
    pub async fn get_cart(&self, user_id: &str) -> DbResult<Cart> {
        let mut conn = self.pool.acquire().await?;
        load_cart(&mut conn, user_id).await
    }

    /// Adds `quantity` of a product, incrementing an existing line.
    ///
    /// ## Errors
    /// * `Validation` - quantity outside 1..=999 (after merging), or the cart
    ///   already holds the maximum number of distinct lines
    /// * `NotFound` - the product is not in the catalog
    pub async fn add_item(&self, user_id: &str, product_id: &str, quantity: i64) -> DbResult<Cart> {
        validate_quantity(quantity)?;

        debug!(user_id = %user_id, product_id = %product_id, quantity, "Adding cart item");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        // First statement is a write so the transaction holds the lock
        // before it reads anything.
        let cart_id = ensure_cart(&mut tx, user_id).await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(CoreError::not_found("Product", product_id).into());
        }

        let existing: Option<(String, i64)> = sqlx::query_as(
            "SELECT id, quantity FROM cart_items WHERE cart_id = ?1 AND product_id = ?2",
        )
        .bind(&cart_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some((line_id, current)) => {
                let merged = current.saturating_add(quantity);
                if merged > MAX_ITEM_QUANTITY {
                    return Err(ValidationError::OutOfRange {
                        field: "quantity".to_string(),
                        min: 1,
                        max: MAX_ITEM_QUANTITY,
                    }
                    .into());
                }

                sqlx::query("UPDATE cart_items SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
                    .bind(&line_id)
                    .bind(merged)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                let lines: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = ?1")
                        .bind(&cart_id)
                        .fetch_one(&mut *tx)
                        .await?;
                validate_cart_size(lines as usize)?;

                sqlx::query(
                    r#"
                    INSERT INTO cart_items (id, cart_id, product_id, quantity, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&cart_id)
                .bind(product_id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(cart)
    }

    /// Sets the quantity of a line that is already in the cart.
    ///
    /// Quantity 0 is rejected; use [`remove_item`](Self::remove_item).
    pub async fn update_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<Cart> {
        validate_quantity(quantity)?;

        debug!(user_id = %user_id, product_id = %product_id, quantity, "Updating cart quantity");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE cart_items SET quantity = ?3, updated_at = ?4
            WHERE product_id = ?2
              AND cart_id = (SELECT id FROM carts WHERE user_id = ?1)
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ItemNotFound {
                product_id: product_id.to_string(),
            }
            .into());
        }

        touch_cart(&mut tx, user_id).await?;
        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(cart)
    }

    /// Removes a product's line from the cart.
    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> DbResult<Cart> {
        debug!(user_id = %user_id, product_id = %product_id, "Removing cart item");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE product_id = ?2
              AND cart_id = (SELECT id FROM carts WHERE user_id = ?1)
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ItemNotFound {
                product_id: product_id.to_string(),
            }
            .into());
        }

        touch_cart(&mut tx, user_id).await?;
        let cart = load_cart(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(cart)
    }

    /// Removes every line. The cart row itself is kept. Clearing a cart that
    /// was never created is a no-op.
    pub async fn clear(&self, user_id: &str) -> DbResult<()> {
        debug!(user_id = %user_id, "Clearing cart");

        let mut conn = self.pool.acquire().await?;
        clear_on(&mut conn, user_id).await?;
        Ok(())
    }
}

// =============================================================================
// Connection-level helpers (shared with the checkout transaction)
// =============================================================================

/// Returns the user's cart id, creating the cart row if needed.
async fn ensure_cart(conn: &mut SqliteConnection, user_id: &str) -> DbResult<String> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO carts (id, user_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let cart_id: String = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = ?1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::not_found("Cart", user_id),
            other => other.into(),
        })?;

    Ok(cart_id)
}

/// Bumps the cart's `updated_at`. Returns whether a cart row exists.
pub(crate) async fn touch_cart(conn: &mut SqliteConnection, user_id: &str) -> DbResult<bool> {
    let result = sqlx::query("UPDATE carts SET updated_at = ?2 WHERE user_id = ?1")
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes every line of the user's cart. Returns the number removed.
pub(crate) async fn clear_on(conn: &mut SqliteConnection, user_id: &str) -> DbResult<u64> {
    let result = sqlx::query(
        "DELETE FROM cart_items WHERE cart_id = (SELECT id FROM carts WHERE user_id = ?1)",
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Reads the cart view with live product names and prices.
pub(crate) async fn load_cart(conn: &mut SqliteConnection, user_id: &str) -> DbResult<Cart> {
    let lines = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ci.product_id,
               p.name AS product_name,
               p.price_cents AS unit_price_cents,
               ci.quantity
        FROM cart_items ci
        INNER JOIN carts c ON c.id = ci.cart_id
        INNER JOIN products p ON p.id = ci.product_id
        WHERE c.user_id = ?1
        ORDER BY ci.rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Cart::from_lines(user_id, lines))
}

// =============================================================================
// Unit Tests
// =============================================================================
