//! # Order Builder
//!
//! The checkout transaction: cart → immutable order, all or nothing.
//!
//! ## Transaction Outline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. UPDATE carts SET updated_at      ← takes the write lock first     │
//! │        no cart row → EmptyCart                                         │
//! │   2. SELECT cart_items ⋈ products     ← snapshot: name, price, stock   │
//! │        no lines → EmptyCart                                            │
//! │        any stock < quantity → InsufficientStock                        │
//! │   3. price_order()                    ← freeze prices, Σ = total       │
//! │        total = 0 → Validation (nothing payable)                        │
//! │   4. reserve each line                ← conditional decrement          │
//! │   5. INSERT orders (PENDING) + order_items                             │
//! │   6. DELETE cart_items                ← cart row persists              │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: every reservation,     │
//! │  the order row and the cart deletion roll back together. Dropping the  │
//! │  future (client went away) has the same effect.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Contention
//! SQLite has a single writer. Step 1 makes a concurrent checkout wait on the
//! busy timeout instead of failing later with a stale WAL snapshot. If the
//! wait still ends in SQLITE_BUSY the attempt is retried, up to
//! `MAX_CHECKOUT_ATTEMPTS` in total.

use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::cart::{clear_on, touch_cart};
use crate::repository::inventory::reserve_on;
use crate::repository::order::insert_order_on;
use storefront_core::validation::{validate_payment_amount, validate_shipping_address};
use storefront_core::{
    check_availability, price_order, CheckoutLine, CoreError, Order, OrderItem, OrderStatus,
    MAX_CHECKOUT_ATTEMPTS,
};

/// Runs the checkout transaction.
#[derive(Debug, Clone)]
pub struct OrderBuilder {
    pool: SqlitePool,
    max_attempts: u32,
    backoff: Duration,
}

impl OrderBuilder {
    pub fn new(pool: SqlitePool) -> Self {
        OrderBuilder {
            pool,
            max_attempts: MAX_CHECKOUT_ATTEMPTS,
            backoff: Duration::from_millis(25),
        }
    }

    /// Overrides the number of attempts on write conflicts (minimum 1).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Base delay between attempts; attempt `n` waits `n × backoff`.
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Converts the user's cart into a PENDING order.
    ///
    /// ## Errors
    /// * `Validation` - blank or oversized shipping address
    /// * `EmptyCart` - no cart, or a cart without lines
    /// * `Validation` - the cart prices to zero and could never be paid
    /// * `InsufficientStock` - first line whose quantity exceeds stock
    /// * `ConcurrencyConflict` - the store stayed locked for every attempt
    ///
    /// On any error, stock, cart and orders are exactly as before the call.
    pub async fn checkout(&self, user_id: &str, shipping_address: &str) -> DbResult<Order> {
        let address = validate_shipping_address(shipping_address)?;

        let mut attempt = 1;
        loop {
            match self.attempt(user_id, &address).await {
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        user_id = %user_id,
                        attempt,
                        error = %err,
                        "Checkout hit a write conflict, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn attempt(&self, user_id: &str, address: &str) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        if !touch_cart(&mut tx, user_id).await? {
            return Err(CoreError::EmptyCart.into());
        }

        let lines = sqlx::query_as::<_, CheckoutLine>(
            r#"
            SELECT ci.product_id,
                   p.name AS product_name,
                   p.price_cents AS unit_price_cents,
                   p.stock AS available_stock,
                   ci.quantity
            FROM cart_items ci
            INNER JOIN carts c ON c.id = ci.cart_id
            INNER JOIN products p ON p.id = ci.product_id
            WHERE c.user_id = ?1
            ORDER BY ci.rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        debug!(user_id = %user_id, lines = lines.len(), "Checkout snapshot read");

        check_availability(&lines)?;
        let priced = price_order(&lines)?;
        validate_payment_amount(priced.total.cents())?;

        for line in &priced.lines {
            reserve_on(&mut tx, &line.product_id, line.quantity).await?;
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();
        let items = priced
            .lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                price_at_purchase_cents: line.unit_price.cents(),
                line_total_cents: line.line_total.cents(),
                created_at: now,
            })
            .collect();

        let order = Order {
            id: order_id,
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            total_cents: priced.total.cents(),
            shipping_address: address.to_string(),
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
            items,
        };

        insert_order_on(&mut tx, &order).await?;
        clear_on(&mut tx, user_id).await?;

        tx.commit().await?;

        info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %order.total(),
            items = order.items.len(),
            "Order created"
        );

        Ok(order)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};
    use storefront_core::Money;

    async fn product(db: &Database, name: &str, price: &str, stock: i64) -> String {
        db.products()
            .create(NewProduct {
                name: name.to_string(),
                description: None,
                price_cents: Money::parse(price).unwrap().cents(),
                stock,
                category_id: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn order_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_scenario() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mug = product(&db, "Mug", "19.99", 5).await;
        db.carts().add_item("alice", &mug, 2).await.unwrap();

        let order = db.checkout().checkout("alice", "1 Main St").await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_cents, 3998);
        assert_eq!(order.total().to_string(), "$39.98");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, mug);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].price_at_purchase_cents, 1999);
        assert!(order.payment_intent_id.is_none());

        assert_eq!(db.inventory().stock(&mug).await.unwrap(), 3);
        assert!(db.carts().get_cart("alice").await.unwrap().is_empty());

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.total_cents, order.total_cents);
        assert_eq!(stored.shipping_address, "1 Main St");
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].line_total_cents, 3998);
    }

    #[tokio::test]
    async fn test_total_equals_sum_of_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = product(&db, "A", "3.33", 10).await;
        let b = product(&db, "B", "0.01", 10).await;
        let c = product(&db, "C", "12.50", 10).await;
        db.carts().add_item("alice", &a, 3).await.unwrap();
        db.carts().add_item("alice", &b, 7).await.unwrap();
        db.carts().add_item("alice", &c, 1).await.unwrap();

        let order = db.checkout().checkout("alice", "1 Main St").await.unwrap();
        assert_eq!(order.items_total().unwrap(), order.total());
        assert_eq!(order.total_cents, 999 + 7 + 1250);

        assert_eq!(db.inventory().stock(&a).await.unwrap(), 7);
        assert_eq!(db.inventory().stock(&b).await.unwrap(), 3);
        assert_eq!(db.inventory().stock(&c).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_catalog_change() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mug = product(&db, "Mug", "19.99", 5).await;
        db.carts().add_item("alice", &mug, 1).await.unwrap();
        let order = db.checkout().checkout("alice", "1 Main St").await.unwrap();

        let mut current = db.products().require(&mug).await.unwrap();
        current.price_cents = 2999;
        current.name = "Big Mug".to_string();
        db.products().update(&current).await.unwrap();

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.total_cents, 1999);
        assert_eq!(stored.items[0].price_at_purchase_cents, 1999);
        assert_eq!(stored.items[0].product_name, "Mug");
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let plenty = product(&db, "Plenty", "1.00", 10).await;
        let scarce = product(&db, "Scarce", "2.00", 1).await;
        db.carts().add_item("alice", &plenty, 2).await.unwrap();
        db.carts().add_item("alice", &scarce, 3).await.unwrap();

        let err = db.checkout().checkout("alice", "1 Main St").await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product_id,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_id, scarce);
                assert_eq!(available, 1);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(db.inventory().stock(&plenty).await.unwrap(), 10);
        assert_eq!(db.inventory().stock(&scarce).await.unwrap(), 1);
        assert_eq!(db.carts().get_cart("alice").await.unwrap().items.len(), 2);
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db.checkout().checkout("nobody", "1 Main St").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));

        let mug = product(&db, "Mug", "1.00", 5).await;
        db.carts().add_item("alice", &mug, 1).await.unwrap();
        db.carts().clear("alice").await.unwrap();
        let err = db.checkout().checkout("alice", "1 Main St").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_blank_address_rejected_before_transaction() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mug = product(&db, "Mug", "1.00", 5).await;
        db.carts().add_item("alice", &mug, 1).await.unwrap();

        let err = db.checkout().checkout("alice", "   ").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert_eq!(db.inventory().stock(&mug).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_free_cart_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sample = product(&db, "Tea Sample", "0", 5).await;
        db.carts().add_item("alice", &sample, 2).await.unwrap();

        let err = db.checkout().checkout("alice", "1 Main St").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))), "{err:?}");

        assert_eq!(db.inventory().stock(&sample).await.unwrap(), 5);
        assert_eq!(db.carts().get_cart("alice").await.unwrap().items.len(), 1);
        assert_eq!(order_count(&db).await, 0);

        // A free line next to a paid one is fine.
        let mug = product(&db, "Mug", "4.50", 5).await;
        db.carts().add_item("alice", &mug, 1).await.unwrap();
        let order = db.checkout().checkout("alice", "1 Main St").await.unwrap();
        assert_eq!(order.total_cents, 450);
        assert_eq!(order.items.len(), 2);
        assert_eq!(db.inventory().stock(&sample).await.unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_last_unit_goes_to_exactly_one_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(
            DbConfig::new(dir.path().join("race.db"))
                .max_connections(4)
                .busy_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

        let last = product(&db, "Last One", "9.99", 1).await;
        db.carts().add_item("alice", &last, 1).await.unwrap();
        db.carts().add_item("bob", &last, 1).await.unwrap();

        let checkout_a = db.checkout();
        let checkout_b = db.checkout();
        let (a, b) = tokio::join!(
            checkout_a.checkout("alice", "1 Main St"),
            checkout_b.checkout("bob", "2 Side St"),
        );

        let results = [a, b];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        for failure in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(
                    failure,
                    DbError::Domain(CoreError::InsufficientStock { .. })
                        | DbError::ConcurrencyConflict(_)
                ),
                "unexpected error: {failure:?}"
            );
        }

        assert_eq!(db.inventory().stock(&last).await.unwrap(), 0);
        assert_eq!(order_count(&db).await, 1);
    }
}
