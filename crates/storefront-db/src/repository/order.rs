//! # Order Repository
//!
//! Reads orders and applies the only two mutations an order ever sees after
//! checkout: recording a payment intent and settling its status.
//!
//! ## Conditional Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE orders SET status = 'paid'                                      │
//! │   WHERE payment_intent_id = :intent AND status = 'pending'              │
//! │                                                                         │
//! │  Webhook delivery #1 ──► 1 row  ──► Applied        (PENDING → PAID)    │
//! │  Webhook delivery #2 ──► 0 rows ──► AlreadySettled (no-op)             │
//! │  Unknown intent      ──► 0 rows ──► Unmatched      (logged, acked)     │
//! │                                                                         │
//! │  Two concurrent deliveries collapse to exactly one transition.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `settle_by_order` runs the same predicate keyed on the order id, for an
//! intent that a retried payment request has since replaced.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use storefront_core::{CoreError, Order, OrderItem, OrderStatus, PaymentOutcome, StatusChange};

/// What happened when a payment outcome was applied to an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    /// The order moved out of PENDING.
    Applied {
        order: Order,
        previous: OrderStatus,
    },
    /// The order was already terminal; nothing changed.
    AlreadySettled(Order),
    /// No order carries this intent id.
    Unmatched,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order (with items) by id.
    pub async fn get_by_id(&self, order_id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, OrderKey::Id(order_id)).await
    }

    /// Gets an order owned by `user_id`.
    ///
    /// Another user's order is reported as `NotFound`, not as forbidden, so
    /// order ids cannot be probed.
    pub async fn get_for_user(&self, order_id: &str, user_id: &str) -> DbResult<Order> {
        match self.get_by_id(order_id).await? {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(CoreError::not_found("Order", order_id).into()),
        }
    }

    /// Finds the order carrying a payment intent.
    pub async fn find_by_intent(&self, intent_id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, OrderKey::Intent(intent_id)).await
    }

    /// Lists a user's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;

        let mut orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, status, total_cents, shipping_address,
                   payment_intent_id, created_at, updated_at
            FROM orders
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        for order in orders.iter_mut() {
            order.items = fetch_items(&mut conn, &order.id).await?;
        }

        Ok(orders)
    }

    /// Lists all orders, optionally filtered by status, newest first.
    pub async fn list(&self, status: Option<OrderStatus>, limit: u32) -> DbResult<Vec<Order>> {
        debug!(status = ?status, limit, "Listing orders");

        let mut conn = self.pool.acquire().await?;

        let mut orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, status, total_cents, shipping_address,
                   payment_intent_id, created_at, updated_at
            FROM orders
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        for order in orders.iter_mut() {
            order.items = fetch_items(&mut conn, &order.id).await?;
        }

        Ok(orders)
    }

    /// Stores the payment intent id on a PENDING order.
    ///
    /// Replaces any earlier intent id. Fails with `InvalidOrderStatus` once
    /// the order is PAID or FAILED.
    pub async fn record_intent(&self, order_id: &str, intent_id: &str) -> DbResult<Order> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET payment_intent_id = ?2, updated_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(order_id)
        .bind(intent_id)
        .bind(Utc::now())
        .bind(OrderStatus::Pending)
        .execute(&self.pool)
        .await?;

        let order = self
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InvalidOrderStatus {
                order_id: order_id.to_string(),
                current: order.status,
                operation: "record a payment intent".to_string(),
            }
            .into());
        }

        info!(order_id = %order_id, intent_id = %intent_id, "Payment intent recorded");
        Ok(order)
    }

    /// Applies a provider outcome to the order holding `intent_id`.
    ///
    /// Only a PENDING order is changed; the status predicate lives in the
    /// UPDATE itself so duplicate deliveries race safely.
    pub async fn settle(
        &self,
        intent_id: &str,
        outcome: PaymentOutcome,
    ) -> DbResult<SettlementResult> {
        let target = outcome.target_status();

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?2, updated_at = ?3
            WHERE payment_intent_id = ?1 AND status = ?4
            "#,
        )
        .bind(intent_id)
        .bind(target)
        .bind(Utc::now())
        .bind(OrderStatus::Pending)
        .execute(&self.pool)
        .await?;

        let order = self.find_by_intent(intent_id).await?;
        settlement(order, result.rows_affected(), outcome, intent_id)
    }

    /// Applies a provider outcome to a PENDING order found by id, adopting
    /// `intent_id` as its payment reference.
    ///
    /// Covers an intent that was superseded by a later `record_intent`
    /// before the provider reported on it. Same status predicate as
    /// [`settle`](Self::settle).
    pub async fn settle_by_order(
        &self,
        order_id: &str,
        intent_id: &str,
        outcome: PaymentOutcome,
    ) -> DbResult<SettlementResult> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?3, payment_intent_id = ?2, updated_at = ?4
            WHERE id = ?1 AND status = ?5
            "#,
        )
        .bind(order_id)
        .bind(intent_id)
        .bind(outcome.target_status())
        .bind(Utc::now())
        .bind(OrderStatus::Pending)
        .execute(&self.pool)
        .await?;

        let order = self.get_by_id(order_id).await?;
        settlement(order, result.rows_affected(), outcome, intent_id)
    }
}

/// Interprets a conditional settlement UPDATE and the row read back after it.
fn settlement(
    order: Option<Order>,
    rows_affected: u64,
    outcome: PaymentOutcome,
    intent_id: &str,
) -> DbResult<SettlementResult> {
    let Some(order) = order else {
        return Ok(SettlementResult::Unmatched);
    };

    if rows_affected == 1 {
        info!(
            order_id = %order.id,
            intent_id = %intent_id,
            status = %order.status,
            "Order settled"
        );
        return Ok(SettlementResult::Applied {
            order,
            previous: OrderStatus::Pending,
        });
    }

    match order.status.apply(outcome) {
        StatusChange::Unchanged(status) => {
            debug!(
                order_id = %order.id,
                status = %status,
                "Order already settled, outcome ignored"
            );
            Ok(SettlementResult::AlreadySettled(order))
        }
        // Still pending after a failed conditional update: another
        // writer touched the row between the two statements.
        StatusChange::Changed { .. } => Err(DbError::ConcurrencyConflict(format!(
            "order {} changed while settling intent {}",
            order.id, intent_id
        ))),
    }
}

// =============================================================================
// Connection-level helpers (shared with the checkout transaction)
// =============================================================================

/// How a single order is looked up.
enum OrderKey<'a> {
    Id(&'a str),
    Intent(&'a str),
}

/// Fetches one order with its items.
async fn fetch_order(conn: &mut SqliteConnection, key: OrderKey<'_>) -> DbResult<Option<Order>> {
    let (sql, value) = match key {
        OrderKey::Id(id) => (
            r#"
            SELECT id, user_id, status, total_cents, shipping_address,
                   payment_intent_id, created_at, updated_at
            FROM orders WHERE id = ?1
            "#,
            id,
        ),
        OrderKey::Intent(intent_id) => (
            r#"
            SELECT id, user_id, status, total_cents, shipping_address,
                   payment_intent_id, created_at, updated_at
            FROM orders WHERE payment_intent_id = ?1
            "#,
            intent_id,
        ),
    };

    let order = sqlx::query_as::<_, Order>(sql)
        .bind(value)
        .fetch_optional(&mut *conn)
        .await?;

    match order {
        Some(mut order) => {
            order.items = fetch_items(conn, &order.id).await?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, product_name, quantity,
               price_at_purchase_cents, line_total_cents, created_at
        FROM order_items
        WHERE order_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Inserts the order row and its items.
pub(crate) async fn insert_order_on(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, user_id, status, total_cents, shipping_address,
            payment_intent_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&order.id)
    .bind(&order.user_id)
    .bind(order.status)
    .bind(order.total_cents)
    .bind(&order.shipping_address)
    .bind(&order.payment_intent_id)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for item in &order.items {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, product_id, product_name, quantity,
                price_at_purchase_cents, line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.price_at_purchase_cents)
        .bind(item.line_total_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use uuid::Uuid;

    /// Writes a single-item PENDING order directly, bypassing checkout.
    async fn seed_order(db: &Database, user_id: &str) -> Order {
        let product_id = db
            .products()
            .create(crate::repository::product::NewProduct {
                name: "Mug".to_string(),
                description: None,
                price_cents: 1999,
                stock: 10,
                category_id: None,
            })
            .await
            .unwrap()
            .id;

        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();
        let order = Order {
            id: order_id.clone(),
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            total_cents: 3998,
            shipping_address: "1 Main St".to_string(),
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
            items: vec![OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id,
                product_id,
                product_name: "Mug".to_string(),
                quantity: 2,
                price_at_purchase_cents: 1999,
                line_total_cents: 3998,
                created_at: now,
            }],
        };

        let mut conn = db.pool().acquire().await.unwrap();
        insert_order_on(&mut conn, &order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_get_scoped_to_owner() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = seed_order(&db, "alice").await;

        let fetched = db.orders().get_for_user(&order.id, "alice").await.unwrap();
        assert_eq!(fetched.items.len(), 1);
        assert_eq!(fetched.items_total().unwrap(), fetched.total());

        let err = db.orders().get_for_user(&order.id, "mallory").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_for_user_and_by_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_order(&db, "alice").await;
        seed_order(&db, "alice").await;
        let bobs = seed_order(&db, "bob").await;

        assert_eq!(db.orders().list_for_user("alice").await.unwrap().len(), 2);
        assert_eq!(db.orders().list(None, 100).await.unwrap().len(), 3);

        db.orders().record_intent(&bobs.id, "pi_bob").await.unwrap();
        db.orders()
            .settle("pi_bob", PaymentOutcome::Succeeded)
            .await
            .unwrap();

        let paid = db.orders().list(Some(OrderStatus::Paid), 100).await.unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id, bobs.id);
        let pending = db
            .orders()
            .list(Some(OrderStatus::Pending), 100)
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn test_settle_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = seed_order(&db, "alice").await;
        db.orders().record_intent(&order.id, "pi_1").await.unwrap();

        let first = db.orders().settle("pi_1", PaymentOutcome::Succeeded).await.unwrap();
        match first {
            SettlementResult::Applied { order, previous } => {
                assert_eq!(previous, OrderStatus::Pending);
                assert_eq!(order.status, OrderStatus::Paid);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let second = db.orders().settle("pi_1", PaymentOutcome::Succeeded).await.unwrap();
        assert!(matches!(second, SettlementResult::AlreadySettled(ref o) if o.status == OrderStatus::Paid));

        // A late failure event cannot move a paid order.
        let late = db.orders().settle("pi_1", PaymentOutcome::Failed).await.unwrap();
        assert!(matches!(late, SettlementResult::AlreadySettled(ref o) if o.status == OrderStatus::Paid));
    }

    #[tokio::test]
    async fn test_settle_unknown_intent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = seed_order(&db, "alice").await;

        let result = db.orders().settle("pi_nope", PaymentOutcome::Succeeded).await.unwrap();
        assert_eq!(result, SettlementResult::Unmatched);

        let untouched = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_record_intent_rules() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = seed_order(&db, "alice").await;

        db.orders().record_intent(&order.id, "pi_a").await.unwrap();
        let replaced = db.orders().record_intent(&order.id, "pi_b").await.unwrap();
        assert_eq!(replaced.payment_intent_id.as_deref(), Some("pi_b"));
        assert!(db.orders().find_by_intent("pi_a").await.unwrap().is_none());

        db.orders().settle("pi_b", PaymentOutcome::Failed).await.unwrap();
        let err = db.orders().record_intent(&order.id, "pi_c").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidOrderStatus {
                current: OrderStatus::Failed,
                ..
            })
        ));

        assert!(matches!(
            db.orders().record_intent("missing", "pi_d").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_settle_by_order_adopts_superseded_intent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = seed_order(&db, "alice").await;
        db.orders().record_intent(&order.id, "pi_first").await.unwrap();
        db.orders().record_intent(&order.id, "pi_second").await.unwrap();

        let orders = db.orders();
        let result = orders
            .settle_by_order(&order.id, "pi_first", PaymentOutcome::Succeeded)
            .await
            .unwrap();
        match result {
            SettlementResult::Applied { order, previous } => {
                assert_eq!(previous, OrderStatus::Pending);
                assert_eq!(order.status, OrderStatus::Paid);
                assert_eq!(order.payment_intent_id.as_deref(), Some("pi_first"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let again = orders
            .settle_by_order(&order.id, "pi_second", PaymentOutcome::Failed)
            .await
            .unwrap();
        assert!(matches!(again, SettlementResult::AlreadySettled(ref o) if o.status == OrderStatus::Paid));
        let stored = orders.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_intent_id.as_deref(), Some("pi_first"));

        let missing = orders
            .settle_by_order("missing", "pi_x", PaymentOutcome::Succeeded)
            .await
            .unwrap();
        assert_eq!(missing, SettlementResult::Unmatched);
    }
}
