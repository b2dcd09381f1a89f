//! # Checkout Service
//!
//! Turns a cart into an order, then asks for payment.
//!
//! ```text
//! checkout(user, address)
//!     │
//!     ├── OrderBuilder::checkout      one transaction: stock, order, cart
//!     │        └── error ──► nothing changed (free carts included)
//!     │
//!     └── PaymentCoordinator::create_intent
//!              └── error ──► PaymentNotStarted { order_id, .. }
//!                            order stays PENDING without an intent;
//!                            the caller retries via request_payment
//! ```

use serde::Serialize;
use tracing::warn;

use storefront_core::Order;
use storefront_db::Database;

use crate::coordinator::{PaymentCoordinator, PaymentSession};
use crate::error::{PaymentError, PaymentResult};

/// A completed checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub order: Order,
    pub payment: PaymentSession,
}

/// Checkout followed by payment intent creation.
#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    coordinator: PaymentCoordinator,
}

impl CheckoutService {
    pub fn new(db: Database, coordinator: PaymentCoordinator) -> Self {
        Self { db, coordinator }
    }

    /// Places the order and creates its payment intent.
    ///
    /// A failure after the order is committed comes back as
    /// `PaymentNotStarted`, naming the order so it can be paid later.
    pub async fn checkout(
        &self,
        user_id: &str,
        shipping_address: &str,
    ) -> PaymentResult<CheckoutReceipt> {
        let order = self.db.checkout().checkout(user_id, shipping_address).await?;

        let payment = match self.coordinator.create_intent(&order).await {
            Ok(payment) => payment,
            Err(err) => {
                warn!(
                    order_id = %order.id,
                    user_id = %user_id,
                    error = %err,
                    "Order placed but payment intent failed"
                );
                return Err(PaymentError::PaymentNotStarted {
                    order_id: order.id,
                    source: Box::new(err),
                });
            }
        };

        // Reload so the receipt carries the recorded intent id.
        let order = self.db.orders().get_by_id(&order.id).await?.unwrap_or(order);

        Ok(CheckoutReceipt { order, payment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;
    use std::sync::Arc;
    use storefront_core::{CoreError, OrderStatus};
    use storefront_db::{DbConfig, NewProduct};

    async fn setup(gateway: ScriptedGateway) -> (Database, CheckoutService, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let coordinator = PaymentCoordinator::new(db.clone(), Arc::new(gateway));
        let service = CheckoutService::new(db.clone(), coordinator);
        let product = db
            .products()
            .create(NewProduct {
                name: "Green Tea".to_string(),
                description: None,
                price_cents: 1999,
                stock: 5,
                category_id: None,
            })
            .await
            .unwrap();
        (db, service, product.id)
    }

    #[tokio::test]
    async fn test_checkout_returns_client_secret() {
        let (db, service, product_id) = setup(ScriptedGateway::succeeding()).await;
        db.carts().add_item("alice", &product_id, 2).await.unwrap();

        let receipt = service.checkout("alice", "1 Main St").await.unwrap();

        assert_eq!(receipt.order.total_cents, 3998);
        assert_eq!(receipt.order.status, OrderStatus::Pending);
        assert_eq!(
            receipt.order.payment_intent_id.as_deref(),
            Some(receipt.payment.intent_id.as_str())
        );
        assert!(!receipt.payment.client_secret.is_empty());
        assert_eq!(db.inventory().stock(&product_id).await.unwrap(), 3);
        assert!(db.carts().get_cart("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_pending_order() {
        let (db, service, product_id) = setup(ScriptedGateway::rejecting("api_error")).await;
        db.carts().add_item("alice", &product_id, 1).await.unwrap();

        let err = service.checkout("alice", "1 Main St").await.unwrap_err();
        assert!(matches!(err.cause(), PaymentError::Gateway(_)));

        let orders = db.orders().list_for_user("alice").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(err.order_id(), Some(orders[0].id.as_str()));
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert!(orders[0].payment_intent_id.is_none());
        assert_eq!(db.inventory().stock(&product_id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_empty_cart_never_reaches_gateway() {
        let gateway = Arc::new(ScriptedGateway::succeeding());
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service =
            CheckoutService::new(db.clone(), PaymentCoordinator::new(db, gateway.clone()));

        let err = service.checkout("alice", "1 Main St").await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::EmptyCart)));
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_free_cart_is_refused_without_side_effects() {
        let gateway = Arc::new(ScriptedGateway::succeeding());
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service =
            CheckoutService::new(db.clone(), PaymentCoordinator::new(db.clone(), gateway.clone()));
        let sample = db
            .products()
            .create(NewProduct {
                name: "Tea Sample".to_string(),
                description: None,
                price_cents: 0,
                stock: 5,
                category_id: None,
            })
            .await
            .unwrap();
        db.carts().add_item("alice", &sample.id, 2).await.unwrap();

        let err = service.checkout("alice", "1 Main St").await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
        assert!(err.order_id().is_none());

        assert_eq!(db.inventory().stock(&sample.id).await.unwrap(), 5);
        assert_eq!(db.carts().get_cart("alice").await.unwrap().items.len(), 1);
        assert!(db.orders().list_for_user("alice").await.unwrap().is_empty());
        assert!(gateway.requests().is_empty());
    }
}
