//! # Payment Coordinator
//!
//! Requests a payment intent for an order and records the reference.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      create_intent(order)                               │
//! │                                                                         │
//! │  order.status == PENDING? ──no──► InvalidOrderStatus                   │
//! │       │ yes                                                             │
//! │  total > 0? ──no──► Validation                                         │
//! │       │ yes                                                             │
//! │  gateway.create_intent(total cents, currency, order id)                │
//! │       │   bounded by tokio::time::timeout                               │
//! │       ├── timeout / rejection ──► error, order untouched (PENDING)     │
//! │       ▼                                                                 │
//! │  orders.record_intent(order id, intent id)   (requires PENDING)        │
//! │       ▼                                                                 │
//! │  PaymentSession { order_id, intent_id, client_secret }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is retried here. Asking again for a PENDING order creates a new
//! intent and replaces the stored reference.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use storefront_core::validation::validate_payment_amount;
use storefront_core::{CoreError, Order, OrderStatus, DEFAULT_CURRENCY};
use storefront_db::Database;

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{IntentRequest, PaymentGateway};

/// Default bound on a single gateway call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// What the front-end needs to confirm a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub order_id: String,
    pub intent_id: String,
    pub client_secret: String,
}

/// Connects orders to the payment gateway.
#[derive(Clone)]
pub struct PaymentCoordinator {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    timeout: Duration,
}

impl PaymentCoordinator {
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            db,
            gateway,
            currency: DEFAULT_CURRENCY.to_string(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_lowercase();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates an intent for `order` and stores its id on the order.
    ///
    /// ## Errors
    /// * `InvalidOrderStatus` - the order is already PAID or FAILED
    /// * `Validation` - the order total is not positive
    /// * `Gateway` / `Timeout` - the provider failed; the order is unchanged
    pub async fn create_intent(&self, order: &Order) -> PaymentResult<PaymentSession> {
        if order.status != OrderStatus::Pending {
            return Err(CoreError::InvalidOrderStatus {
                order_id: order.id.clone(),
                current: order.status,
                operation: "request payment".to_string(),
            }
            .into());
        }
        validate_payment_amount(order.total_cents)?;

        let request = IntentRequest {
            amount_minor: order.total().minor_units(),
            currency: self.currency.clone(),
            order_id: order.id.clone(),
        };

        info!(order_id = %order.id, amount = request.amount_minor, "Creating payment intent");

        let intent = match tokio::time::timeout(self.timeout, self.gateway.create_intent(&request))
            .await
        {
            Ok(Ok(intent)) => intent,
            Ok(Err(err)) => {
                error!(order_id = %order.id, error = %err, "Payment intent creation failed");
                return Err(err);
            }
            Err(_) => {
                error!(
                    order_id = %order.id,
                    timeout_secs = self.timeout.as_secs(),
                    "Payment intent creation timed out"
                );
                return Err(PaymentError::Timeout(self.timeout.as_secs()));
            }
        };

        self.db.orders().record_intent(&order.id, &intent.id).await?;

        info!(order_id = %order.id, intent_id = %intent.id, "Payment intent created");

        Ok(PaymentSession {
            order_id: order.id.clone(),
            intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    /// Loads the caller's order and requests an intent for it.
    pub async fn request_payment(
        &self,
        user_id: &str,
        order_id: &str,
    ) -> PaymentResult<PaymentSession> {
        let order = self.db.orders().get_for_user(order_id, user_id).await?;
        self.create_intent(&order).await
    }
}
