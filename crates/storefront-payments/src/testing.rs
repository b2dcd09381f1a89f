//! In-process gateway and fixtures for tests.
//!
//! Compiled for this crate's own tests and, through the `test-util`
//! feature, for downstream crates' tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use storefront_core::Order;
use storefront_db::{Database, NewProduct};

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::{IntentRequest, PaymentGateway, PaymentIntent};

#[derive(Debug, Clone)]
enum Script {
    Succeed,
    Reject(String),
    Stall(Duration),
}

/// A gateway that answers from a script and records every request.
#[derive(Debug)]
pub struct ScriptedGateway {
    script: Script,
    next_id: AtomicU64,
    requests: Mutex<Vec<IntentRequest>>,
}

impl ScriptedGateway {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            next_id: AtomicU64::new(1),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates intents `pi_test_1`, `pi_test_2`, ...
    pub fn succeeding() -> Self {
        Self::with_script(Script::Succeed)
    }

    /// Rejects every request with `reason`.
    pub fn rejecting(reason: &str) -> Self {
        Self::with_script(Script::Reject(reason.to_string()))
    }

    /// Sleeps for `delay` before succeeding.
    pub fn stalling(delay: Duration) -> Self {
        Self::with_script(Script::Stall(delay))
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<IntentRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn issue(&self) -> PaymentIntent {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let id = format!("pi_test_{}", n);
        PaymentIntent {
            client_secret: format!("{}_secret_{}", id, n * 7919),
            id,
        }
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_intent(&self, request: &IntentRequest) -> PaymentResult<PaymentIntent> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match &self.script {
            Script::Succeed => Ok(self.issue()),
            Script::Reject(reason) => Err(PaymentError::Gateway(reason.clone())),
            Script::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(self.issue())
            }
        }
    }
}

/// Creates a product, puts `quantity` of it in `user_id`'s cart and checks
/// out, returning the PENDING order.
pub async fn seed_pending_order(
    db: &Database,
    user_id: &str,
    price_cents: i64,
    quantity: i64,
) -> Order {
    let product = db
        .products()
        .create(NewProduct {
            name: format!("Fixture {}", price_cents),
            description: None,
            price_cents,
            stock: quantity + 10,
            category_id: None,
        })
        .await
        .expect("fixture product");
    db.carts()
        .add_item(user_id, &product.id, quantity)
        .await
        .expect("fixture cart");
    db.checkout()
        .checkout(user_id, "1 Fixture Lane")
        .await
        .expect("fixture checkout")
}
