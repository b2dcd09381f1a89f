//! Shared handler state.

use std::sync::Arc;
use std::time::Duration;

use storefront_db::Database;
use storefront_payments::{
    CheckoutService, PaymentCoordinator, PaymentGateway, ReconciliationHandler, WebhookVerifier,
};

/// Everything handlers need, cloned per request.
///
/// ```text
/// AppState
/// ├── db              carts, orders (reads)
/// ├── checkout        OrderBuilder + PaymentCoordinator
/// ├── payments        PaymentCoordinator (payment retry)
/// └── reconciliation  webhook events
/// ```
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub checkout: CheckoutService,
    pub payments: PaymentCoordinator,
    pub reconciliation: ReconciliationHandler,
}

/// Payment settings shared by the coordinator and the webhook verifier.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub currency: String,
    pub gateway_timeout: Duration,
    pub webhook_secret: String,
    pub webhook_tolerance: Duration,
}

impl AppState {
    /// Wires the services around one database and one gateway.
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>, settings: PaymentSettings) -> Self {
        let payments = PaymentCoordinator::new(db.clone(), gateway)
            .with_currency(settings.currency)
            .with_timeout(settings.gateway_timeout);

        let verifier =
            WebhookVerifier::new(settings.webhook_secret).with_tolerance(settings.webhook_tolerance);

        Self {
            checkout: CheckoutService::new(db.clone(), payments.clone()),
            reconciliation: ReconciliationHandler::new(db.clone(), verifier),
            payments,
            db,
        }
    }
}
