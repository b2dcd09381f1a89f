//! # Payment Gateway
//!
//! The seam between the storefront and the payment provider.
//!
//! ## Shape of a Gateway Call
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Payment Intent Request                           │
//! │                                                                         │
//! │  PaymentCoordinator                                                    │
//! │       │  IntentRequest { amount_minor: 3998, currency: "usd",          │
//! │       │                  order_id: "9f1c..." }                          │
//! │       ▼                                                                 │
//! │  dyn PaymentGateway                                                    │
//! │       │                                                                 │
//! │       ├── HttpPaymentGateway  POST {base}/v1/payment_intents           │
//! │       │                       amount=3998&currency=usd&                 │
//! │       │                       metadata[order_id]=9f1c...                │
//! │       │                                                                 │
//! │       └── (tests) scripted in-process gateway                          │
//! │       ▼                                                                 │
//! │  PaymentIntent { id: "pi_...", client_secret: "pi_..._secret_..." }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The HTTP client speaks the Stripe form API: basic auth with the secret
//! key as the user name, and an `{"error": {"message": ...}}` body on
//! rejection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{PaymentError, PaymentResult};

/// Default gateway endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "https://api.stripe.com";

// =============================================================================
// Request / Response
// =============================================================================

/// What the storefront asks the provider for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Amount in minor units (cents), exactly the order total.
    pub amount_minor: i64,

    /// ISO currency code, lowercase.
    pub currency: String,

    /// Reference tag echoed back in provider events.
    pub order_id: String,
}

/// A created payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider reference, stored on the order.
    pub id: String,

    /// Handed to the front-end to confirm the payment.
    pub client_secret: String,
}

/// A payment provider able to create intents.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for the given amount.
    async fn create_intent(&self, request: &IntentRequest) -> PaymentResult<PaymentIntent>;
}

// =============================================================================
// HTTP Gateway
// =============================================================================

/// Gateway client over HTTPS.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl std::fmt::Debug for HttpPaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPaymentGateway")
            .field("base_url", &self.base_url)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl HttpPaymentGateway {
    /// Builds a client for `base_url` with a per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> PaymentResult<Self> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(PaymentError::InvalidConfig(
                "gateway secret key is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.base_url)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(&self, request: &IntentRequest) -> PaymentResult<PaymentIntent> {
        let amount = request.amount_minor.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", request.currency.as_str()),
            ("metadata[order_id]", request.order_id.as_str()),
        ];

        debug!(order_id = %request.order_id, amount = request.amount_minor, "POST payment_intents");

        let response = self
            .client
            .post(self.intents_url())
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<GatewayErrorBody>(&body)
                .ok()
                .map(|b| match (b.error.kind, b.error.message) {
                    (Some(kind), Some(msg)) => format!("{}: {}", kind, msg),
                    (None, Some(msg)) => msg,
                    (Some(kind), None) => kind,
                    (None, None) => status.to_string(),
                })
                .unwrap_or_else(|| status.to_string());
            error!(order_id = %request.order_id, status = %status, reason = %reason, "Gateway rejected intent");
            return Err(PaymentError::Gateway(reason));
        }

        serde_json::from_str::<PaymentIntent>(&body)
            .map_err(|e| PaymentError::Gateway(format!("unexpected gateway response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_secret() {
        let result = HttpPaymentGateway::new(DEFAULT_GATEWAY_URL, "  ", Duration::from_secs(5));
        assert!(matches!(result, Err(PaymentError::InvalidConfig(_))));
    }

    #[test]
    fn test_intents_url_drops_trailing_slash() {
        let gateway =
            HttpPaymentGateway::new("http://localhost:12111/", "sk_test", Duration::from_secs(5))
                .unwrap();
        assert_eq!(gateway.intents_url(), "http://localhost:12111/v1/payment_intents");
    }

    #[test]
    fn test_debug_hides_secret() {
        let gateway =
            HttpPaymentGateway::new(DEFAULT_GATEWAY_URL, "sk_live_abc", Duration::from_secs(5))
                .unwrap();
        let printed = format!("{:?}", gateway);
        assert!(!printed.contains("sk_live_abc"));
    }

    #[test]
    fn test_intent_response_parses() {
        let intent: PaymentIntent = serde_json::from_str(
            r#"{"id":"pi_123","object":"payment_intent","client_secret":"pi_123_secret_x","amount":3998}"#,
        )
        .unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret_x");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_gateway_error() {
        // Port 9 (discard) on localhost is not listening in test environments.
        let gateway =
            HttpPaymentGateway::new("http://127.0.0.1:9", "sk_test", Duration::from_secs(2))
                .unwrap();
        let request = IntentRequest {
            amount_minor: 100,
            currency: "usd".to_string(),
            order_id: "o-1".to_string(),
        };
        let result = gateway.create_intent(&request).await;
        assert!(matches!(result, Err(PaymentError::Gateway(_))));
    }
}
