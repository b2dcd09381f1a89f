//! # Reconciliation Handler
//!
//! Applies payment provider events to orders.
//!
//! ## Event Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   handle_event(payload, signature)                      │
//! │                                                                         │
//! │  1. verify signature ──fail──► InvalidSignature (nothing touched)      │
//! │  2. read id + type   ──fail──► MalformedEvent   (nothing touched)      │
//! │  3. dispatch on type                                                   │
//! │                                                                         │
//! │     payment_intent.succeeded       ──► settle(intent, Succeeded)       │
//! │     payment_intent.payment_failed  ──► settle(intent, Failed)          │
//! │     anything else                  ──► Ignored (data never read)       │
//! │                                                                         │
//! │     intent events need data.object.id, else MalformedEvent             │
//! │                                                                         │
//! │  settle() outcomes                                                     │
//! │     PENDING → PAID / FAILED        ──► Applied                         │
//! │     already PAID / FAILED          ──► AlreadySettled (no-op)          │
//! │     no order with that intent      ──► Unmatched (warn, acknowledged)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A retried payment request replaces the order's intent id, so a success
//! for the earlier intent no longer matches by intent. Intents carry
//! `metadata.order_id`; an unmatched success falls back to
//! `settle_by_order` with it. Unmatched failures are not applied that way,
//! since the newer intent may still be paid.
//!
//! Every outcome except the two rejections is acknowledged with 200 by the
//! HTTP layer, so the provider stops redelivering.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use storefront_core::{OrderStatus, PaymentOutcome};
use storefront_db::{Database, SettlementResult};

use crate::error::{PaymentError, PaymentResult};
use crate::signature::WebhookVerifier;

/// Event type for a captured payment.
pub const EVENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Event type for a declined or abandoned payment.
pub const EVENT_FAILED: &str = "payment_intent.payment_failed";

// =============================================================================
// Event Payload
// =============================================================================

/// A provider event envelope. `data` stays untyped until the event type
/// says what shape it has.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    /// Provider event id (`evt_...`), used for logging.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct IntentData {
    object: IntentObject,
}

/// The payment intent a `payment_intent.*` event is about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntentObject {
    pub id: String,

    #[serde(default)]
    pub metadata: IntentMetadata,
}

/// Metadata attached when the intent was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IntentMetadata {
    #[serde(default)]
    pub order_id: Option<String>,
}

impl PaymentEvent {
    /// Maps the event type to a settlement outcome.
    pub fn outcome(&self) -> Option<PaymentOutcome> {
        match self.event_type.as_str() {
            EVENT_SUCCEEDED => Some(PaymentOutcome::Succeeded),
            EVENT_FAILED => Some(PaymentOutcome::Failed),
            _ => None,
        }
    }

    /// Reads the intent out of `data.object`.
    pub fn intent(&self) -> PaymentResult<IntentObject> {
        let data = IntentData::deserialize(&self.data).map_err(|err| {
            PaymentError::MalformedEvent(format!("{} event: {}", self.event_type, err))
        })?;
        Ok(data.object)
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// What handling a verified event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// A PENDING order moved to `status`.
    #[serde(rename_all = "camelCase")]
    Applied { order_id: String, status: OrderStatus },

    /// The order was already terminal; nothing changed.
    #[serde(rename_all = "camelCase")]
    AlreadySettled { order_id: String, status: OrderStatus },

    /// No order carries the intent.
    #[serde(rename_all = "camelCase")]
    Unmatched { intent_id: String },

    /// An event type reconciliation does not act on.
    #[serde(rename_all = "camelCase")]
    Ignored { event_type: String },
}

// =============================================================================
// Handler
// =============================================================================

/// Verifies and applies provider events.
#[derive(Debug, Clone)]
pub struct ReconciliationHandler {
    db: Database,
    verifier: WebhookVerifier,
}

impl ReconciliationHandler {
    pub fn new(db: Database, verifier: WebhookVerifier) -> Self {
        Self { db, verifier }
    }

    /// Handles one webhook delivery.
    ///
    /// Safe to call repeatedly with the same event: a second delivery
    /// reports `AlreadySettled` and changes nothing.
    pub async fn handle_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> PaymentResult<ReconcileOutcome> {
        if let Err(err) = self.verifier.verify(payload, signature) {
            warn!(error = %err, "Rejected webhook with bad signature");
            return Err(err);
        }

        let event: PaymentEvent = serde_json::from_slice(payload)?;
        self.apply(&event).await
    }

    /// Applies an already verified event.
    pub async fn apply(&self, event: &PaymentEvent) -> PaymentResult<ReconcileOutcome> {
        let Some(outcome) = event.outcome() else {
            debug!(
                event_id = ?event.id,
                event_type = %event.event_type,
                "Ignoring payment event"
            );
            return Ok(ReconcileOutcome::Ignored {
                event_type: event.event_type.clone(),
            });
        };

        let intent = event.intent()?;
        let intent_id = intent.id.as_str();
        let orders = self.db.orders();
        let mut settled = orders.settle(intent_id, outcome).await?;

        if settled == SettlementResult::Unmatched && outcome == PaymentOutcome::Succeeded {
            if let Some(order_id) = intent.metadata.order_id.as_deref() {
                debug!(
                    event_id = ?event.id,
                    intent_id = %intent_id,
                    order_id = %order_id,
                    "Intent superseded, settling by order id"
                );
                settled = orders.settle_by_order(order_id, intent_id, outcome).await?;
            }
        }

        let result = match settled {
            SettlementResult::Applied { order, previous } => {
                info!(
                    event_id = ?event.id,
                    order_id = %order.id,
                    from = %previous,
                    to = %order.status,
                    "Payment event applied"
                );
                ReconcileOutcome::Applied {
                    order_id: order.id,
                    status: order.status,
                }
            }
            SettlementResult::AlreadySettled(order) => {
                debug!(
                    event_id = ?event.id,
                    order_id = %order.id,
                    status = %order.status,
                    "Duplicate payment event"
                );
                ReconcileOutcome::AlreadySettled {
                    order_id: order.id,
                    status: order.status,
                }
            }
            SettlementResult::Unmatched => {
                warn!(
                    event_id = ?event.id,
                    intent_id = %intent_id,
                    event_type = %event.event_type,
                    "Payment event matches no order"
                );
                ReconcileOutcome::Unmatched {
                    intent_id: intent_id.to_string(),
                }
            }
        };

        Ok(result)
    }
}
