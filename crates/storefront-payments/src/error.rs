//! # Payment Error Types
//!
//! Error types for gateway calls and webhook handling.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Payment Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Gateway      │  │     Webhook             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Gateway        │  │  InvalidSignature       │ │
//! │  │                 │  │  Timeout        │  │  MalformedEvent         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Database (storefront-db, including domain errors from core)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  PaymentNotStarted { order_id, source }                                 │
//! │    checkout committed, the payment step failed with `source`           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Gateway and signature failures are never retried here. The caller
//! decides whether to ask again.

use storefront_core::{CoreError, ValidationError};
use storefront_db::DbError;
use thiserror::Error;

/// Result type alias for payment operations.
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Errors from the payment layer.
#[derive(Debug, Error)]
pub enum PaymentError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Gateway or webhook settings are unusable.
    #[error("Invalid payment configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    /// The gateway rejected the request or could not be reached.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// The gateway did not answer in time.
    #[error("Payment gateway timed out after {0} seconds")]
    Timeout(u64),

    /// The order exists and is PENDING, but no intent could be created for
    /// it. Pay it later with `request_payment(order_id)`.
    #[error("Order {order_id} was placed but payment could not be started: {source}")]
    PaymentNotStarted {
        order_id: String,
        source: Box<PaymentError>,
    },

    // =========================================================================
    // Webhook Errors
    // =========================================================================
    /// Signature header missing, malformed, stale or not matching.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Verified payload that is not a payment event.
    #[error("Malformed payment event: {0}")]
    MalformedEvent(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Persistence or domain failure from the database layer.
    #[error(transparent)]
    Database(#[from] DbError),
}

impl PaymentError {
    /// Returns the domain error carried inside, if any.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self.cause() {
            PaymentError::Database(DbError::Domain(err)) => Some(err),
            _ => None,
        }
    }

    /// The underlying failure, looking through `PaymentNotStarted`.
    pub fn cause(&self) -> &PaymentError {
        match self {
            PaymentError::PaymentNotStarted { source, .. } => source.cause(),
            other => other,
        }
    }

    /// The order left behind by a checkout whose payment step failed.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            PaymentError::PaymentNotStarted { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for PaymentError {
    fn from(err: CoreError) -> Self {
        PaymentError::Database(DbError::Domain(err))
    }
}

impl From<ValidationError> for PaymentError {
    fn from(err: ValidationError) -> Self {
        PaymentError::Database(DbError::Domain(CoreError::Validation(err)))
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PaymentError::Gateway(format!("request timed out: {}", err))
        } else if err.is_connect() {
            PaymentError::Gateway(format!("connection failed: {}", err))
        } else {
            PaymentError::Gateway(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::MalformedEvent(err.to_string())
    }
}
