//! # storefront-payments: Payment Integration for the Storefront
//!
//! Everything that crosses the boundary to the payment provider.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Payment Lifecycle                                 │
//! │                                                                         │
//! │   Storefront API                             Payment provider          │
//! │        │                                            │                   │
//! │        │  CheckoutService::checkout                 │                   │
//! │        ├──► OrderBuilder (storefront-db)            │                   │
//! │        └──► PaymentCoordinator ── create intent ───►│                   │
//! │                   │ record intent id                │                   │
//! │                   ▼                                 │                   │
//! │             orders (PENDING)                        │                   │
//! │                   ▲                                 │                   │
//! │                   │ settle                          │  signed webhook   │
//! │        ReconciliationHandler ◄──────────────────────┘                   │
//! │          (WebhookVerifier first)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`gateway`] - `PaymentGateway` trait and the HTTP client
//! - [`coordinator`] - intent creation and recording
//! - [`checkout`] - checkout followed by intent creation
//! - [`signature`] - webhook signature verification
//! - [`reconciliation`] - provider events to order status
//! - [`error`] - payment error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod reconciliation;
pub mod signature;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutReceipt, CheckoutService};
pub use coordinator::{PaymentCoordinator, PaymentSession, DEFAULT_GATEWAY_TIMEOUT};
pub use error::{PaymentError, PaymentResult};
pub use gateway::{HttpPaymentGateway, IntentRequest, PaymentGateway, PaymentIntent};
pub use reconciliation::{PaymentEvent, ReconcileOutcome, ReconciliationHandler};
pub use signature::WebhookVerifier;
