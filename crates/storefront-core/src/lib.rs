//! # storefront-core: Pure Business Logic for the Storefront
//!
//! This crate contains the order-fulfillment rules as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 storefront-api (axum)                           │   │
//! │  │    cart routes ──► checkout ──► payment ──► webhooks           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        storefront-payments (gateway, reconciliation)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ storefront-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  snapshot │  │   rules   │  │   │
//! │  │   │  Order    │  │  parsing  │  │  totals   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               storefront-db (Database Layer)                    │   │
//! │  │       SQLite queries, migrations, checkout transaction          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Cart, Order, OrderStatus)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Freezing cart lines into priced order lines
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::{OrderStatus, PaymentOutcome, StatusChange};
//!
//! let price = Money::parse("19.99").unwrap();
//! assert_eq!(price.multiply_quantity(2).unwrap().cents(), 3998);
//!
//! let change = OrderStatus::Paid.apply(PaymentOutcome::Failed);
//! assert_eq!(change, StatusChange::Unchanged(OrderStatus::Paid));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{check_availability, price_order, CheckoutLine, PricedLine, PricedOrder};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of a shipping address after trimming.
pub const MAX_SHIPPING_ADDRESS_LEN: usize = 500;

/// How many times checkout is attempted when the database reports a
/// write conflict.
pub const MAX_CHECKOUT_ATTEMPTS: u32 = 3;

/// Currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "usd";
