//! # Domain Types
//!
//! Core domain types used throughout the storefront backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Cart       │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  user_id        │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  items          │   │  status         │       │
//! │  │  stock          │   │  total_cents    │   │  total_cents    │       │
//! │  │  version        │   └─────────────────┘   │  intent id      │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartLine     │   │   OrderItem     │   │  OrderStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  price_at_      │   │  Pending        │       │
//! │  │  quantity       │   │  purchase_cents │   │  Paid           │       │
//! │  │  (live price)   │   │  (frozen)       │   │  Failed         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
///
/// Stock is mutated by catalog edits and by the checkout reservation step.
/// It is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    pub description: Option<String>,

    /// Price in cents.
    pub price_cents: i64,

    /// Units on hand.
    pub stock: i64,

    /// Category reference (taxonomy is managed elsewhere).
    pub category_id: Option<String>,

    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if the requested quantity is currently on hand.
    ///
    /// This is advisory only. Checkout relies on the atomic reservation in
    /// the inventory ledger, never on this check.
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of a user's cart, joined with the live product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    /// Current catalog price (not frozen until checkout).
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl CartLine {
    /// Unit price × quantity, `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// A user's cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product increases quantity)
/// - Every quantity is >= 1
/// - A user without a persisted cart sees an empty `Cart`, never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartLine>,
    /// Informational total at live prices.
    pub total_cents: i64,
}

impl Cart {
    /// An empty cart for a user who has never mutated one.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Cart {
            user_id: user_id.into(),
            items: Vec::new(),
            total_cents: 0,
        }
    }

    /// Builds the cart view from persisted lines.
    ///
    /// Line totals that overflow saturate the view total; checkout prices the
    /// order separately with checked arithmetic.
    pub fn from_lines(user_id: impl Into<String>, items: Vec<CartLine>) -> Self {
        let total_cents = items
            .iter()
            .map(|line| line.line_total().map(|m| m.cents()).unwrap_or(i64::MAX))
            .fold(0i64, |acc, cents| acc.saturating_add(cents));

        Cart {
            user_id: user_id.into(),
            items,
            total_cents,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ## State Machine
/// ```text
///                 payment succeeded
///   ┌─────────┐ ───────────────────► ┌────────┐
///   │ PENDING │                      │  PAID  │  (terminal)
///   └─────────┘ ───────────────────► ├────────┤
///                 payment failed     │ FAILED │  (terminal)
///                                    └────────┘
///
///   Any event on a terminal order is a no-op (duplicate webhook delivery).
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum OrderStatus {
    /// Order created, awaiting the payment provider.
    Pending,
    /// Payment confirmed by the provider.
    Paid,
    /// Payment rejected by the provider.
    Failed,
}

impl OrderStatus {
    /// Lowercase name, as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }

    /// PAID and FAILED accept no further transitions.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid) | (OrderStatus::Pending, OrderStatus::Failed)
        )
    }

    /// Applies a payment outcome to this status.
    ///
    /// Terminal statuses absorb every outcome unchanged, which is what makes
    /// webhook re-delivery idempotent.
    pub const fn apply(&self, outcome: PaymentOutcome) -> StatusChange {
        let target = outcome.target_status();
        if self.can_transition_to(target) {
            StatusChange::Changed {
                from: *self,
                to: target,
            }
        } else {
            StatusChange::Unchanged(*self)
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    /// Accepts both the stored (`paid`) and the API (`PAID`) spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown order status '{}'", other),
            }),
        }
    }
}

/// What the payment provider reported for an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

impl PaymentOutcome {
    /// The order status this outcome drives a PENDING order to.
    pub const fn target_status(&self) -> OrderStatus {
        match self {
            PaymentOutcome::Succeeded => OrderStatus::Paid,
            PaymentOutcome::Failed => OrderStatus::Failed,
        }
    }
}

/// Result of applying a [`PaymentOutcome`] to an [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Changed { from: OrderStatus, to: OrderStatus },
    Unchanged(OrderStatus),
}

// =============================================================================
// Order
// =============================================================================

/// An order created by checkout.
///
/// Immutable after creation except `status`, `payment_intent_id` and
/// `updated_at`. `total_cents` is computed once and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub shipping_address: String,
    /// Set by the payment coordinator; `None` until an intent exists.
    pub payment_intent_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Line items, loaded separately from the order row.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderItem>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Σ quantity × price-at-purchase over the loaded items.
    pub fn items_total(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(Money::zero(), |acc, item| acc.checked_add(item.line_total()))
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
/// Uses the snapshot pattern to freeze product data at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at checkout (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price in cents at checkout (frozen, never re-derived).
    pub price_at_purchase_cents: i64,
    /// price_at_purchase × quantity.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn price_at_purchase(&self) -> Money {
        Money::from_cents(self.price_at_purchase_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
