//! # Order Pricing
//!
//! Turns the cart snapshot read inside the checkout transaction into frozen
//! order lines and a total.
//!
//! ## Snapshot Pattern
//! ```text
//! cart_items ⋈ products (read once, inside the transaction)
//!        │
//!        ▼
//! ┌────────────────────┐     ┌────────────────────────────────────────┐
//! │   CheckoutLine     │ ──► │             PricedLine                 │
//! │  product_id        │     │  unit_price  (becomes price_at_purchase)│
//! │  product_name      │     │  line_total = unit_price × quantity    │
//! │  unit_price_cents  │     └────────────────────────────────────────┘
//! │  quantity          │                      │
//! └────────────────────┘                      ▼
//!                               total = Σ line_total (checked)
//! ```
//!
//! Prices are captured here and never re-derived: later catalog price edits
//! do not touch an existing order.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_quantity;

/// A cart line joined with the product row as seen by the checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CheckoutLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    /// Stock on hand when the snapshot was read.
    pub available_stock: i64,
    pub quantity: i64,
}

/// A cart line with its price frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// The priced form of a cart, ready to be written as an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total: Money,
}

/// Checks every line against the stock in the snapshot.
///
/// Reports the first short line in cart order. This is the early, readable
/// failure; the atomic reservation that follows is what actually guarantees
/// stock never goes negative.
pub fn check_availability(lines: &[CheckoutLine]) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    match lines.iter().find(|line| line.available_stock < line.quantity) {
        Some(short) => Err(CoreError::InsufficientStock {
            product_id: short.product_id.clone(),
            product_name: short.product_name.clone(),
            available: short.available_stock,
            requested: short.quantity,
        }),
        None => Ok(()),
    }
}

/// Prices a cart snapshot.
///
/// ## Errors
/// - [`CoreError::EmptyCart`] when there are no lines
/// - [`CoreError::Validation`] for a non-positive quantity or negative price
/// - [`CoreError::AmountOverflow`] when a line or the total leaves the i64 range
///
/// The total always equals the sum of the line totals.
pub fn price_order(lines: &[CheckoutLine]) -> CoreResult<PricedOrder> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Money::zero();

    for line in lines {
        validate_quantity(line.quantity)?;
        crate::validation::validate_price_cents(line.unit_price_cents)?;

        let unit_price = Money::from_cents(line.unit_price_cents);
        let line_total =
            unit_price
                .multiply_quantity(line.quantity)
                .ok_or_else(|| CoreError::AmountOverflow {
                    context: format!("line for product {}", line.product_id),
                })?;

        total = total
            .checked_add(line_total)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: "order total".to_string(),
            })?;

        priced.push(PricedLine {
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price,
            line_total,
        });
    }

    Ok(PricedOrder {
        lines: priced,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
