//! # Domain Errors
//!
//! ```text
//!   ValidationError ──► CoreError ──► DbError ──► PaymentError ──► ApiError
//!   (bad input)         (rule broken)  (storage)   (gateway,        (HTTP)
//!                                                   webhook)
//! ```
//!
//! A `CoreError` always means the operation did nothing. Nothing in this
//! crate retries.

use thiserror::Error;

use crate::types::OrderStatus;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Also returned for another user's order.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The product is not in the user's cart.
    #[error("Product {product_id} is not in the cart")]
    ItemNotFound { product_id: String },

    /// Checkout was attempted on a missing or empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The conditional decrement matched no row. `available` is the stock
    /// read inside the same transaction.
    #[error("Insufficient stock for {product_name} ({product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// e.g. a payment intent for a PAID order.
    #[error("Order {order_id} is {current}, cannot {operation}")]
    InvalidOrderStatus {
        order_id: String,
        current: OrderStatus,
        operation: String,
    },

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Amount overflow while pricing {context}")]
    AmountOverflow { context: String },

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Rejected input, caught before any state is read.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
