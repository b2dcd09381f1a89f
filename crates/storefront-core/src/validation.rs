//! # Validation
//!
//! Field checks run before anything touches the store.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────┬───────────────────┐
//! │ Check                │ Rule                         │ Called from       │
//! ├──────────────────────┼──────────────────────────────┼───────────────────┤
//! │ validate_quantity    │ 1 ..= MAX_ITEM_QUANTITY      │ cart, reserve     │
//! │ validate_cart_size   │ lines < MAX_CART_ITEMS       │ cart add          │
//! │ validate_shipping_…  │ non-blank, trimmed, bounded  │ checkout          │
//! │ validate_user_id     │ non-blank, ≤ 128 bytes       │ X-User-Id header  │
//! │ validate_payment_…   │ > 0                          │ payment intent    │
//! │ validate_product_…   │ name, price ≥ 0, stock ≥ 0   │ catalog writes    │
//! └──────────────────────┴──────────────────────────────┴───────────────────┘
//! ```
//!
//! Quantities and stock are also guarded by `CHECK` constraints in the
//! schema, so a caller that skips these still cannot persist a negative
//! row.
//!
//! ```rust
//! use storefront_core::validation::{validate_quantity, validate_shipping_address};
//!
//! assert!(validate_quantity(3).is_ok());
//! assert_eq!(validate_shipping_address("  1 Main St ").unwrap(), "1 Main St");
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_SHIPPING_ADDRESS_LEN};

pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_PRODUCT_NAME_LEN: usize = 200;
const MAX_USER_ID_LEN: usize = 128;

/// Trims `value` and checks it is present and at most `max` characters.
fn bounded_text<'a>(field: &str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value)
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Text
// =============================================================================

/// ```rust
/// use storefront_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Stoneware Mug").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    bounded_text("name", name, MAX_PRODUCT_NAME_LEN).map(|_| ())
}

/// Returns the address trimmed. Free text; nothing postal is checked.
pub fn validate_shipping_address(address: &str) -> ValidationResult<String> {
    bounded_text("shipping_address", address, MAX_SHIPPING_ADDRESS_LEN).map(str::to_string)
}

/// The identity comes from an upstream auth layer; only its shape is checked.
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }
    // Byte length: this ends up as an indexed key.
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "user_id".to_string(),
            max: MAX_USER_ID_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numbers
// =============================================================================

/// A line quantity, 1 through `MAX_ITEM_QUANTITY`.
///
/// Zero is rejected rather than read as "remove"; removal has its own
/// operation.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    match qty {
        q if q <= 0 => Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }),
        q if q > MAX_ITEM_QUANTITY => Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        }),
        _ => Ok(()),
    }
}

/// Free items are allowed.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    non_negative("price", cents)
}

pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    non_negative("stock", stock)
}

/// Payment intents must carry a positive amount; the gateway refuses zero.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents > 0 {
        Ok(())
    } else {
        Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        })
    }
}

/// Checks there is room for one more distinct line in a cart that
/// already holds `current_items`.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items < MAX_CART_ITEMS {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        field: "cart items".to_string(),
        min: 0,
        max: MAX_CART_ITEMS as i64,
    })
}
