//! # Validation Module
//!
//! Pre-store input validation. Requests rejected here have touched no
//! database state, which is what lets callers treat validation failures as
//! completely side-effect free.
//!
//! Database constraints (NOT NULL, CHECK, UNIQUE) remain as a second layer
//! below this one; they backstop bugs, they are not the interface.

use crate::error::{ValidationError, ValidationResult};
use crate::types::OrderItemRequest;
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_LINES};

/// Validates the item list of a create-order or preview request.
///
/// ## Rules
/// - the list must not be empty
/// - every quantity must be positive and at most [`MAX_LINE_QUANTITY`]
/// - at most [`MAX_ORDER_LINES`] lines
/// - every product id must be non-empty
pub fn validate_order_items(items: &[OrderItemRequest]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    for item in items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            });
        }

        validate_quantity(item.quantity)?;
    }

    Ok(())
}

/// Validates a single line quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a caller-supplied user id.
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    if user_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}
