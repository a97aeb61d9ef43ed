//! # Validation Module
//!
//! Input checks run before a cart command or a payment step is applied.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation (barcode widget, keypad)                        │
//! │  └── Immediate feedback, format hints                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Command decoding (till-terminal)                             │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE                                                  │
//! │  └── Business rule validation before any state changes                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a cart line id.
pub const MAX_ITEM_ID_LEN: usize = 64;

/// Maximum length of an item display name.
pub const MAX_ITEM_NAME_LEN: usize = 200;

/// Maximum length of a customer name.
pub const MAX_CUSTOMER_NAME_LEN: usize = 100;

/// Maximum length of a customer phone number.
pub const MAX_PHONE_LEN: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a cart line id.
///
/// ```rust
/// use till_core::validation::validate_item_id;
///
/// assert!(validate_item_id("SKU-001").is_ok());
/// assert!(validate_item_id("  ").is_err());
/// ```
pub fn validate_item_id(id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    if id.len() > MAX_ITEM_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: MAX_ITEM_ID_LEN,
        });
    }

    Ok(())
}

/// Validates an item display name.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_ITEM_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_ITEM_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a customer name after trimming.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    if name.chars().count() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a customer phone number after trimming.
///
/// ## Rules
/// - At most 20 characters
/// - Digits, spaces and `+ - ( )` only
/// - At least one digit
///
/// ```rust
/// use till_core::validation::validate_phone;
///
/// assert!(validate_phone("+92 300 1234567").is_ok());
/// assert!(validate_phone("call me").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    if phone.len() > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }

    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
    if !phone.chars().all(allowed) || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain digits, spaces, '+', '-', '(' or ')' only".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (free items).
///
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_unit_price;
///
/// assert!(validate_unit_price(Money::from_cents(0)).is_ok());
/// assert!(validate_unit_price(Money::from_cents(-100)).is_err());
/// assert!(validate_unit_price(Money::from_cents(i64::MAX / 2)).is_err());
/// ```
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.cents() > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "unit price".to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a tendered cash amount. Zero is allowed for a zero total.
pub fn validate_amount_received(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "amount received".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more distinct line fits in the cart.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
