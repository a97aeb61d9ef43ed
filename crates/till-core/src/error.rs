//! # Error Types
//!
//! Domain errors raised by the pure checkout logic.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core (this file)                                                 │
//! │  ├── CoreError        - cart and payment rule violations               │
//! │  └── ValidationError  - field-level input failures                     │
//! │                                                                         │
//! │  till-checkout                                                         │
//! │  ├── CheckoutError    - orchestration (in-flight, cancelled, ...)      │
//! │  ├── RemoteError      - change service, recovered by fallback          │
//! │  └── SubmitError      - sale submission, surfaced to the cashier       │
//! │                                                                         │
//! │  till-terminal                                                         │
//! │  └── ApiError         - what the presentation layer sees               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is rejected locally and never reaches a remote
//! collaborator.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and payment rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No line with this id is in the cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// A line quantity would exceed the per-line maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Checkout was attempted on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cash tendered does not cover the total.
    ///
    /// ## User Workflow
    /// ```text
    /// Total: $200.00
    ///      │
    ///      ▼
    /// Cashier enters tendered: $150.00
    ///      │
    ///      ▼
    /// InsufficientPayment { total: 20000, received: 15000 }
    ///      │
    ///      ▼
    /// UI keeps the cash entry open: "Insufficient payment: ..."
    /// ```
    #[error("Insufficient payment: received {received}, total {total}")]
    InsufficientPayment { total: Money, received: Money },

    /// Completion was requested before a payment method was chosen.
    #[error("No payment method selected")]
    MissingPaymentMethod,

    /// Cash was selected but no tendered amount was supplied.
    #[error("Amount received is required for cash payments")]
    MissingAmountReceived,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientPayment {
            total: Money::from_cents(20_000),
            received: Money::from_cents(15_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: received $150.00, total $200.00"
        );
        assert_eq!(
            CoreError::ItemNotInCart("42".into()).to_string(),
            "Item not in cart: 42"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::TooLong {
            field: "phone".to_string(),
            max: 20,
        };
        assert_eq!(err.to_string(), "phone must be at most 20 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
