//! # API Error Type
//!
//! Error shape returned to the presentation layer.
//!
//! ```json
//! { "code": "INSUFFICIENT_PAYMENT", "message": "Insufficient payment: received $150.00, total $200.00" }
//! ```

use serde::Serialize;
use thiserror::Error;

use till_checkout::{CheckoutError, SubmitError};
use till_core::{CoreError, ValidationError};

/// API error returned from commands.
#[derive(Debug, Clone, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code:?}] {message}")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Set when the cashier caused the failure (a cancel) and the front
    /// end should not show it
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub silent: bool,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Line not in cart, or no sale to print
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Cart limit or empty cart
    CartError,

    /// Cash tendered is below the total
    InsufficientPayment,

    /// Command not allowed in the current checkout phase
    InvalidTransition,

    /// Cart edits attempted during checkout
    CartLocked,

    /// A change calculation or submission is still outstanding
    PaymentInFlight,

    /// The sale service failed; the cart is unchanged
    SubmissionFailed,

    /// The request was cancelled before it finished
    Cancelled,

    /// Unparseable line or unknown command
    InvalidRequest,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            silent: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotInCart(id) => ApiError::not_found(format!("Item not in cart: {}", id)),
            CoreError::CartTooLarge { .. } | CoreError::EmptyCart => {
                ApiError::new(ErrorCode::CartError, err.to_string())
            }
            CoreError::InsufficientPayment { .. } => {
                ApiError::new(ErrorCode::InsufficientPayment, err.to_string())
            }
            CoreError::QuantityTooLarge { .. }
            | CoreError::MissingPaymentMethod
            | CoreError::MissingAmountReceived
            | CoreError::Validation(_) => ApiError::validation(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let silent = !err.is_user_visible();
        let api_error = match err {
            CheckoutError::Validation(core) => core.into(),
            CheckoutError::SubmissionFailed(submit) => {
                tracing::error!(error = %submit, "Sale submission failed");
                ApiError::new(ErrorCode::SubmissionFailed, submission_message(&submit))
            }
            CheckoutError::PaymentInFlight => {
                ApiError::new(ErrorCode::PaymentInFlight, err.to_string())
            }
            CheckoutError::InvalidTransition { .. } => {
                ApiError::new(ErrorCode::InvalidTransition, err.to_string())
            }
            CheckoutError::CartLocked { .. } => ApiError::new(ErrorCode::CartLocked, err.to_string()),
            CheckoutError::Cancelled => ApiError::new(ErrorCode::Cancelled, err.to_string()),
        };
        ApiError { silent, ..api_error }
    }
}

fn submission_message(err: &SubmitError) -> String {
    if err.is_transient() {
        "Could not reach the sales service. The cart is unchanged; try again.".to_string()
    } else {
        format!("The sales service rejected the sale: {}", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_checkout::CheckoutPhase;
    use till_core::Money;

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::not_found("Item not in cart: 7");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Item not in cart: 7");
        assert!(json.get("silent").is_none());
    }

    #[test]
    fn test_cancelled_is_silent() {
        let err = ApiError::from(CheckoutError::Cancelled);
        assert_eq!(err.code, ErrorCode::Cancelled);
        assert!(err.silent);
        assert_eq!(serde_json::to_value(&err).unwrap()["silent"], true);

        assert!(!ApiError::from(CheckoutError::PaymentInFlight).silent);
    }

    #[test]
    fn test_checkout_error_codes() {
        let cases: Vec<(CheckoutError, ErrorCode)> = vec![
            (
                CoreError::InsufficientPayment {
                    total: Money::from_cents(200),
                    received: Money::from_cents(100),
                }
                .into(),
                ErrorCode::InsufficientPayment,
            ),
            (CoreError::EmptyCart.into(), ErrorCode::CartError),
            (CoreError::ItemNotInCart("x".into()).into(), ErrorCode::NotFound),
            (CheckoutError::PaymentInFlight, ErrorCode::PaymentInFlight),
            (
                CheckoutError::CartLocked {
                    phase: CheckoutPhase::CashEntry,
                },
                ErrorCode::CartLocked,
            ),
            (
                CheckoutError::SubmissionFailed(SubmitError::Timeout),
                ErrorCode::SubmissionFailed,
            ),
            (CheckoutError::Cancelled, ErrorCode::Cancelled),
        ];

        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code, code);
        }
    }

    #[test]
    fn test_submission_messages() {
        let transient = ApiError::from(CheckoutError::SubmissionFailed(SubmitError::Timeout));
        assert!(transient.message.contains("try again"));

        let rejected = ApiError::from(CheckoutError::SubmissionFailed(SubmitError::MissingId));
        assert!(rejected.message.contains("rejected"));
    }
}
