//! # Checkout Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Validation    │  │  RemoteError    │  │     SubmitError         │ │
//! │  │  (CoreError)    │  │ (change service)│  │   (sale service)        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │ Rejected before │  │ Recovered by    │  │ Surfaced to the user,   │ │
//! │  │ any remote call │  │ local fallback, │  │ cart kept for a manual  │ │
//! │  │                 │  │ logged only     │  │ retry                   │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │  Flow control   │  │  ConfigError    │                              │
//! │  │ PaymentInFlight │  │ startup only    │                              │
//! │  │ InvalidTransition│ │                 │                              │
//! │  │ CartLocked      │  │                 │                              │
//! │  │ Cancelled       │  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;
use till_core::CoreError;

use crate::session::CheckoutPhase;

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Checkout Error
// =============================================================================

/// Errors returned by [`CheckoutSession`](crate::CheckoutSession) operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart or payment rule violation. Never reaches a remote collaborator.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// Sale submission failed; the cart is unchanged.
    #[error("Sale submission failed: {0}")]
    SubmissionFailed(#[from] SubmitError),

    /// A change calculation or submission for this checkout is outstanding.
    #[error("A payment request is already in progress")]
    PaymentInFlight,

    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: CheckoutPhase,
        action: &'static str,
    },

    /// Cart edits are only accepted while idle.
    #[error("Cart is locked while {phase}")]
    CartLocked { phase: CheckoutPhase },

    /// The checkout was cancelled before the pending request resolved.
    #[error("Checkout was cancelled")]
    Cancelled,
}

impl CheckoutError {
    pub fn invalid_transition(from: CheckoutPhase, action: &'static str) -> Self {
        CheckoutError::InvalidTransition { from, action }
    }

    /// Returns true if the cashier should be shown this error.
    ///
    /// Cancellation is initiated by the cashier, so it is not reported back.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, CheckoutError::Cancelled)
    }

    /// Returns true if repeating the same action may succeed.
    ///
    /// Only submission failures qualify; the retry is always a new
    /// cashier action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::SubmissionFailed(e) if e.is_transient())
    }
}

// =============================================================================
// Remote Error (change service)
// =============================================================================

/// Failures of the change-calculation service.
///
/// Always recovered by the local formula; logged, never shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Change service is not configured")]
    NotConfigured,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout
        } else if err.is_connect() {
            RemoteError::Connection(err.to_string())
        } else if err.is_decode() {
            RemoteError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::Status(status.as_u16())
        } else {
            RemoteError::Http(err.to_string())
        }
    }
}

// =============================================================================
// Submit Error (sale service)
// =============================================================================

/// Failures of the sale-submission service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The service returned a sale without an id.
    #[error("Response carried no sale id")]
    MissingId,

    #[error("HTTP error: {0}")]
    Http(String),
}

impl SubmitError {
    /// Network-level failures that a later manual retry may get past.
    pub fn is_transient(&self) -> bool {
        match self {
            SubmitError::Connection(_) | SubmitError::Timeout | SubmitError::Http(_) => true,
            SubmitError::Rejected { status, .. } => *status >= 500,
            SubmitError::Malformed(_) | SubmitError::MissingId => false,
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SubmitError::Timeout
        } else if err.is_connect() {
            SubmitError::Connection(err.to_string())
        } else if err.is_decode() {
            SubmitError::Malformed(err.to_string())
        } else {
            SubmitError::Http(err.to_string())
        }
    }
}

// =============================================================================
// Config Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        ConfigError::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::Money;

    #[test]
    fn test_validation_errors_pass_through_message() {
        let err: CheckoutError = CoreError::InsufficientPayment {
            total: Money::from_cents(20_000),
            received: Money::from_cents(15_000),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Insufficient payment: received $150.00, total $200.00"
        );
        assert!(err.is_user_visible());
    }

    #[test]
    fn test_cancellation_is_not_user_visible() {
        assert!(!CheckoutError::Cancelled.is_user_visible());
        assert!(CheckoutError::PaymentInFlight.is_user_visible());
    }

    #[test]
    fn test_retryable_submission_errors() {
        assert!(CheckoutError::SubmissionFailed(SubmitError::Timeout).is_retryable());
        assert!(CheckoutError::SubmissionFailed(SubmitError::Rejected {
            status: 503,
            message: "busy".into()
        })
        .is_retryable());
        assert!(!CheckoutError::SubmissionFailed(SubmitError::Rejected {
            status: 422,
            message: "bad sale".into()
        })
        .is_retryable());
        assert!(!CheckoutError::PaymentInFlight.is_retryable());
    }

    #[test]
    fn test_transition_message() {
        let err = CheckoutError::invalid_transition(CheckoutPhase::Idle, "complete payment");
        assert_eq!(err.to_string(), "Cannot complete payment while idle");
    }
}
