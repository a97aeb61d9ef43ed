//! # Payment Processor
//!
//! Validates a payment request and settles the change figure.
//!
//! ## Change Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cash Change Resolution                             │
//! │                                                                         │
//! │  PaymentRequest ──► validate() ──✗──► CoreError (no remote call)       │
//! │                        │                                                │
//! │                        ✓                                                │
//! │                        ▼                                                │
//! │  local = amountReceived − total                                        │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  ChangeCalculator::calculate_change(total, amountReceived)             │
//! │        │                    │                       │                   │
//! │    Ok(local)          Ok(other)                   Err(e)                │
//! │        │                    │                       │                   │
//! │        ▼                    ▼                       ▼                   │
//! │  RemoteSucceeded    FallbackUsed{Divergent}  FallbackUsed{Unavailable}  │
//! │                                                                         │
//! │  The reported change is always `local`.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use till_core::{ChangeSource, Money, PaymentMethod, PaymentOutcome, PaymentRequest};

use crate::change::ChangeCalculator;
use crate::error::{CheckoutResult, RemoteError};

/// Why the local formula was used instead of the service answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    NotConfigured,
    Unavailable(String),
    /// The service answered with a figure that disagrees with the formula.
    Divergent { remote: Money },
}

impl From<RemoteError> for FallbackReason {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotConfigured => FallbackReason::NotConfigured,
            other => FallbackReason::Unavailable(other.to_string()),
        }
    }
}

/// Which path produced the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeResolution {
    RemoteSucceeded { change: Money },
    FallbackUsed { change: Money, reason: FallbackReason },
}

impl ChangeResolution {
    pub fn change(&self) -> Money {
        match self {
            ChangeResolution::RemoteSucceeded { change }
            | ChangeResolution::FallbackUsed { change, .. } => *change,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ChangeResolution::FallbackUsed { .. })
    }

    pub fn source(&self) -> ChangeSource {
        if self.is_fallback() {
            ChangeSource::LocalFallback
        } else {
            ChangeSource::Remote
        }
    }
}

/// Payment validation plus change settlement.
#[derive(Clone)]
pub struct PaymentProcessor {
    calculator: Arc<dyn ChangeCalculator>,
}

impl PaymentProcessor {
    pub fn new(calculator: Arc<dyn ChangeCalculator>) -> Self {
        PaymentProcessor { calculator }
    }

    /// Asks the change service and reconciles its answer with the local
    /// formula.
    ///
    /// Expects a validated cash request; a missing amount is treated as
    /// exact tender.
    pub async fn resolve_change(&self, request: &PaymentRequest) -> ChangeResolution {
        let received = request.amount_received.unwrap_or(request.total);
        let local = received - request.total;

        let resolution = match self.calculator.calculate_change(request.total, received).await {
            Ok(remote) if remote == local => ChangeResolution::RemoteSucceeded { change: local },
            Ok(remote) => ChangeResolution::FallbackUsed {
                change: local,
                reason: FallbackReason::Divergent { remote },
            },
            Err(err) => ChangeResolution::FallbackUsed {
                change: local,
                reason: err.into(),
            },
        };

        match &resolution {
            ChangeResolution::RemoteSucceeded { change } => {
                debug!(change = change.cents(), "Change confirmed by service");
            }
            ChangeResolution::FallbackUsed {
                reason: FallbackReason::Divergent { remote },
                change,
            } => {
                warn!(
                    local = change.cents(),
                    remote = remote.cents(),
                    total = request.total.cents(),
                    "Change service disagreed with local formula, using local value"
                );
            }
            ChangeResolution::FallbackUsed { reason, change } => {
                warn!(
                    change = change.cents(),
                    reason = ?reason,
                    "Change service unavailable, using local formula"
                );
            }
        }

        resolution
    }

    /// Validates the request and builds the payment outcome.
    ///
    /// Card payments complete without a remote call and carry no
    /// resolution. Validation failures never reach the change service.
    pub async fn process(
        &self,
        request: &PaymentRequest,
    ) -> CheckoutResult<(PaymentOutcome, Option<ChangeResolution>)> {
        request.validate()?;

        match request.method {
            PaymentMethod::Card => Ok((PaymentOutcome::card(), None)),
            PaymentMethod::Cash => {
                let resolution = self.resolve_change(request).await;
                let received = request.amount_received.unwrap_or(request.total);
                let outcome =
                    PaymentOutcome::cash(received, resolution.change(), resolution.source());
                Ok((outcome, Some(resolution)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::UnconfiguredChangeCalculator;
    use crate::error::CheckoutError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use till_core::CoreError;

    /// Answers with a fixed result and counts calls.
    struct FixedCalculator {
        answer: Result<Money, RemoteError>,
        calls: AtomicUsize,
    }

    impl FixedCalculator {
        fn new(answer: Result<Money, RemoteError>) -> Arc<Self> {
            Arc::new(FixedCalculator {
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChangeCalculator for FixedCalculator {
        async fn calculate_change(&self, _: Money, _: Money) -> Result<Money, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn soap_cash(received: i64) -> PaymentRequest {
        PaymentRequest::cash(Money::from_cents(20_000), Money::from_cents(received))
    }

    #[tokio::test]
    async fn test_remote_success() {
        let calc = FixedCalculator::new(Ok(Money::from_cents(30_000)));
        let processor = PaymentProcessor::new(calc.clone());

        let resolution = processor.resolve_change(&soap_cash(50_000)).await;
        assert_eq!(
            resolution,
            ChangeResolution::RemoteSucceeded {
                change: Money::from_cents(30_000)
            }
        );
        assert!(!resolution.is_fallback());
        assert_eq!(calc.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_on_remote_error() {
        let calc = FixedCalculator::new(Err(RemoteError::Timeout));
        let processor = PaymentProcessor::new(calc);

        let resolution = processor.resolve_change(&soap_cash(50_000)).await;
        assert!(resolution.is_fallback());
        assert_eq!(resolution.change(), Money::from_cents(30_000));
        assert!(matches!(
            resolution,
            ChangeResolution::FallbackUsed {
                reason: FallbackReason::Unavailable(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_divergent_remote_uses_local() {
        let calc = FixedCalculator::new(Ok(Money::from_cents(29_999)));
        let processor = PaymentProcessor::new(calc);

        let resolution = processor.resolve_change(&soap_cash(50_000)).await;
        assert_eq!(
            resolution,
            ChangeResolution::FallbackUsed {
                change: Money::from_cents(30_000),
                reason: FallbackReason::Divergent {
                    remote: Money::from_cents(29_999)
                },
            }
        );
    }

    #[tokio::test]
    async fn test_unconfigured_reports_not_configured() {
        let processor = PaymentProcessor::new(Arc::new(UnconfiguredChangeCalculator));
        let resolution = processor.resolve_change(&soap_cash(20_000)).await;
        assert_eq!(
            resolution,
            ChangeResolution::FallbackUsed {
                change: Money::zero(),
                reason: FallbackReason::NotConfigured,
            }
        );
    }

    #[tokio::test]
    async fn test_change_identical_on_every_path() {
        for answer in [
            Ok(Money::from_cents(30_000)),
            Ok(Money::from_cents(-5)),
            Err(RemoteError::Status(500)),
            Err(RemoteError::Malformed("x".into())),
        ] {
            let processor = PaymentProcessor::new(FixedCalculator::new(answer));
            let (outcome, _) = processor.process(&soap_cash(50_000)).await.unwrap();
            assert_eq!(outcome.change(), Some(Money::from_cents(30_000)));
            assert_eq!(outcome.amount_received(), Some(Money::from_cents(50_000)));
        }
    }

    #[tokio::test]
    async fn test_insufficient_cash_never_reaches_service() {
        let calc = FixedCalculator::new(Ok(Money::zero()));
        let processor = PaymentProcessor::new(calc.clone());

        let err = processor.process(&soap_cash(15_000)).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Validation(CoreError::InsufficientPayment { .. })
        ));
        assert_eq!(calc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_card_completes_without_change() {
        let calc = FixedCalculator::new(Ok(Money::zero()));
        let processor = PaymentProcessor::new(calc.clone());

        let (outcome, resolution) = processor
            .process(&PaymentRequest::card(Money::from_cents(20_000)))
            .await
            .unwrap();
        assert_eq!(outcome.method(), PaymentMethod::Card);
        assert_eq!(outcome.change(), None);
        assert!(resolution.is_none());
        assert_eq!(calc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_outcome_records_change_source() {
        let processor = PaymentProcessor::new(Arc::new(UnconfiguredChangeCalculator));
        let (outcome, _) = processor.process(&soap_cash(50_000)).await.unwrap();
        assert_eq!(outcome.change_source(), Some(ChangeSource::LocalFallback));
    }
}
