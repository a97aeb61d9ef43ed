//! # till-checkout: Checkout Orchestration for Till POS
//!
//! Async half of the checkout: the session state machine and the clients
//! for the change and sale services.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  cart commands ──► CheckoutSession ──► PricingEngine (totals)          │
//! │                          │                                              │
//! │        enter_cash        ▼                                              │
//! │                    PaymentProcessor ──► ChangeCalculator               │
//! │                          │              (HTTP or unconfigured)          │
//! │     complete_payment     ▼                                              │
//! │                    SaleAssembler ──► SaleSubmitter ──► Sale            │
//! │                                      (HTTP or local)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] - Checkout state machine, single-flight, cancellation
//! - [`payment`] - Change resolution with local fallback
//! - [`change`] - Change service client
//! - [`assembler`] - Sale draft assembly
//! - [`submit`] - Sale service client
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Error types

pub mod assembler;
pub mod change;
pub mod config;
pub mod error;
pub mod payment;
pub mod session;
pub mod submit;

pub use assembler::SaleAssembler;
pub use change::{ChangeCalculator, HttpChangeCalculator, UnconfiguredChangeCalculator};
pub use config::CheckoutConfig;
pub use error::{CheckoutError, CheckoutResult, ConfigError, RemoteError, SubmitError};
pub use payment::{ChangeResolution, FallbackReason, PaymentProcessor};
pub use session::{CheckoutPhase, CheckoutSession, SessionSnapshot};
pub use submit::{HttpSaleSubmitter, LocalSaleSubmitter, SaleSubmitter};

use std::sync::Arc;
use tracing::info;

use till_core::PricingEngine;

/// Builds a session wired to the services named in `config`.
///
/// A missing change URL selects [`UnconfiguredChangeCalculator`]; a missing
/// sales URL selects [`LocalSaleSubmitter`].
pub fn session_from_config(config: &CheckoutConfig) -> Result<CheckoutSession, ConfigError> {
    let calculator: Arc<dyn ChangeCalculator> = match config.change_url() {
        Some(url) => Arc::new(
            HttpChangeCalculator::from_settings(url, &config.services)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
        ),
        None => Arc::new(UnconfiguredChangeCalculator),
    };

    let submitter: Arc<dyn SaleSubmitter> = match config.sales_url() {
        Some(url) => Arc::new(
            HttpSaleSubmitter::from_settings(url, &config.services)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
        ),
        None => Arc::new(LocalSaleSubmitter),
    };

    info!(
        change_service = config.change_url().unwrap_or("local"),
        sales_service = config.sales_url().unwrap_or("local"),
        "Checkout session configured"
    );

    Ok(CheckoutSession::new(
        PricingEngine::default(),
        PaymentProcessor::new(calculator),
        submitter,
    ))
}
