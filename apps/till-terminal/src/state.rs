//! # Application State
//!
//! Everything a command needs, shared across command tasks behind an `Arc`.

use till_checkout::{session_from_config, CheckoutConfig, CheckoutSession, ConfigError};
use till_core::ReceiptFormatter;

pub struct AppState {
    pub session: CheckoutSession,
    pub formatter: ReceiptFormatter,
    pub paper_width: usize,
}

impl AppState {
    pub fn new(session: CheckoutSession, formatter: ReceiptFormatter, paper_width: usize) -> Self {
        AppState {
            session,
            formatter,
            paper_width,
        }
    }

    pub fn from_config(config: &CheckoutConfig) -> Result<Self, ConfigError> {
        Ok(AppState::new(
            session_from_config(config)?,
            ReceiptFormatter::new(config.store_profile()),
            config.paper_width(),
        ))
    }
}
