//! # Change Calculation Service
//!
//! Client side of the remote change service.
//!
//! ## Wire Contract
//! ```text
//! POST {base}/change
//! ────────────────────────────────────────────
//! request:  {"total": 20000, "amountReceived": 50000}   (cents)
//! response: {"change": 30000}                           (cents)
//!
//! Anything else (connect error, timeout, non-2xx, unparseable body)
//! is a RemoteError and the caller falls back to the local formula.
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use till_core::Money;

use crate::config::ServiceSettings;
use crate::error::RemoteError;

/// Source of authoritative change figures.
#[async_trait]
pub trait ChangeCalculator: Send + Sync {
    async fn calculate_change(
        &self,
        total: Money,
        amount_received: Money,
    ) -> Result<Money, RemoteError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeRequest {
    total: Money,
    amount_received: Money,
}

#[derive(Debug, Deserialize)]
struct ChangeResponse {
    change: Money,
}

// =============================================================================
// HTTP Calculator
// =============================================================================

/// reqwest-backed change service client.
pub struct HttpChangeCalculator {
    client: Client,
    endpoint: String,
}

impl HttpChangeCalculator {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| RemoteError::Http(e.to_string()))?;

        Ok(HttpChangeCalculator {
            client,
            endpoint: format!("{}/change", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_settings(base_url: &str, settings: &ServiceSettings) -> Result<Self, RemoteError> {
        Self::new(
            base_url,
            settings.request_timeout(),
            settings.connect_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChangeCalculator for HttpChangeCalculator {
    async fn calculate_change(
        &self,
        total: Money,
        amount_received: Money,
    ) -> Result<Money, RemoteError> {
        debug!(endpoint = %self.endpoint, total = total.cents(), "Requesting change");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChangeRequest {
                total,
                amount_received,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body: ChangeResponse = response.json().await?;
        Ok(body.change)
    }
}

// =============================================================================
// Unconfigured Calculator
// =============================================================================

/// Used when no change service URL is configured: every call falls back.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredChangeCalculator;

#[async_trait]
impl ChangeCalculator for UnconfiguredChangeCalculator {
    async fn calculate_change(&self, _: Money, _: Money) -> Result<Money, RemoteError> {
        Err(RemoteError::NotConfigured)
    }
}
