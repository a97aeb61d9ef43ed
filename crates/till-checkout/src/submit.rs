//! # Sale Submission
//!
//! Hands an assembled draft to the backend and returns the issued sale.
//!
//! ```text
//! POST {base}/sales   body: SaleDraft (camelCase JSON)
//!   2xx  → Sale (draft fields + server-assigned "id")
//!   else → SubmitError::Rejected
//! ```
//!
//! No retries happen here. A failure goes back to the cashier, who
//! retries by completing the payment again.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use till_core::{Sale, SaleDraft};

use crate::config::ServiceSettings;
use crate::error::SubmitError;

#[async_trait]
pub trait SaleSubmitter: Send + Sync {
    async fn submit(&self, draft: &SaleDraft) -> Result<Sale, SubmitError>;
}

// =============================================================================
// HTTP Submitter
// =============================================================================

pub struct HttpSaleSubmitter {
    client: Client,
    endpoint: String,
}

impl HttpSaleSubmitter {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, SubmitError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| SubmitError::Http(e.to_string()))?;

        Ok(HttpSaleSubmitter {
            client,
            endpoint: format!("{}/sales", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_settings(base_url: &str, settings: &ServiceSettings) -> Result<Self, SubmitError> {
        Self::new(
            base_url,
            settings.request_timeout(),
            settings.connect_timeout(),
        )
    }
}

#[async_trait]
impl SaleSubmitter for HttpSaleSubmitter {
    async fn submit(&self, draft: &SaleDraft) -> Result<Sale, SubmitError> {
        debug!(
            endpoint = %self.endpoint,
            reference = %draft.reference(),
            "Submitting sale"
        );

        let response = self.client.post(&self.endpoint).json(draft).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let sale: Sale = response.json().await?;
        if sale.id().trim().is_empty() {
            return Err(SubmitError::MissingId);
        }

        info!(sale_id = %sale.id(), reference = %draft.reference(), "Sale accepted by backend");
        Ok(sale)
    }
}

// =============================================================================
// Local Submitter
// =============================================================================

/// Offline mode: issues the sale with a locally generated id.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSaleSubmitter;

#[async_trait]
impl SaleSubmitter for LocalSaleSubmitter {
    async fn submit(&self, draft: &SaleDraft) -> Result<Sale, SubmitError> {
        let id = Uuid::new_v4().to_string();
        debug!(sale_id = %id, reference = %draft.reference(), "Sale issued locally");
        Ok(draft.clone().finalize(id))
    }
}
