//! # Checkout Commands
//!
//! Drive the session through customer capture, payment and completion.
//!
//! ## Flow
//! ```text
//! begin_checkout → submit_customer | skip_customer → select_method
//!     cash: enter_cash → complete_payment
//!     card: complete_payment
//! → get_receipt → start_next
//! ```

use serde::Serialize;
use tracing::{debug, info};

use till_checkout::SessionSnapshot;
use till_core::{Money, PaymentMethod, Receipt, Sale};

use crate::error::ApiError;
use crate::state::AppState;

/// A completed sale together with its printable receipt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub sale: Sale,
    pub receipt: Receipt,
    pub receipt_text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub receipt: Receipt,
    pub text: String,
}

pub async fn begin_checkout(state: &AppState) -> Result<SessionSnapshot, ApiError> {
    debug!("begin_checkout command");
    Ok(state.session.begin_checkout().await?)
}

/// Records optional customer details. Blank values are ignored.
pub async fn submit_customer(
    state: &AppState,
    name: Option<String>,
    phone: Option<String>,
) -> Result<SessionSnapshot, ApiError> {
    debug!(has_name = name.is_some(), has_phone = phone.is_some(), "submit_customer command");
    Ok(state.session.submit_customer(name, phone).await?)
}

pub async fn skip_customer(state: &AppState) -> Result<SessionSnapshot, ApiError> {
    debug!("skip_customer command");
    Ok(state.session.skip_customer().await?)
}

/// Accepts "cash" or "card" (also "credit"/"debit").
pub async fn select_method(state: &AppState, method: String) -> Result<SessionSnapshot, ApiError> {
    debug!(method = %method, "select_method command");
    let method: PaymentMethod = method.parse()?;
    Ok(state.session.select_method(method).await?)
}

/// Tenders cash and computes change.
pub async fn enter_cash(state: &AppState, amount_received: Money) -> Result<SessionSnapshot, ApiError> {
    debug!(amount_received = amount_received.cents(), "enter_cash command");
    Ok(state.session.enter_cash(amount_received).await?)
}

/// Submits the sale and returns it with its receipt.
pub async fn complete_payment(state: &AppState) -> Result<SaleResponse, ApiError> {
    debug!("complete_payment command");
    let sale = state.session.complete_payment().await?;

    let receipt = state.formatter.format(&sale);
    let receipt_text = receipt.render_text(state.paper_width);

    info!(sale_id = %sale.id(), "Sale ready for receipt");
    Ok(SaleResponse {
        sale,
        receipt,
        receipt_text,
    })
}

pub async fn cancel(state: &AppState) -> Result<SessionSnapshot, ApiError> {
    debug!("cancel command");
    Ok(state.session.cancel().await?)
}

pub async fn start_next(state: &AppState) -> Result<SessionSnapshot, ApiError> {
    debug!("start_next command");
    Ok(state.session.start_next().await?)
}

/// Reprints the most recent sale.
pub async fn get_receipt(state: &AppState) -> Result<ReceiptResponse, ApiError> {
    debug!("get_receipt command");
    let sale = state
        .session
        .last_sale()
        .await
        .ok_or_else(|| ApiError::not_found("No completed sale to print"))?;

    let receipt = state.formatter.format(&sale);
    let text = receipt.render_text(state.paper_width);
    Ok(ReceiptResponse { receipt, text })
}
