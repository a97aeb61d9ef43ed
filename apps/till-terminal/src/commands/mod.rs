//! # Terminal Commands
//!
//! Handlers invoked for each decoded request line.
//!
//! ## Command Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Terminal Commands                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Cart Commands (cart.rs)         Checkout Commands (checkout.rs)        │
//! │  ├── get_cart                    ├── begin_checkout                     │
//! │  ├── add_item                    ├── submit_customer / skip_customer    │
//! │  ├── update_quantity             ├── select_method                      │
//! │  ├── remove_item                 ├── enter_cash                         │
//! │  └── clear_cart                  ├── complete_payment                   │
//! │                                  ├── cancel / start_next                │
//! │                                  └── get_receipt                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every handler returns `Result<T, ApiError>` with a serializable `T`.

pub mod cart;
pub mod checkout;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::protocol::Command;
use crate::state::AppState;

/// Runs one command against the shared state.
pub async fn dispatch(state: &AppState, command: Command) -> Result<Value, ApiError> {
    match command {
        Command::GetCart => to_value(cart::get_cart(state).await),
        Command::AddItem {
            item_id,
            name,
            unit_price,
            quantity,
        } => to_value(cart::add_item(state, item_id, name, unit_price, quantity).await),
        Command::UpdateQuantity { item_id, quantity } => {
            to_value(cart::update_quantity(state, item_id, quantity).await)
        }
        Command::RemoveItem { item_id } => to_value(cart::remove_item(state, item_id).await),
        Command::ClearCart => to_value(cart::clear_cart(state).await),
        Command::BeginCheckout => to_value(checkout::begin_checkout(state).await),
        Command::SubmitCustomer { name, phone } => {
            to_value(checkout::submit_customer(state, name, phone).await)
        }
        Command::SkipCustomer => to_value(checkout::skip_customer(state).await),
        Command::SelectMethod { method } => to_value(checkout::select_method(state, method).await),
        Command::EnterCash { amount_received } => {
            to_value(checkout::enter_cash(state, amount_received).await)
        }
        Command::CompletePayment => to_value(checkout::complete_payment(state).await),
        Command::Cancel => to_value(checkout::cancel(state).await),
        Command::StartNext => to_value(checkout::start_next(state).await),
        Command::GetReceipt => to_value(checkout::get_receipt(state).await),
    }
}

fn to_value<T: Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
    let data = result?;
    serde_json::to_value(data).map_err(|e| ApiError::internal(e.to_string()))
}
