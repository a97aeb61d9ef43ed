//! # Cart Commands
//!
//! Cart edits are only accepted while the session is idle; each returns the
//! fresh snapshot so the display can re-render in one step.

use tracing::debug;

use till_checkout::SessionSnapshot;
use till_core::{CartItem, Money};

use crate::error::ApiError;
use crate::state::AppState;

/// Gets the current cart, totals and checkout phase.
pub async fn get_cart(state: &AppState) -> Result<SessionSnapshot, ApiError> {
    debug!("get_cart command");
    Ok(state.session.snapshot().await)
}

/// Adds an item to the cart. A missing quantity means one unit.
///
/// Adding an id already in the cart merges into that line.
pub async fn add_item(
    state: &AppState,
    item_id: String,
    name: String,
    unit_price: Money,
    quantity: Option<i64>,
) -> Result<SessionSnapshot, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(item_id = %item_id, quantity = quantity, "add_item command");

    let item = CartItem::new(item_id, name, unit_price, quantity)?;
    Ok(state.session.add_item(item).await?)
}

/// Sets the quantity of a line; zero removes it.
pub async fn update_quantity(
    state: &AppState,
    item_id: String,
    quantity: i64,
) -> Result<SessionSnapshot, ApiError> {
    debug!(item_id = %item_id, quantity = quantity, "update_quantity command");
    Ok(state.session.update_quantity(&item_id, quantity).await?)
}

pub async fn remove_item(state: &AppState, item_id: String) -> Result<SessionSnapshot, ApiError> {
    debug!(item_id = %item_id, "remove_item command");
    Ok(state.session.remove_item(&item_id).await?)
}

pub async fn clear_cart(state: &AppState) -> Result<SessionSnapshot, ApiError> {
    debug!("clear_cart command");
    Ok(state.session.clear_cart().await?)
}
