//! # Cart
//!
//! The ordered set of line items pending a single sale.
//!
//! ## Command Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Commands                                        │
//! │                                                                         │
//! │  Presentation Event        Command                  Result              │
//! │  ──────────────────        ───────                  ──────              │
//! │                                                                         │
//! │  Scan / click product ───► cart.add_item(item) ───► Ok(new cart)        │
//! │                                                     (merges same id)    │
//! │                                                                         │
//! │  Change quantity ────────► cart.update_quantity() ► Ok(new cart)        │
//! │                                                     (qty < 1 removes)   │
//! │                                                                         │
//! │  Click remove ───────────► cart.remove_item(id) ──► Ok(new cart)        │
//! │                                                                         │
//! │  Sale completed ─────────► cart.clear() ──────────► empty cart          │
//! │                                                                         │
//! │  Every command borrows `&self` and returns a new Cart. On error the     │
//! │  caller still holds the untouched original.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Line ids are unique (adding an existing id merges quantities)
//! - Every stored quantity is in `1..=MAX_ITEM_QUANTITY`
//! - At most `MAX_CART_ITEMS` distinct lines
//! - Insertion order is preserved for display

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{
    validate_cart_size, validate_item_id, validate_item_name, validate_quantity,
    validate_unit_price,
};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart.
///
/// The unit price is frozen when the line is created; later catalogue price
/// changes do not reach an open cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    id: String,
    name: String,
    unit_price: Money,
    quantity: i64,
}

impl CartItem {
    /// Creates a validated line.
    ///
    /// ```rust
    /// use till_core::cart::CartItem;
    /// use till_core::money::Money;
    ///
    /// let soap = CartItem::new("1", "Soap", Money::from_cents(10_000), 2).unwrap();
    /// assert_eq!(soap.line_total().cents(), 20_000);
    /// assert!(CartItem::new("2", "Gum", Money::from_cents(50), 0).is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> CoreResult<Self> {
        let id = id.into().trim().to_string();
        let name = name.into().trim().to_string();

        validate_item_id(&id)?;
        validate_item_name(&name)?;
        validate_unit_price(unit_price)?;
        validate_quantity(quantity)?;

        Ok(CartItem {
            id,
            name,
            unit_price,
            quantity,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// unit price × quantity
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    fn with_quantity(&self, quantity: i64) -> Self {
        CartItem {
            quantity,
            ..self.clone()
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The cart aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Adds a line, or merges its quantity into an existing line with the
    /// same id (keeping the existing line's name and price).
    ///
    /// ## Errors
    /// - `QuantityTooLarge` if the merged quantity exceeds 999
    /// - `CartTooLarge` if a new line would exceed 100 distinct lines
    pub fn add_item(&self, item: CartItem) -> CoreResult<Cart> {
        if let Some(pos) = self.position(item.id()) {
            let merged = self.items[pos].quantity + item.quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }

            let mut items = self.items.clone();
            items[pos] = items[pos].with_quantity(merged);
            return Ok(Cart { items });
        }

        validate_cart_size(self.items.len()).map_err(|_| CoreError::CartTooLarge {
            max: crate::MAX_CART_ITEMS,
        })?;

        let mut items = self.items.clone();
        items.push(item);
        Ok(Cart { items })
    }

    /// Sets a line's quantity. Anything below 1 removes the line.
    pub fn update_quantity(&self, id: &str, quantity: i64) -> CoreResult<Cart> {
        if quantity < 1 {
            return self.remove_item(id);
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let pos = self
            .position(id)
            .ok_or_else(|| CoreError::ItemNotInCart(id.to_string()))?;

        let mut items = self.items.clone();
        items[pos] = items[pos].with_quantity(quantity);
        Ok(Cart { items })
    }

    /// Removes a line by id.
    pub fn remove_item(&self, id: &str) -> CoreResult<Cart> {
        let pos = self
            .position(id)
            .ok_or_else(|| CoreError::ItemNotInCart(id.to_string()))?;

        let mut items = self.items.clone();
        items.remove(pos);
        Ok(Cart { items })
    }

    /// Returns an empty cart.
    pub fn clear(&self) -> Cart {
        Cart::new()
    }

    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Lines in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of all line quantities.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        let id = id.trim();
        self.items.iter().position(|i| i.id == id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::MAX_CART_ITEMS;

    fn item(id: &str, price_cents: i64, qty: i64) -> CartItem {
        CartItem::new(id, format!("Product {}", id), Money::from_cents(price_cents), qty).unwrap()
    }

    #[test]
    fn test_add_item() {
        let cart = Cart::new().add_item(item("1", 10_000, 2)).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.get("1").unwrap().line_total().cents(), 20_000);
    }

    #[test]
    fn test_add_same_id_merges_quantity() {
        let cart = Cart::new()
            .add_item(item("1", 999, 2))
            .unwrap()
            .add_item(item("1", 999, 3))
            .unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_commands_leave_original_untouched() {
        let original = Cart::new().add_item(item("1", 100, 1)).unwrap();
        let updated = original.update_quantity("1", 7).unwrap();

        assert_eq!(original.get("1").unwrap().quantity(), 1);
        assert_eq!(updated.get("1").unwrap().quantity(), 7);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let cart = Cart::new()
            .add_item(item("b", 1, 1))
            .unwrap()
            .add_item(item("a", 1, 1))
            .unwrap()
            .add_item(item("b", 1, 1))
            .unwrap();

        let ids: Vec<&str> = cart.items().iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_update_to_zero_or_below_removes() {
        let cart = Cart::new()
            .add_item(item("1", 100, 3))
            .unwrap()
            .add_item(item("2", 100, 1))
            .unwrap();

        for qty in [0, -1, -50] {
            let updated = cart.update_quantity("1", qty).unwrap();
            assert!(updated.get("1").is_none());
            assert_eq!(updated.item_count(), 1);
            assert!(updated.items().iter().all(|i| i.quantity() >= 1));
        }
    }

    #[test]
    fn test_update_unknown_item_fails() {
        let cart = Cart::new();
        assert_eq!(
            cart.update_quantity("missing", 2),
            Err(CoreError::ItemNotInCart("missing".into()))
        );
        assert!(cart.remove_item("missing").is_err());
    }

    #[test]
    fn test_quantity_limits() {
        let cart = Cart::new().add_item(item("1", 100, 998)).unwrap();

        assert!(matches!(
            cart.add_item(item("1", 100, 2)),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));
        assert!(cart.update_quantity("1", 1000).is_err());
        assert!(cart.update_quantity("1", 999).is_ok());
    }

    #[test]
    fn test_oversized_unit_price_rejected() {
        let result = CartItem::new("1", "Gold", Money::from_cents(i64::MAX / 2), 3);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let cart = Cart::new()
            .add_item(item("1", crate::MAX_UNIT_PRICE_CENTS, MAX_ITEM_QUANTITY))
            .unwrap();
        assert_eq!(
            cart.get("1").unwrap().line_total().cents(),
            crate::MAX_UNIT_PRICE_CENTS * MAX_ITEM_QUANTITY
        );
    }

    #[test]
    fn test_cart_size_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_ITEMS {
            cart = cart.add_item(item(&i.to_string(), 1, 1)).unwrap();
        }

        assert_eq!(
            cart.add_item(item("overflow", 1, 1)),
            Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS })
        );
        // merging into an existing line is still allowed
        assert!(cart.add_item(item("0", 1, 1)).is_ok());
    }

    #[test]
    fn test_remove_and_clear() {
        let cart = Cart::new()
            .add_item(item("1", 100, 1))
            .unwrap()
            .add_item(item("2", 100, 1))
            .unwrap();

        let removed = cart.remove_item("1").unwrap();
        assert_eq!(removed.item_count(), 1);

        let cleared = cart.clear();
        assert!(cleared.is_empty());
        assert_eq!(cleared.item_count(), 0);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_invalid_items_rejected() {
        assert!(CartItem::new("", "Soap", Money::from_cents(1), 1).is_err());
        assert!(CartItem::new("1", "", Money::from_cents(1), 1).is_err());
        assert!(CartItem::new("1", "Soap", Money::from_cents(-1), 1).is_err());
        assert!(CartItem::new("1", "Soap", Money::from_cents(1), 0).is_err());
    }
}
