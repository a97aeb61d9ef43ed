//! # Pricing Engine
//!
//! Derives subtotal, tax, discount and total from a cart snapshot.
//!
//! ```text
//! subtotal = Σ (unit price × quantity)
//! tax      = policy.tax_rate applied to subtotal
//! discount = policy.discount_bps applied to subtotal
//! total    = subtotal + tax − discount
//! ```
//!
//! The shipped policy is [`PricingPolicy::zero`]: tax and discount are
//! always zero. Other policies go through the same formula.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::money::Money;
use crate::types::TaxRate;

/// Tax and discount policy applied on top of the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tax_rate: TaxRate,
    /// Whole-basket discount in basis points (1000 = 10%).
    pub discount_bps: u32,
}

impl PricingPolicy {
    /// No tax, no discount.
    pub const fn zero() -> Self {
        PricingPolicy {
            tax_rate: TaxRate::zero(),
            discount_bps: 0,
        }
    }

    pub const fn new(tax_rate: TaxRate, discount_bps: u32) -> Self {
        PricingPolicy {
            tax_rate,
            discount_bps,
        }
    }
}

/// Totals for a cart, recomputed after every cart command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

/// Stateless calculator bound to a policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    policy: PricingPolicy,
}

impl PricingEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        PricingEngine { policy }
    }

    /// Σ (unit price × quantity)
    pub fn compute_subtotal(&self, cart: &Cart) -> Money {
        cart.items().iter().map(|i| i.line_total()).sum()
    }

    pub fn compute_tax(&self, subtotal: Money) -> Money {
        subtotal.calculate_tax(self.policy.tax_rate)
    }

    pub fn compute_discount(&self, subtotal: Money) -> Money {
        subtotal.percentage(self.policy.discount_bps)
    }

    /// subtotal + tax − discount
    pub fn compute_total(&self, subtotal: Money, tax: Money, discount: Money) -> Money {
        subtotal + tax - discount
    }

    /// All figures for a cart in one pass.
    ///
    /// ```rust
    /// use till_core::cart::{Cart, CartItem};
    /// use till_core::money::Money;
    /// use till_core::pricing::PricingEngine;
    ///
    /// let cart = Cart::new()
    ///     .add_item(CartItem::new("1", "Soap", Money::from_cents(10_000), 2).unwrap())
    ///     .unwrap();
    /// let totals = PricingEngine::default().totals(&cart);
    /// assert_eq!(totals.subtotal.cents(), 20_000);
    /// assert_eq!(totals.total.cents(), 20_000);
    /// ```
    pub fn totals(&self, cart: &Cart) -> CartTotals {
        let subtotal = self.compute_subtotal(cart);
        let tax = self.compute_tax(subtotal);
        let discount = self.compute_discount(subtotal);

        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal,
            tax,
            discount,
            total: self.compute_total(subtotal, tax, discount),
        }
    }
}
