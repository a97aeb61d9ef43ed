//! # till-core: Pure Checkout Logic for Till POS
//!
//! Everything a single sale needs that can be decided without I/O: the cart,
//! pricing, payment rules, the issued sale record and its receipt view.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Till POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation (till-terminal)                    │   │
//! │  │   add_item ──► begin_checkout ──► enter_cash ──► get_receipt   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON lines                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  till-checkout (async)                          │   │
//! │  │   CheckoutSession, PaymentProcessor, SaleSubmitter, config     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  cart   │ │ pricing │ │  types  │ │ receipt │ │  money  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO CLOCK READS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`cart`] - Cart aggregate and line items
//! - [`pricing`] - Subtotal, tax, discount, total
//! - [`types`] - Payment, customer and sale types
//! - [`receipt`] - Receipt view and plain-text rendering
//! - [`money`] - Integer-cent money
//! - [`error`] - Domain error types
//! - [`validation`] - Input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{Cart, CartItem, Money, PaymentRequest, PricingEngine};
//!
//! let cart = Cart::new()
//!     .add_item(CartItem::new("1", "Soap", Money::from_cents(10_000), 2).unwrap())
//!     .unwrap();
//! let totals = PricingEngine::default().totals(&cart);
//!
//! let request = PaymentRequest::cash(totals.total, Money::from_cents(50_000));
//! assert!(request.validate().is_ok());
//! assert_eq!(request.local_change(), Some(Money::from_cents(30_000)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod pricing;
pub mod receipt;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{CartTotals, PricingEngine, PricingPolicy};
pub use receipt::{Receipt, ReceiptFormatter, ReceiptLine, StoreProfile};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// Catches keypad slips such as 1000 typed for 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest accepted unit price, in cents (1,000,000.00).
///
/// With the line and quantity caps this bounds any subtotal near 10^13
/// cents, well inside `i64`.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;
