//! # Sale Assembler
//!
//! Freezes the cart, totals, payment outcome and customer into a
//! [`SaleDraft`]. The cart is read, never modified; clearing it is the
//! session's job once submission succeeds.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use till_core::{Cart, CoreError, CoreResult, Customer, PaymentOutcome, PricingEngine, SaleDraft};

#[derive(Debug, Default, Clone, Copy)]
pub struct SaleAssembler;

impl SaleAssembler {
    pub fn new() -> Self {
        SaleAssembler
    }

    /// Builds a draft stamped with the current time.
    pub fn assemble(
        &self,
        cart: &Cart,
        pricing: &PricingEngine,
        payment: PaymentOutcome,
        customer: Option<Customer>,
    ) -> CoreResult<SaleDraft> {
        self.assemble_at(cart, pricing, payment, customer, Utc::now())
    }

    /// Builds a draft stamped with `now`.
    ///
    /// ## Errors
    /// - `EmptyCart` if the cart has no lines
    /// - `InsufficientPayment` / `MissingAmountReceived` if a cash outcome
    ///   does not cover the recomputed total
    pub fn assemble_at(
        &self,
        cart: &Cart,
        pricing: &PricingEngine,
        payment: PaymentOutcome,
        customer: Option<Customer>,
        now: DateTime<Utc>,
    ) -> CoreResult<SaleDraft> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let totals = pricing.totals(cart);
        payment.covers(totals.total)?;

        let reference = Uuid::new_v4();
        let receipt_number = receipt_number(now, &reference);

        debug!(
            reference = %reference,
            receipt_number = %receipt_number,
            items = totals.item_count,
            total = totals.total.cents(),
            "Sale assembled"
        );

        Ok(SaleDraft::new(
            reference.to_string(),
            receipt_number,
            now,
            customer,
            cart.items().to_vec(),
            &totals,
            payment,
        ))
    }
}

/// `YYMMDD-HHMMSS-NNNN`, the suffix taken from the draft reference.
fn receipt_number(now: DateTime<Utc>, reference: &Uuid) -> String {
    let bytes = reference.as_bytes();
    let suffix = u16::from_be_bytes([bytes[0], bytes[1]]) % 10_000;
    format!("{}-{:04}", now.format("%y%m%d-%H%M%S"), suffix)
}
