//! # Checkout Session
//!
//! The single writer for one terminal: owns the cart and drives a sale
//! through the checkout states.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────┐ begin_checkout ┌────────────────────┐ submit_customer        │
//! │   │ Idle │───────────────►│ CustomerInfoPrompt │ skip_customer ──┐      │
//! │   └──────┘                └────────────────────┘                 │      │
//! │      ▲                                                           ▼      │
//! │      │ start_next                                ┌──────────────────┐   │
//! │      │                                           │ PaymentSelection │   │
//! │ ┌─────────┐                                      └────────┬─────────┘   │
//! │ │Completed│                         select_method(cash)   │  (card)     │
//! │ └─────────┘                              ┌────────────────┴───┐         │
//! │      ▲                                   ▼                    ▼         │
//! │      │                            ┌───────────┐        ┌───────────┐    │
//! │      │                            │ CashEntry │        │ CardReady │    │
//! │      │                            └─────┬─────┘        └─────┬─────┘    │
//! │      │                       enter_cash │                    │          │
//! │      │                                  ▼                    │          │
//! │      │                          ┌────────────────┐           │          │
//! │      └──── complete_payment ────│ ChangeComputed │◄──────────┘          │
//! │                                 └────────────────┘  complete_payment    │
//! │                                                                         │
//! │   cancel: any state except Idle/Completed ──► Idle (cart untouched)    │
//! │   cart edits: Idle only                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Suspension Points
//! `enter_cash` (change service) and `complete_payment` (sale service) are
//! the only awaits on remote work. Around each one:
//!
//! 1. Under the state lock: check the phase, set `in_flight`, read the
//!    cancellation epoch.
//! 2. Release the lock, race the remote call against the cancel signal.
//! 3. Re-take the lock. If the epoch moved, drop the result untouched.
//!
//! While `in_flight` is set, `select_method`, `enter_cash` and
//! `complete_payment` fail with `PaymentInFlight`.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use till_core::{
    Cart, CartItem, CartTotals, CoreError, Customer, Money, PaymentMethod, PaymentOutcome,
    PaymentRequest, PricingEngine, Sale, SaleDraft,
};

use crate::assembler::SaleAssembler;
use crate::error::{CheckoutError, CheckoutResult};
use crate::payment::PaymentProcessor;
use crate::submit::SaleSubmitter;

// =============================================================================
// Checkout Phase
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    #[default]
    Idle,
    CustomerInfoPrompt,
    PaymentSelection,
    CashEntry,
    CardReady,
    ChangeComputed,
    Completed,
}

impl CheckoutPhase {
    /// Phases in which a payment method may be (re)selected.
    fn accepts_method(&self) -> bool {
        matches!(
            self,
            CheckoutPhase::PaymentSelection
                | CheckoutPhase::CashEntry
                | CheckoutPhase::CardReady
                | CheckoutPhase::ChangeComputed
        )
    }
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutPhase::Idle => "idle",
            CheckoutPhase::CustomerInfoPrompt => "collecting customer info",
            CheckoutPhase::PaymentSelection => "selecting payment",
            CheckoutPhase::CashEntry => "entering cash",
            CheckoutPhase::CardReady => "card ready",
            CheckoutPhase::ChangeComputed => "change computed",
            CheckoutPhase::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Read-only view of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: CheckoutPhase,
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_received: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Money>,
    pub in_flight: bool,
}

// =============================================================================
// Session State
// =============================================================================

#[derive(Debug, Default)]
struct SessionState {
    phase: CheckoutPhase,
    cart: Cart,
    customer: Option<Customer>,
    method: Option<PaymentMethod>,
    payment: Option<PaymentOutcome>,
    in_flight: bool,
    /// Draft whose submission failed; resubmitted as-is on retry so the
    /// sales service sees the same reference.
    unsent_draft: Option<SaleDraft>,
    last_sale: Option<Sale>,
}

impl SessionState {
    fn reset_checkout(&mut self) {
        self.customer = None;
        self.method = None;
        self.payment = None;
        self.in_flight = false;
        self.unsent_draft = None;
    }
}

// =============================================================================
// Checkout Session
// =============================================================================

/// Orchestrates cart edits and the checkout flow for one terminal.
pub struct CheckoutSession {
    state: Mutex<SessionState>,
    pricing: PricingEngine,
    processor: PaymentProcessor,
    assembler: SaleAssembler,
    submitter: Arc<dyn SaleSubmitter>,
    /// Cancellation epoch; bumped by every `cancel`.
    cancel_tx: watch::Sender<u64>,
}

impl CheckoutSession {
    pub fn new(
        pricing: PricingEngine,
        processor: PaymentProcessor,
        submitter: Arc<dyn SaleSubmitter>,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(0);
        CheckoutSession {
            state: Mutex::new(SessionState::default()),
            pricing,
            processor,
            assembler: SaleAssembler::new(),
            submitter,
            cancel_tx,
        }
    }

    /// Session with the zero pricing policy.
    pub fn with_defaults(processor: PaymentProcessor, submitter: Arc<dyn SaleSubmitter>) -> Self {
        Self::new(PricingEngine::default(), processor, submitter)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        self.snapshot_of(&state)
    }

    pub async fn phase(&self) -> CheckoutPhase {
        self.state.lock().await.phase
    }

    /// The most recently issued sale, kept for receipt reprints.
    pub async fn last_sale(&self) -> Option<Sale> {
        self.state.lock().await.last_sale.clone()
    }

    fn snapshot_of(&self, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            phase: state.phase,
            items: state.cart.items().to_vec(),
            totals: self.pricing.totals(&state.cart),
            customer: state.customer.clone(),
            method: state.method,
            amount_received: state.payment.as_ref().and_then(|p| p.amount_received()),
            change: state.payment.as_ref().and_then(|p| p.change()),
            in_flight: state.in_flight,
        }
    }

    // =========================================================================
    // Cart Commands (Idle only)
    // =========================================================================

    pub async fn add_item(&self, item: CartItem) -> CheckoutResult<SessionSnapshot> {
        debug!(item_id = %item.id(), quantity = item.quantity(), "Adding item to cart");
        self.edit_cart(|cart| cart.add_item(item)).await
    }

    pub async fn update_quantity(&self, id: &str, quantity: i64) -> CheckoutResult<SessionSnapshot> {
        debug!(item_id = %id, quantity, "Updating cart quantity");
        self.edit_cart(|cart| cart.update_quantity(id, quantity)).await
    }

    pub async fn remove_item(&self, id: &str) -> CheckoutResult<SessionSnapshot> {
        debug!(item_id = %id, "Removing item from cart");
        self.edit_cart(|cart| cart.remove_item(id)).await
    }

    pub async fn clear_cart(&self) -> CheckoutResult<SessionSnapshot> {
        debug!("Clearing cart");
        self.edit_cart(|cart| Ok(cart.clear())).await
    }

    async fn edit_cart<F>(&self, command: F) -> CheckoutResult<SessionSnapshot>
    where
        F: FnOnce(&Cart) -> Result<Cart, CoreError>,
    {
        let mut state = self.state.lock().await;
        if state.phase != CheckoutPhase::Idle {
            return Err(CheckoutError::CartLocked { phase: state.phase });
        }

        state.cart = command(&state.cart)?;
        Ok(self.snapshot_of(&state))
    }

    // =========================================================================
    // Checkout Transitions
    // =========================================================================

    /// Idle → CustomerInfoPrompt. The cart must not be empty.
    pub async fn begin_checkout(&self) -> CheckoutResult<SessionSnapshot> {
        let mut state = self.state.lock().await;
        expect_phase(&state, &[CheckoutPhase::Idle], "begin checkout")?;
        if state.cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        state.reset_checkout();
        state.phase = CheckoutPhase::CustomerInfoPrompt;
        debug!(items = state.cart.item_count(), "Checkout started");
        Ok(self.snapshot_of(&state))
    }

    /// CustomerInfoPrompt → PaymentSelection with the given details.
    ///
    /// Blank values are dropped; invalid values leave the prompt open.
    pub async fn submit_customer(
        &self,
        name: Option<String>,
        phone: Option<String>,
    ) -> CheckoutResult<SessionSnapshot> {
        let mut state = self.state.lock().await;
        expect_phase(&state, &[CheckoutPhase::CustomerInfoPrompt], "submit customer")?;

        let customer = Customer::new(name, phone)?;
        state.customer = Some(customer).filter(|c| !c.is_empty());
        state.phase = CheckoutPhase::PaymentSelection;
        Ok(self.snapshot_of(&state))
    }

    /// CustomerInfoPrompt → PaymentSelection without customer details.
    pub async fn skip_customer(&self) -> CheckoutResult<SessionSnapshot> {
        let mut state = self.state.lock().await;
        expect_phase(&state, &[CheckoutPhase::CustomerInfoPrompt], "skip customer")?;

        state.customer = None;
        state.phase = CheckoutPhase::PaymentSelection;
        Ok(self.snapshot_of(&state))
    }

    /// Chooses cash (→ CashEntry) or card (→ CardReady).
    ///
    /// Re-selecting discards any change computed for the previous choice.
    pub async fn select_method(&self, method: PaymentMethod) -> CheckoutResult<SessionSnapshot> {
        let mut state = self.state.lock().await;
        if state.in_flight {
            return Err(CheckoutError::PaymentInFlight);
        }
        if !state.phase.accepts_method() {
            return Err(CheckoutError::invalid_transition(state.phase, "select a payment method"));
        }

        state.method = Some(method);
        state.payment = None;
        state.unsent_draft = None;
        state.phase = match method {
            PaymentMethod::Cash => CheckoutPhase::CashEntry,
            PaymentMethod::Card => CheckoutPhase::CardReady,
        };
        debug!(method = %method, "Payment method selected");
        Ok(self.snapshot_of(&state))
    }

    /// CashEntry/ChangeComputed → ChangeComputed.
    ///
    /// Insufficient or missing cash is rejected before any remote call and
    /// leaves the session as it was.
    pub async fn enter_cash(&self, amount_received: Money) -> CheckoutResult<SessionSnapshot> {
        let (request, epoch) = {
            let mut state = self.state.lock().await;
            if state.in_flight {
                return Err(CheckoutError::PaymentInFlight);
            }
            expect_phase(
                &state,
                &[CheckoutPhase::CashEntry, CheckoutPhase::ChangeComputed],
                "enter cash",
            )?;

            let total = self.pricing.totals(&state.cart).total;
            let request = PaymentRequest::cash(total, amount_received);
            request.validate()?;

            (request, self.begin_flight(&mut state))
        };

        let result = self
            .race_cancel(epoch, self.processor.process(&request))
            .await;

        let mut state = self.settle_flight(epoch).await?;
        let (outcome, resolution) = result?;

        debug!(
            change = ?outcome.change(),
            fallback = resolution.as_ref().map(|r| r.is_fallback()).unwrap_or(false),
            "Change computed"
        );
        state.payment = Some(outcome);
        state.unsent_draft = None;
        state.phase = CheckoutPhase::ChangeComputed;
        Ok(self.snapshot_of(&state))
    }

    /// ChangeComputed/CardReady → Completed.
    ///
    /// Assembles the sale and submits it. The cart is cleared only when
    /// submission succeeds; on failure everything stays as it was so the
    /// cashier can try again, and the retry resubmits the same draft.
    pub async fn complete_payment(&self) -> CheckoutResult<Sale> {
        let (draft, epoch) = {
            let mut state = self.state.lock().await;
            if state.in_flight {
                return Err(CheckoutError::PaymentInFlight);
            }

            let outcome = match state.phase {
                CheckoutPhase::ChangeComputed => state
                    .payment
                    .clone()
                    .ok_or(CoreError::MissingAmountReceived)?,
                CheckoutPhase::CardReady => {
                    let total = self.pricing.totals(&state.cart).total;
                    PaymentRequest::card(total).validate()?;
                    PaymentOutcome::card()
                }
                CheckoutPhase::PaymentSelection => {
                    return Err(CoreError::MissingPaymentMethod.into())
                }
                CheckoutPhase::CashEntry => return Err(CoreError::MissingAmountReceived.into()),
                phase => return Err(CheckoutError::invalid_transition(phase, "complete payment")),
            };

            let draft = match state.unsent_draft.take() {
                Some(draft) => {
                    debug!(reference = %draft.reference(), "Resubmitting sale");
                    draft
                }
                None => self.assembler.assemble(
                    &state.cart,
                    &self.pricing,
                    outcome,
                    state.customer.clone(),
                )?,
            };

            (draft, self.begin_flight(&mut state))
        };

        let result = self
            .race_cancel(epoch, async {
                self.submitter.submit(&draft).await.map_err(CheckoutError::from)
            })
            .await;

        let mut state = self.settle_flight(epoch).await?;
        let sale = match result {
            Ok(sale) => sale,
            Err(err) => {
                warn!(reference = %draft.reference(), error = %err, "Sale submission failed");
                state.unsent_draft = Some(draft);
                return Err(err);
            }
        };

        state.cart = state.cart.clear();
        state.phase = CheckoutPhase::Completed;
        state.last_sale = Some(sale.clone());

        info!(
            sale_id = %sale.id(),
            receipt_number = %sale.details().receipt_number(),
            total = sale.total().cents(),
            method = %sale.payment().method(),
            "Sale completed"
        );
        Ok(sale)
    }

    /// Any non-terminal state → Idle. In-flight work is abandoned and its
    /// result will be discarded. The cart is untouched.
    pub async fn cancel(&self) -> CheckoutResult<SessionSnapshot> {
        let mut state = self.state.lock().await;
        self.cancel_locked(&mut state)
    }

    /// Cancels only when a change calculation or submission is outstanding.
    ///
    /// Returns `None`, touching nothing, when there is nothing to interrupt.
    pub async fn cancel_in_flight(&self) -> Option<SessionSnapshot> {
        let mut state = self.state.lock().await;
        if !state.in_flight {
            return None;
        }
        self.cancel_locked(&mut state).ok()
    }

    fn cancel_locked(&self, state: &mut SessionState) -> CheckoutResult<SessionSnapshot> {
        match state.phase {
            CheckoutPhase::Idle => return Ok(self.snapshot_of(state)),
            CheckoutPhase::Completed => {
                return Err(CheckoutError::invalid_transition(state.phase, "cancel"))
            }
            _ => {}
        }

        let was_in_flight = state.in_flight;
        self.cancel_tx.send_modify(|epoch| *epoch += 1);
        state.reset_checkout();
        state.phase = CheckoutPhase::Idle;

        debug!(was_in_flight, "Checkout cancelled");
        Ok(self.snapshot_of(state))
    }

    /// Completed → Idle with an empty cart.
    pub async fn start_next(&self) -> CheckoutResult<SessionSnapshot> {
        let mut state = self.state.lock().await;
        expect_phase(&state, &[CheckoutPhase::Completed], "start the next sale")?;

        state.cart = Cart::new();
        state.reset_checkout();
        state.phase = CheckoutPhase::Idle;
        Ok(self.snapshot_of(&state))
    }

    // =========================================================================
    // Flight Control
    // =========================================================================

    /// Marks a remote request as outstanding and returns the current epoch.
    fn begin_flight(&self, state: &mut SessionState) -> u64 {
        state.in_flight = true;
        *self.cancel_tx.borrow()
    }

    /// Runs `work` unless the epoch moves first.
    async fn race_cancel<T, F>(&self, epoch: u64, work: F) -> CheckoutResult<T>
    where
        F: Future<Output = CheckoutResult<T>>,
    {
        let mut cancel_rx = self.cancel_tx.subscribe();
        tokio::select! {
            biased;
            _ = wait_for_cancel(&mut cancel_rx, epoch) => Err(CheckoutError::Cancelled),
            result = work => result,
        }
    }

    /// Re-takes the lock after a remote call. Fails with `Cancelled` if the
    /// checkout was cancelled meanwhile; otherwise clears `in_flight`.
    async fn settle_flight(&self, epoch: u64) -> CheckoutResult<MutexGuard<'_, SessionState>> {
        let mut state = self.state.lock().await;
        if *self.cancel_tx.borrow() != epoch {
            warn!(epoch, "Discarding payment result that arrived after cancellation");
            return Err(CheckoutError::Cancelled);
        }

        state.in_flight = false;
        Ok(state)
    }
}

fn expect_phase(
    state: &SessionState,
    allowed: &[CheckoutPhase],
    action: &'static str,
) -> CheckoutResult<()> {
    if allowed.contains(&state.phase) {
        Ok(())
    } else {
        Err(CheckoutError::invalid_transition(state.phase, action))
    }
}

async fn wait_for_cancel(rx: &mut watch::Receiver<u64>, epoch: u64) {
    while *rx.borrow_and_update() == epoch {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
