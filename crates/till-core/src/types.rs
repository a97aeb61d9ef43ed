//! # Domain Types
//!
//! Payment and sale types shared by the checkout flow and the receipt.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ PaymentRequest  │   │ PaymentOutcome  │   │    SaleDraft    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  method         │──►│  method         │──►│  reference      │       │
//! │  │  total          │   │  received?      │   │  items (frozen) │       │
//! │  │  received?      │   │  change?        │   │  totals         │       │
//! │  └─────────────────┘   └─────────────────┘   │  payment        │       │
//! │                                              └────────┬────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐            │ finalize(id)   │
//! │  │ PaymentMethod   │   │    Customer     │            ▼                │
//! │  │  Cash           │   │  name?          │   ┌─────────────────┐       │
//! │  │  Card           │   │  phone?         │   │      Sale       │       │
//! │  └─────────────────┘   └─────────────────┘   │  id + draft     │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `SaleDraft` and `Sale` expose getters only: once issued they are never
//! mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::cart::CartItem;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::CartTotals;
use crate::validation::{validate_amount_received, validate_customer_name, validate_phone};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (825 = 8.25%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; change is computed.
    Cash,
    /// Card on an external terminal; no change.
    Card,
}

impl PaymentMethod {
    /// Returns the label printed on receipts.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: vec!["cash".to_string(), "card".to_string()],
            }),
        }
    }
}

// =============================================================================
// Payment Request
// =============================================================================

/// A request to settle `total` with the chosen method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub total: Money,
    /// Cash tendered. Ignored for card payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_received: Option<Money>,
}

impl PaymentRequest {
    pub fn cash(total: Money, amount_received: Money) -> Self {
        PaymentRequest {
            method: PaymentMethod::Cash,
            total,
            amount_received: Some(amount_received),
        }
    }

    pub fn card(total: Money) -> Self {
        PaymentRequest {
            method: PaymentMethod::Card,
            total,
            amount_received: None,
        }
    }

    /// Checks the request before anything is sent to a collaborator.
    ///
    /// ## Rules
    /// - total must not be negative
    /// - Cash: amount received is required, non-negative and ≥ total
    /// - Card: always valid once selected
    pub fn validate(&self) -> CoreResult<()> {
        if self.total.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        match self.method {
            PaymentMethod::Card => Ok(()),
            PaymentMethod::Cash => {
                let received = self.amount_received.ok_or(CoreError::MissingAmountReceived)?;
                validate_amount_received(received)?;
                if received < self.total {
                    return Err(CoreError::InsufficientPayment {
                        total: self.total,
                        received,
                    });
                }
                Ok(())
            }
        }
    }

    /// Change by the local formula `amount_received − total`.
    ///
    /// `None` for card payments or when no amount was tendered.
    pub fn local_change(&self) -> Option<Money> {
        match self.method {
            PaymentMethod::Cash => self.amount_received.map(|received| received - self.total),
            PaymentMethod::Card => None,
        }
    }
}

// =============================================================================
// Payment Outcome
// =============================================================================

/// Which path produced the change figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// Confirmed by the change-calculation service.
    Remote,
    /// Computed locally after the service failed or disagreed.
    LocalFallback,
}

/// Result of a successful payment step.
///
/// `amount_received` and `change` exist only for cash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amount_received: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    change: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    change_source: Option<ChangeSource>,
}

impl PaymentOutcome {
    pub fn cash(amount_received: Money, change: Money, source: ChangeSource) -> Self {
        PaymentOutcome {
            method: PaymentMethod::Cash,
            amount_received: Some(amount_received),
            change: Some(change),
            change_source: Some(source),
        }
    }

    pub fn card() -> Self {
        PaymentOutcome {
            method: PaymentMethod::Card,
            amount_received: None,
            change: None,
            change_source: None,
        }
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn amount_received(&self) -> Option<Money> {
        self.amount_received
    }

    pub fn change(&self) -> Option<Money> {
        self.change
    }

    pub fn change_source(&self) -> Option<ChangeSource> {
        self.change_source
    }

    /// Checks that this outcome settles `total`.
    pub fn covers(&self, total: Money) -> CoreResult<()> {
        match (self.method, self.amount_received) {
            (PaymentMethod::Card, _) => Ok(()),
            (PaymentMethod::Cash, Some(received)) if received >= total => Ok(()),
            (PaymentMethod::Cash, Some(received)) => {
                Err(CoreError::InsufficientPayment { total, received })
            }
            (PaymentMethod::Cash, None) => Err(CoreError::MissingAmountReceived),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Optional customer identity collected before payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
}

impl Customer {
    /// Builds a customer from raw input.
    ///
    /// Values are trimmed and blank values become `None`.
    ///
    /// ```rust
    /// use till_core::types::Customer;
    ///
    /// let c = Customer::new(Some("  Ayesha ".into()), Some("".into())).unwrap();
    /// assert_eq!(c.name(), Some("Ayesha"));
    /// assert_eq!(c.phone(), None);
    /// ```
    pub fn new(name: Option<String>, phone: Option<String>) -> CoreResult<Self> {
        let name = normalize(name);
        let phone = normalize(phone);

        if let Some(ref name) = name {
            validate_customer_name(name)?;
        }
        if let Some(ref phone) = phone {
            validate_phone(phone)?;
        }

        Ok(Customer { name, phone })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// True when neither name nor phone is present.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none()
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Sale Draft
// =============================================================================

/// A sale assembled at checkout, before the backend assigns its id.
///
/// Items are a frozen copy of the cart taken at assembly time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    /// Local reference (UUID v4), stable across submission retries.
    reference: String,
    /// Human-readable receipt number.
    receipt_number: String,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    customer: Option<Customer>,
    items: Vec<CartItem>,
    subtotal: Money,
    tax: Money,
    discount: Money,
    total: Money,
    payment: PaymentOutcome,
}

impl SaleDraft {
    pub fn new(
        reference: String,
        receipt_number: String,
        created_at: DateTime<Utc>,
        customer: Option<Customer>,
        items: Vec<CartItem>,
        totals: &CartTotals,
        payment: PaymentOutcome,
    ) -> Self {
        SaleDraft {
            reference,
            receipt_number,
            created_at,
            customer: customer.filter(|c| !c.is_empty()),
            items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
            payment,
        }
    }

    /// Attaches the backend-assigned id, producing the issued sale.
    pub fn finalize(self, id: impl Into<String>) -> Sale {
        Sale {
            id: id.into(),
            details: self,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn receipt_number(&self) -> &str {
        &self.receipt_number
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn payment(&self) -> &PaymentOutcome {
        &self.payment
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An issued sale: immutable, handed to the receipt and persistence
/// collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    id: String,
    #[serde(flatten)]
    details: SaleDraft,
}

impl Sale {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Everything recorded at checkout time.
    pub fn details(&self) -> &SaleDraft {
        &self.details
    }

    pub fn total(&self) -> Money {
        self.details.total
    }

    pub fn payment(&self) -> &PaymentOutcome {
        &self.details.payment
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
