//! # Receipt Formatter
//!
//! Pure projection of an issued [`Sale`] into a receipt view for the printing
//! collaborator.
//!
//! ## Conditional Blocks
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            Corner Store                  │  header (always)
//! │            12 Mall Road                  │
//! │ Receipt: 261016-142301-0042              │
//! │ Date:    2026-10-16 14:23                │
//! │ Customer: Ayesha   Phone: 0300 1234567   │  only if name or phone
//! │──────────────────────────────────────────│
//! │ Soap                                     │
//! │   2 x $100.00                    $200.00 │  one block per line
//! │──────────────────────────────────────────│
//! │ Subtotal                         $200.00 │
//! │ Tax                                $0.00 │  only if non-zero
//! │ Discount                          -$0.00 │  only if non-zero
//! │ TOTAL                            $200.00 │
//! │ Paid by                             Cash │
//! │ Received                         $500.00 │  cash only
//! │ Change                           $300.00 │  cash only
//! └──────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Customer, PaymentMethod, Sale};

/// Narrowest supported slip, in characters.
pub const MIN_PAPER_WIDTH: usize = 24;

/// Widest supported slip, in characters.
pub const MAX_PAPER_WIDTH: usize = 64;

// =============================================================================
// Store Profile
// =============================================================================

/// Store details printed in the receipt header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProfile {
    pub name: String,
    pub address_lines: Vec<String>,
    pub currency_symbol: String,
}

impl Default for StoreProfile {
    fn default() -> Self {
        StoreProfile {
            name: "Till POS".to_string(),
            address_lines: Vec::new(),
            currency_symbol: "$".to_string(),
        }
    }
}

// =============================================================================
// Receipt View
// =============================================================================

/// One printed line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Structured receipt consumed by renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store_name: String,
    pub store_address: Vec<String>,
    pub currency_symbol: String,
    pub sale_id: String,
    pub receipt_number: String,
    /// Sale time in UTC, `YYYY-MM-DD HH:MM`.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Money>,
    pub total: Money,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_received: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Money>,
}

// =============================================================================
// Formatter
// =============================================================================

/// Builds receipt views for one store.
#[derive(Debug, Clone, Default)]
pub struct ReceiptFormatter {
    store: StoreProfile,
}

impl ReceiptFormatter {
    pub fn new(store: StoreProfile) -> Self {
        ReceiptFormatter { store }
    }

    /// Projects a sale into a receipt. No side effects.
    pub fn format(&self, sale: &Sale) -> Receipt {
        let details = sale.details();
        let payment = details.payment();
        let is_cash = payment.method() == PaymentMethod::Cash;

        Receipt {
            store_name: self.store.name.clone(),
            store_address: self.store.address_lines.clone(),
            currency_symbol: self.store.currency_symbol.clone(),
            sale_id: sale.id().to_string(),
            receipt_number: details.receipt_number().to_string(),
            timestamp: details.created_at().format("%Y-%m-%d %H:%M").to_string(),
            customer: details.customer().filter(|c| !c.is_empty()).cloned(),
            lines: details
                .items()
                .iter()
                .map(|item| ReceiptLine {
                    name: item.name().to_string(),
                    quantity: item.quantity(),
                    unit_price: item.unit_price(),
                    line_total: item.line_total(),
                })
                .collect(),
            subtotal: details.subtotal(),
            tax: Some(details.tax()).filter(|t| !t.is_zero()),
            discount: Some(details.discount()).filter(|d| !d.is_zero()),
            total: details.total(),
            payment_method: payment.method(),
            amount_received: payment.amount_received().filter(|_| is_cash),
            change: payment.change().filter(|_| is_cash),
        }
    }
}

// =============================================================================
// Text Rendering
// =============================================================================

impl Receipt {
    /// Renders a fixed-width plain-text slip.
    ///
    /// `width` is clamped to `MIN_PAPER_WIDTH..=MAX_PAPER_WIDTH`.
    pub fn render_text(&self, width: usize) -> String {
        let width = width.clamp(MIN_PAPER_WIDTH, MAX_PAPER_WIDTH);
        let money = |m: Money| m.format_with(&self.currency_symbol);
        let rule = "-".repeat(width);
        let mut out: Vec<String> = Vec::new();

        out.push(center(&self.store_name, width));
        for line in &self.store_address {
            out.push(center(line, width));
        }
        out.push(rule.clone());
        out.push(two_columns("Receipt:", &self.receipt_number, width));
        out.push(two_columns("Date:", &self.timestamp, width));

        if let Some(customer) = &self.customer {
            if let Some(name) = customer.name() {
                out.push(two_columns("Customer:", name, width));
            }
            if let Some(phone) = customer.phone() {
                out.push(two_columns("Phone:", phone, width));
            }
        }

        out.push(rule.clone());
        for line in &self.lines {
            out.push(truncate(&line.name, width));
            let qty = format!("  {} x {}", line.quantity, money(line.unit_price));
            out.push(two_columns(&qty, &money(line.line_total), width));
        }
        out.push(rule.clone());

        out.push(two_columns("Subtotal", &money(self.subtotal), width));
        if let Some(tax) = self.tax {
            out.push(two_columns("Tax", &money(tax), width));
        }
        if let Some(discount) = self.discount {
            out.push(two_columns("Discount", &money(Money::zero() - discount), width));
        }
        out.push(two_columns("TOTAL", &money(self.total), width));
        out.push(two_columns("Paid by", self.payment_method.label(), width));
        if let Some(received) = self.amount_received {
            out.push(two_columns("Received", &money(received), width));
        }
        if let Some(change) = self.change {
            out.push(two_columns("Change", &money(change), width));
        }
        out.push(rule);

        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn center(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = (width - text.chars().count()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// Left label, right-aligned value; the label is cut if both do not fit.
fn two_columns(left: &str, right: &str, width: usize) -> String {
    let right = truncate(right, width);
    let room = width.saturating_sub(right.chars().count() + 1);
    let left = truncate(left, room);
    let gap = width - left.chars().count() - right.chars().count();
    format!("{}{}{}", left, " ".repeat(gap), right)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use crate::pricing::CartTotals;
    use crate::types::{ChangeSource, PaymentOutcome, SaleDraft};
    use chrono::{TimeZone, Utc};

    fn sale(payment: PaymentOutcome, customer: Option<Customer>, tax: i64) -> Sale {
        let items = vec![CartItem::new("1", "Soap", Money::from_cents(10_000), 2).unwrap()];
        let totals = CartTotals {
            item_count: 1,
            total_quantity: 2,
            subtotal: Money::from_cents(20_000),
            tax: Money::from_cents(tax),
            discount: Money::zero(),
            total: Money::from_cents(20_000 + tax),
        };
        SaleDraft::new(
            "ref-1".into(),
            "261016-142301-0042".into(),
            Utc.with_ymd_and_hms(2026, 10, 16, 14, 23, 1).unwrap(),
            customer,
            items,
            &totals,
            payment,
        )
        .finalize("sale-1")
    }

    fn cash() -> PaymentOutcome {
        PaymentOutcome::cash(
            Money::from_cents(50_000),
            Money::from_cents(30_000),
            ChangeSource::Remote,
        )
    }

    fn formatter() -> ReceiptFormatter {
        ReceiptFormatter::new(StoreProfile {
            name: "Corner Store".into(),
            address_lines: vec!["12 Mall Road".into()],
            currency_symbol: "$".into(),
        })
    }

    #[test]
    fn test_cash_receipt_includes_received_and_change() {
        let receipt = formatter().format(&sale(cash(), None, 0));

        assert_eq!(receipt.sale_id, "sale-1");
        assert_eq!(receipt.timestamp, "2026-10-16 14:23");
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].line_total, Money::from_cents(20_000));
        assert_eq!(receipt.amount_received, Some(Money::from_cents(50_000)));
        assert_eq!(receipt.change, Some(Money::from_cents(30_000)));
        assert_eq!(receipt.customer, None);
        assert_eq!(receipt.tax, None);
        assert_eq!(receipt.discount, None);
    }

    #[test]
    fn test_card_receipt_omits_cash_lines() {
        let receipt = formatter().format(&sale(PaymentOutcome::card(), None, 0));

        assert_eq!(receipt.payment_method, PaymentMethod::Card);
        assert_eq!(receipt.amount_received, None);
        assert_eq!(receipt.change, None);

        let text = receipt.render_text(42);
        assert!(!text.contains("Change"));
        assert!(!text.contains("Received"));
        assert!(text.contains("Card"));
    }

    #[test]
    fn test_customer_block_only_when_present() {
        let with_phone = Customer::new(None, Some("0300 1234567".into())).unwrap();
        let receipt = formatter().format(&sale(cash(), Some(with_phone), 0));
        let text = receipt.render_text(42);
        assert!(text.contains("Phone:"));
        assert!(!text.contains("Customer:"));

        let blank = Customer::new(Some(" ".into()), None).unwrap();
        let receipt = formatter().format(&sale(cash(), Some(blank), 0));
        assert!(receipt.customer.is_none());
    }

    #[test]
    fn test_tax_line_only_when_non_zero() {
        let receipt = formatter().format(&sale(cash(), None, 150));
        assert_eq!(receipt.tax, Some(Money::from_cents(150)));
        assert!(receipt.render_text(42).contains("Tax"));

        let receipt = formatter().format(&sale(cash(), None, 0));
        assert!(!receipt.render_text(42).contains("Tax"));
    }

    #[test]
    fn test_render_text_layout() {
        let text = formatter().format(&sale(cash(), None, 0)).render_text(32);

        for line in text.lines() {
            assert!(line.chars().count() <= 32, "line too wide: {:?}", line);
        }
        assert!(text.contains("Corner Store"));
        assert!(text.lines().any(|l| l.starts_with("TOTAL") && l.ends_with("$200.00")));
        assert!(text.lines().any(|l| l.starts_with("Change") && l.ends_with("$300.00")));
    }

    #[test]
    fn test_render_width_is_clamped() {
        let text = formatter().format(&sale(cash(), None, 0)).render_text(4);
        let rule = text.lines().find(|l| l.starts_with('-')).unwrap();
        assert_eq!(rule.len(), MIN_PAPER_WIDTH);
    }
}
