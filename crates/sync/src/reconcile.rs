//! Financial reconciliation for normalized orders.
//!
//! Fills any missing financial field and enforces the total invariant:
//! an explicit source total is trusted as given; otherwise
//! `total = subtotal + tax + shipping - discount`, with the subtotal
//! itself defaulting to the sum of line totals.

use purestream_core::{Financials, OrderItem};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::raw::first_decimal;

/// Financial fields as the source record stated them.
///
/// `None` means the source did not carry the field; the distinction
/// between "explicitly 0" and "absent" drives which defaults apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinancialInputs {
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl FinancialInputs {
    /// Capture the explicit financial fields of a raw record.
    ///
    /// Legacy records carry a single top-level `total` that predates the
    /// itemized fields; it doubles as the subtotal when no explicit
    /// subtotal exists, which is why `total` appears in both lists.
    #[must_use]
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            subtotal: first_decimal(
                raw,
                &["financials.subtotal", "subtotal", "sub_total", "total"],
            ),
            tax: first_decimal(raw, &["financials.tax", "tax", "taxAmount", "tax_amount"]),
            shipping_cost: first_decimal(
                raw,
                &[
                    "financials.shipping_cost",
                    "shippingCost",
                    "shipping_cost",
                    "shipping",
                    "deliveryCharge",
                ],
            ),
            discount: first_decimal(raw, &["financials.discount", "discount"]),
            total: first_decimal(
                raw,
                &[
                    "financials.total",
                    "total",
                    "totalAmount",
                    "total_amount",
                    "grandTotal",
                    "grand_total",
                ],
            ),
        }
    }
}

/// Derive a fully-populated [`Financials`] from line items and the
/// source's explicit fields.
///
/// Always succeeds; absent fields absorb their defaults. Rounding to two
/// decimal places (half-up) is applied once at the end, never at
/// intermediate steps.
#[must_use]
pub fn reconcile(items: &[OrderItem], inputs: &FinancialInputs) -> Financials {
    let items_sum: Decimal = items.iter().map(OrderItem::line_total).sum();

    let subtotal = inputs.subtotal.unwrap_or(items_sum);
    let tax = inputs.tax.unwrap_or_default();
    let shipping_cost = inputs.shipping_cost.unwrap_or_default();
    let discount = inputs.discount.unwrap_or_default();
    let total = inputs
        .total
        .unwrap_or(subtotal + tax + shipping_cost - discount);

    Financials {
        subtotal: round_currency(subtotal),
        tax: round_currency(tax),
        shipping_cost: round_currency(shipping_cost),
        discount: round_currency(discount),
        total: round_currency(total),
    }
}

/// Round to 2 decimal places, half away from zero.
fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
