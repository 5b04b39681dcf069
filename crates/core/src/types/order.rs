//! Canonical order, item, and address types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::{OrderStatus, PaymentStatus};

/// A fully-normalized order.
///
/// Every field is populated: the normalizer synthesizes deterministic
/// defaults for anything the source record omitted. Two normalizations of
/// the same raw record produce byte-identical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Stable unique identifier, as carried by the source.
    pub id: String,
    /// Human-facing order code (e.g., "ORD-00042"); derived when absent.
    pub display_id: String,
    pub customer: Customer,
    /// Line items. Immutable once set; later raw values are ignored unless
    /// the retained value is empty.
    pub items: Vec<OrderItem>,
    /// Shipping address. Immutable once set, like `items`.
    pub address: Address,
    pub financials: Financials,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Free-form method label from the source (e.g., "cod", "card"),
    /// lower-cased.
    pub payment_method: String,
    /// Defaults to the ingestion time when the source carries no date.
    pub order_date: DateTime<Utc>,
    /// Derived as `order_date` + a fixed lead time when absent.
    pub estimated_delivery: DateTime<Utc>,
    pub delivered_date: Option<DateTime<Utc>>,
    /// Synthesized from the identifier when absent.
    pub tracking_number: String,
    pub notes: Option<String>,
    /// Ordered status history; reconstructed from the status progression
    /// when the source carries no explicit timeline.
    pub status_timeline: Vec<TimelineEntry>,
}

/// Customer contact details attached to an order.
///
/// Each field falls back to a placeholder derived from the order
/// identifier when no source location yields a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A single purchased line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    /// Unit price; unknown or malformed prices normalize to 0, never
    /// negative.
    pub unit_price: Decimal,
    /// Always >= 1; malformed quantities normalize to 1.
    pub quantity: u32,
    pub image: Option<String>,
    pub category: Option<String>,
}

impl OrderItem {
    /// Line total for this item.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Structured shipping address plus its single-line rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Address {
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    /// Single-line rendering: non-empty parts joined by `", "`, the postal
    /// code prefixed by `"- "`, the country appended only when it differs
    /// from the store default. Free-text source addresses land here
    /// verbatim with the structured fields left empty.
    pub formatted: String,
}

impl Address {
    /// Whether no source address data was captured at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formatted.is_empty()
    }
}

/// Derived financial totals for an order.
///
/// Invariant: `total = subtotal + tax + shipping_cost - discount` unless
/// the source record supplied an explicit total, which is trusted as
/// given. All values are rounded to 2 decimal places, half-up, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Financials {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// One step in an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    /// Who recorded the step ("system" for reconstructed entries).
    pub actor: String,
}
