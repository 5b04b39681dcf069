//! Field normalization: raw source records into canonical orders.
//!
//! Source records arrive in whatever shape a given store version wrote
//! them: identifiers under `orderId`, `order_id`, or only a storage `id`;
//! customers inline, nested, or missing; items as arrays or keyed
//! objects; addresses as free text or structured fields. The normalizer
//! maps all of that onto one canonical [`Order`], synthesizing
//! deterministic defaults for anything absent.
//!
//! Normalization is a pure function of the raw record plus the
//! construction-time inputs (`ingested_at`, lead time, default country):
//! the same record always yields a byte-identical order, including
//! synthesized identifiers.

use std::hash::{DefaultHasher, Hash, Hasher};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use purestream_core::{
    Address, Customer, Order, OrderItem, OrderStatus, PaymentStatus, TimelineEntry,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::error::NormalizationError;
use crate::raw::{as_decimal, first_str, first_u32, lookup};
use crate::reconcile::{FinancialInputs, reconcile};

/// Explicit order-code fields, tried before the record's storage id.
const ID_PATHS: &[&str] = &["orderId", "order_id", "orderNumber", "order_no"];
/// Storage identifiers assigned by the backing store.
const STORAGE_ID_PATHS: &[&str] = &["id", "_id", "objectId", "key"];

const DEFAULT_DELIVERY_LEAD_DAYS: i64 = 7;
const DEFAULT_COUNTRY: &str = "India";

/// Converts raw records into canonical orders.
///
/// Construct one per ingestion pass; `ingested_at` seeds the defaults for
/// records that carry no order date.
#[derive(Debug, Clone)]
pub struct Normalizer {
    ingested_at: DateTime<Utc>,
    delivery_lead: Duration,
    default_country: String,
}

impl Normalizer {
    /// Create a normalizer with the standard lead time and country.
    #[must_use]
    pub fn new(ingested_at: DateTime<Utc>) -> Self {
        Self {
            ingested_at,
            delivery_lead: Duration::days(DEFAULT_DELIVERY_LEAD_DAYS),
            default_country: DEFAULT_COUNTRY.to_string(),
        }
    }

    /// Override the delivery lead time used for derived estimates.
    #[must_use]
    pub fn with_delivery_lead_days(mut self, days: i64) -> Self {
        self.delivery_lead = Duration::days(days);
        self
    }

    /// Override the default country elided from formatted addresses.
    #[must_use]
    pub fn with_default_country(mut self, country: impl Into<String>) -> Self {
        self.default_country = country.into();
        self
    }

    /// Normalize one raw record into a canonical order.
    ///
    /// Malformed individual fields coerce to their defaults rather than
    /// failing the record.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizationError`] only when the record carries no
    /// usable identifier and no derivable item data.
    pub fn normalize(&self, raw: &Value) -> Result<Order, NormalizationError> {
        let items = resolve_items(raw);
        let id = resolve_id(raw, &items)?;
        let display_id = first_str(raw, &["displayId", "display_id"])
            .unwrap_or_else(|| derive_display_id(&id));

        let order_date = first_datetime(raw, &["orderDate", "order_date", "createdAt", "created_at", "date"])
            .unwrap_or(self.ingested_at);
        let estimated_delivery =
            first_datetime(raw, &["estimatedDelivery", "estimated_delivery", "expectedDelivery"])
                .unwrap_or(order_date + self.delivery_lead);

        let status = first_str(raw, &["status", "orderStatus", "order_status"])
            .and_then(|s| s.parse::<OrderStatus>().ok())
            .unwrap_or_default();

        let status_timeline = resolve_timeline(raw, status, order_date);

        let financials = reconcile(&items, &FinancialInputs::from_raw(raw));

        Ok(Order {
            customer: resolve_customer(raw, &id),
            address: self.resolve_address(raw),
            payment_status: first_str(raw, &["paymentStatus", "payment_status"])
                .and_then(|s| s.parse::<PaymentStatus>().ok())
                .unwrap_or_default(),
            payment_method: first_str(raw, &["paymentMethod", "payment_method", "payment.method"])
                .map_or_else(|| "unknown".to_string(), |m| m.to_lowercase()),
            delivered_date: first_datetime(raw, &["deliveredDate", "delivered_date", "deliveredAt"]),
            tracking_number: first_str(raw, &["trackingNumber", "tracking_number", "tracking"])
                .unwrap_or_else(|| derive_tracking_number(&id)),
            notes: first_str(raw, &["notes", "note", "remarks"]),
            display_id,
            items,
            financials,
            status,
            order_date,
            estimated_delivery,
            status_timeline,
            id,
        })
    }

    /// Resolve the shipping address from either a free-text string or a
    /// structured object, synthesizing the single-line rendering.
    fn resolve_address(&self, raw: &Value) -> Address {
        let Some(value) = lookup(raw, "address")
            .or_else(|| lookup(raw, "shippingAddress"))
            .or_else(|| lookup(raw, "shipping_address"))
        else {
            return Address::default();
        };

        if let Value::String(text) = value {
            // Free-text addresses are used verbatim as the rendering.
            return Address {
                formatted: text.trim().to_string(),
                ..Address::default()
            };
        }

        let part = |paths: &[&str]| first_str(value, paths).unwrap_or_default();
        let mut address = Address {
            name: part(&["name", "fullName", "recipient"]),
            line1: part(&["line1", "address1", "street", "addressLine1"]),
            line2: part(&["line2", "address2", "addressLine2", "landmark"]),
            city: part(&["city", "town"]),
            state: part(&["state", "province"]),
            postal_code: part(&["postal_code", "postalCode", "pincode", "zip"]),
            country: part(&["country"]),
            formatted: String::new(),
        };
        address.formatted = self.render_address(&address);
        if address.formatted.is_empty() {
            // Canonical records and some sources keep a pre-rendered line
            // alongside (or instead of) the structured parts.
            address.formatted = part(&["formatted", "full", "text"]);
        }
        address
    }

    /// Join non-empty parts with `", "`, prefix the postal code with
    /// `"- "`, and append the country only when it is not the default.
    /// Absent parts never leave dangling separators.
    fn render_address(&self, address: &Address) -> String {
        let parts = [
            &address.name,
            &address.line1,
            &address.line2,
            &address.city,
            &address.state,
        ];
        let mut line = parts
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        if !address.postal_code.is_empty() {
            if line.is_empty() {
                line = format!("- {}", address.postal_code);
            } else {
                line = format!("{line} - {}", address.postal_code);
            }
        }
        if !address.country.is_empty() && address.country != self.default_country {
            if line.is_empty() {
                line = address.country.clone();
            } else {
                line = format!("{line}, {}", address.country);
            }
        }
        line
    }
}

/// Identifier resolution: explicit order code, then storage id, then a
/// synthesized `ORD-nnnnn` derived from a stable hash of the record.
fn resolve_id(raw: &Value, items: &[OrderItem]) -> Result<String, NormalizationError> {
    if let Some(id) = first_str(raw, ID_PATHS).or_else(|| first_str(raw, STORAGE_ID_PATHS)) {
        return Ok(id);
    }
    if items.is_empty() {
        return Err(NormalizationError::new("no identifier and no items"));
    }
    // Hash of the record text, so repeated normalization of the same raw
    // record synthesizes the same identifier.
    Ok(format!("ORD-{:05}", stable_hash(&raw.to_string()) % 100_000))
}

fn derive_display_id(id: &str) -> String {
    let upper = id.to_uppercase();
    if upper.starts_with("ORD") {
        upper
    } else {
        format!("ORD-{upper}")
    }
}

fn derive_tracking_number(id: &str) -> String {
    format!("TRK{:010}", stable_hash(id) % 10_000_000_000)
}

fn stable_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Customer contact resolution over the known alternate locations, with
/// placeholders derived from the order identifier.
fn resolve_customer(raw: &Value, id: &str) -> Customer {
    let name = first_str(
        raw,
        &["customerName", "customer_name", "customer.name", "user.name", "name", "address.name"],
    )
    .unwrap_or_else(|| format!("Customer {id}"));
    let email = first_str(
        raw,
        &["email", "customerEmail", "customer.email", "user.email"],
    )
    .unwrap_or_else(|| format!("{}@customers.invalid", slug(id)));
    let phone = first_str(
        raw,
        &[
            "phone",
            "mobile",
            "customerPhone",
            "customer.phone",
            "customer.mobile",
            "user.phone",
            "address.phone",
        ],
    )
    .unwrap_or_else(|| "unavailable".to_string());
    Customer { name, email, phone }
}

fn slug(id: &str) -> String {
    id.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Item resolution: accepts an array or an object-of-items (values taken
/// in encounter order).
fn resolve_items(raw: &Value) -> Vec<OrderItem> {
    let value = lookup(raw, "items")
        .or_else(|| lookup(raw, "products"))
        .or_else(|| lookup(raw, "orderItems"))
        .or_else(|| lookup(raw, "order_items"));

    let entries: Vec<&Value> = match value {
        Some(Value::Array(entries)) => entries.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| normalize_item(entry, index))
        .collect()
}

/// Normalize one item entry; malformed numeric fields coerce to 0/1.
fn normalize_item(entry: &Value, index: usize) -> Option<OrderItem> {
    if let Value::String(name) = entry {
        // Oldest records stored bare product names.
        return Some(OrderItem {
            product_id: slug(name),
            name: name.trim().to_string(),
            unit_price: Decimal::ZERO,
            quantity: 1,
            image: None,
            category: None,
        });
    }
    if !entry.is_object() {
        debug!(index, "skipping non-record item entry");
        return None;
    }

    let name = first_str(entry, &["name", "productName", "product_name", "title"])
        .unwrap_or_else(|| format!("Item {}", index + 1));
    let unit_price = lookup(entry, "unitPrice")
        .or_else(|| lookup(entry, "unit_price"))
        .or_else(|| lookup(entry, "price"))
        .and_then(as_decimal)
        .filter(|price| !price.is_sign_negative())
        .unwrap_or(Decimal::ZERO);
    let quantity = first_u32(entry, &["quantity", "qty"]).map_or(1, |q| q.max(1));

    Some(OrderItem {
        product_id: first_str(entry, &["productId", "product_id", "sku", "id"])
            .unwrap_or_else(|| slug(&name)),
        name,
        unit_price,
        quantity,
        image: first_str(entry, &["image", "imageUrl", "image_url", "img"]),
        category: first_str(entry, &["category", "productCategory"]),
    })
}

/// Timeline resolution: an explicit timeline array wins; otherwise the
/// status progression up to the current status is reconstructed, each
/// step stamped with the order date and attributed to "system".
fn resolve_timeline(
    raw: &Value,
    status: OrderStatus,
    order_date: DateTime<Utc>,
) -> Vec<TimelineEntry> {
    let explicit = lookup(raw, "statusTimeline")
        .or_else(|| lookup(raw, "status_timeline"))
        .or_else(|| lookup(raw, "timeline"))
        .and_then(Value::as_array);

    if let Some(entries) = explicit {
        let parsed: Vec<TimelineEntry> = entries
            .iter()
            .filter_map(|entry| {
                let status = first_str(entry, &["status"])?.parse::<OrderStatus>().ok()?;
                Some(TimelineEntry {
                    status,
                    timestamp: first_datetime(entry, &["timestamp", "at", "time", "date"])
                        .unwrap_or(order_date),
                    actor: first_str(entry, &["actor", "by", "updatedBy"])
                        .unwrap_or_else(|| "system".to_string()),
                })
            })
            .collect();
        if !parsed.is_empty() {
            return parsed;
        }
    }

    let reconstructed = match status.progress_index() {
        Some(index) => OrderStatus::PROGRESSION
            .iter()
            .take(index + 1)
            .copied()
            .collect(),
        // Side branches have no progression prefix beyond the initial
        // pending state.
        None => vec![OrderStatus::Pending, status],
    };
    reconstructed
        .into_iter()
        .map(|status| TimelineEntry {
            status,
            timestamp: order_date,
            actor: "system".to_string(),
        })
        .collect()
}

/// First parseable timestamp among the candidate paths.
///
/// Accepts RFC 3339 strings, bare dates, and unix epoch numbers (seconds
/// or milliseconds).
fn first_datetime(raw: &Value, paths: &[&str]) -> Option<DateTime<Utc>> {
    paths.iter().find_map(|path| match lookup(raw, path)? {
        Value::String(s) => parse_datetime(s),
        Value::Number(n) => {
            let epoch = n.as_i64()?;
            // unsigned_abs: i64::MIN has no i64 absolute value.
            if epoch.unsigned_abs() >= 100_000_000_000 {
                DateTime::from_timestamp_millis(epoch)
            } else {
                DateTime::from_timestamp(epoch, 0)
            }
        }
        _ => None,
    })
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn normalizer() -> Normalizer {
        Normalizer::new(Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_null_id_legacy_total_record() {
        // Null order_id, legacy total, bare products array.
        let raw = json!({
            "order_id": null,
            "total": 1500,
            "products": [{"productName": "RO Unit", "price": 1500}]
        });
        let order = normalizer().normalize(&raw).unwrap();

        assert!(order.display_id.starts_with("ORD-"));
        assert_eq!(order.items.len(), 1);
        let item = order.items.first().unwrap();
        assert_eq!(item.name, "RO Unit");
        assert_eq!(item.unit_price, Decimal::from(1500));
        assert_eq!(item.quantity, 1);
        assert_eq!(order.financials.subtotal, Decimal::from(1500));
        assert_eq!(order.financials.total, Decimal::from(1500));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let raw = json!({
            "total": 999,
            "products": [{"productName": "Sediment Filter", "price": 999}]
        });
        let n = normalizer();
        let first = n.normalize(&raw).unwrap();
        let second = n.normalize(&raw).unwrap();
        assert_eq!(first, second);
        // Synthesized identifiers included.
        assert_eq!(first.id, second.id);
        assert_eq!(first.tracking_number, second.tracking_number);
    }

    #[test]
    fn test_id_resolution_priority() {
        let raw = json!({"orderId": "ORD-42", "id": "storage-9", "items": []});
        assert_eq!(normalizer().normalize(&raw).unwrap().id, "ORD-42");

        let raw = json!({"id": "storage-9", "items": [{"name": "Tap", "price": 10}]});
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.id, "storage-9");
        assert_eq!(order.display_id, "ORD-STORAGE-9");
    }

    #[test]
    fn test_unusable_record_is_rejected() {
        let raw = json!({"note": "nothing here"});
        assert!(normalizer().normalize(&raw).is_err());
    }

    #[test]
    fn test_customer_alternate_locations() {
        let raw = json!({
            "orderId": "O1",
            "items": [],
            "user": {"name": "Asha Rao"},
            "customer": {"email": "asha@example.com"},
            "address": {"phone": "98200 00000"}
        });
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.customer.name, "Asha Rao");
        assert_eq!(order.customer.email, "asha@example.com");
        assert_eq!(order.customer.phone, "98200 00000");
    }

    #[test]
    fn test_customer_placeholders_derive_from_id() {
        let raw = json!({"orderId": "ORD-77", "items": []});
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.customer.name, "Customer ORD-77");
        assert_eq!(order.customer.email, "ord-77@customers.invalid");
        assert_eq!(order.customer.phone, "unavailable");
    }

    #[test]
    fn test_items_from_keyed_object_preserve_order() {
        let raw = json!({
            "orderId": "O2",
            "items": {
                "b": {"name": "Second", "price": 2},
                "a": {"name": "First", "price": 1}
            }
        });
        let order = normalizer().normalize(&raw).unwrap();
        let names: Vec<&str> = order.items.iter().map(|i| i.name.as_str()).collect();
        // Encounter order, not key order.
        assert_eq!(names, ["Second", "First"]);
    }

    #[test]
    fn test_malformed_item_fields_coerce() {
        let raw = json!({
            "orderId": "O3",
            "items": [
                {"name": "Carbon Filter", "price": "not-a-number", "qty": "many"},
                {"name": "Membrane", "price": -50, "quantity": 0}
            ]
        });
        let order = normalizer().normalize(&raw).unwrap();
        let first = order.items.first().unwrap();
        assert_eq!(first.unit_price, Decimal::ZERO);
        assert_eq!(first.quantity, 1);
        let second = order.items.get(1).unwrap();
        assert_eq!(second.unit_price, Decimal::ZERO); // negative rejected
        assert_eq!(second.quantity, 1); // zero floors to 1
    }

    #[test]
    fn test_free_text_address_used_verbatim() {
        let raw = json!({"orderId": "O4", "items": [], "address": "14 MG Road, Bengaluru"});
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.address.formatted, "14 MG Road, Bengaluru");
        assert!(order.address.city.is_empty());
    }

    #[test]
    fn test_structured_address_rendering() {
        let raw = json!({
            "orderId": "O5",
            "items": [],
            "address": {
                "name": "Asha Rao",
                "line1": "Flat 3B",
                "city": "Pune",
                "state": "Maharashtra",
                "pincode": "411001",
                "country": "India"
            }
        });
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(
            order.address.formatted,
            "Asha Rao, Flat 3B, Pune, Maharashtra - 411001"
        );

        // Non-default country is appended.
        let raw = json!({
            "orderId": "O6",
            "items": [],
            "address": {"city": "Colombo", "country": "Sri Lanka"}
        });
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.address.formatted, "Colombo, Sri Lanka");
    }

    #[test]
    fn test_address_skips_empty_parts_without_dangling_separators() {
        let raw = json!({
            "orderId": "O7",
            "items": [],
            "address": {"line1": "", "city": "Pune", "pincode": "411001"}
        });
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.address.formatted, "Pune - 411001");
    }

    #[test]
    fn test_dates_default_and_derive() {
        let n = normalizer();
        let raw = json!({"orderId": "O8", "items": []});
        let order = n.normalize(&raw).unwrap();
        assert_eq!(order.order_date, n.ingested_at);
        assert_eq!(order.estimated_delivery, n.ingested_at + Duration::days(7));

        let raw = json!({"orderId": "O9", "items": [], "orderDate": "2026-08-10"});
        let order = n.normalize(&raw).unwrap();
        assert_eq!(
            order.order_date,
            Utc.with_ymd_and_hms(2026, 8, 10, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_epoch_timestamps() {
        let raw = json!({"orderId": "O10", "items": [], "orderDate": 1_754_000_000});
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.order_date.timestamp(), 1_754_000_000);

        let raw = json!({"orderId": "O11", "items": [], "orderDate": 1_754_000_000_000_i64});
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.order_date.timestamp(), 1_754_000_000);
    }

    #[test]
    fn test_extreme_epoch_values_fall_back_to_default() {
        // Out-of-range epochs (including i64::MIN, which has no i64
        // absolute value) must not panic; the date defaults instead.
        let n = normalizer();
        for epoch in [i64::MIN, i64::MAX, -9_000_000_000_000_000_000_i64] {
            let raw = json!({"orderId": "O11", "items": [], "orderDate": epoch});
            let order = n.normalize(&raw).unwrap();
            assert_eq!(order.order_date, n.ingested_at);
        }
    }

    #[test]
    fn test_timeline_reconstruction_from_progression() {
        let raw = json!({"orderId": "O12", "items": [], "status": "shipped"});
        let order = normalizer().normalize(&raw).unwrap();
        let statuses: Vec<OrderStatus> =
            order.status_timeline.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            [
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Processing,
                OrderStatus::Shipped
            ]
        );
        assert!(order.status_timeline.iter().all(|e| e.actor == "system"));
    }

    #[test]
    fn test_timeline_for_side_branch() {
        let raw = json!({"orderId": "O13", "items": [], "status": "cancelled"});
        let order = normalizer().normalize(&raw).unwrap();
        let statuses: Vec<OrderStatus> =
            order.status_timeline.iter().map(|e| e.status).collect();
        assert_eq!(statuses, [OrderStatus::Pending, OrderStatus::Cancelled]);
    }

    #[test]
    fn test_explicit_timeline_wins() {
        let raw = json!({
            "orderId": "O14",
            "items": [],
            "status": "delivered",
            "statusTimeline": [
                {"status": "pending", "at": "2026-08-01T08:00:00Z", "by": "web"},
                {"status": "delivered", "at": "2026-08-05T15:30:00Z", "by": "courier"}
            ]
        });
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.status_timeline.len(), 2);
        assert_eq!(order.status_timeline.get(1).unwrap().actor, "courier");
    }

    #[test]
    fn test_unknown_status_defaults_to_pending() {
        let raw = json!({"orderId": "O15", "items": [], "status": "despatched"});
        let order = normalizer().normalize(&raw).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_canonical_order_round_trips() {
        // A canonical order serialized back to JSON must re-normalize to
        // the same order; the dual-source store relies on this when it
        // mirrors merged orders into the fallback cache.
        let raw = json!({
            "orderId": "ORD-100",
            "status": "shipped",
            "paymentStatus": "paid",
            "paymentMethod": "card",
            "customer": {"name": "Asha Rao", "email": "asha@example.com"},
            "items": [{"name": "RO Unit", "price": "15999.00", "quantity": 1}],
            "address": {"city": "Pune", "pincode": "411001"},
            "tax": "100.00"
        });
        let n = normalizer();
        let order = n.normalize(&raw).unwrap();
        let round_tripped = n.normalize(&serde_json::to_value(&order).unwrap()).unwrap();
        assert_eq!(order, round_tripped);
    }
}
