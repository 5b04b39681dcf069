//! Snapshot diffing: detect status transitions between refreshes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use purestream_core::{Order, OrderCreated, OrderEvent, StatusTransition};

/// A complete id -> order mapping at one point in time.
pub type Snapshot = BTreeMap<String, Order>;

/// Compare two snapshots and report first-observed changes.
///
/// Emits exactly one [`OrderEvent::StatusChanged`] per order whose status
/// differs between the snapshots, and one [`OrderEvent::Created`] per
/// order present only in `current`, in the iteration order of `current`.
/// Orders absent from `current` are ignored; deletion is the store's
/// concern, not the detector's.
///
/// Pure function of its inputs (`detected_at` is supplied, not sampled):
/// the same snapshot pair always yields the same event sequence.
#[must_use]
pub fn diff_snapshots(
    previous: &Snapshot,
    current: &Snapshot,
    detected_at: DateTime<Utc>,
) -> Vec<OrderEvent> {
    current
        .iter()
        .filter_map(|(id, order)| match previous.get(id) {
            Some(prior) if prior.status == order.status => None,
            Some(prior) => Some(OrderEvent::StatusChanged(StatusTransition {
                order_id: order.id.clone(),
                display_id: order.display_id.clone(),
                from: prior.status,
                to: order.status,
                detected_at,
            })),
            None => Some(OrderEvent::Created(OrderCreated {
                order_id: order.id.clone(),
                display_id: order.display_id.clone(),
                status: order.status,
                detected_at,
            })),
        })
        .collect()
}
