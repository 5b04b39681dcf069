//! Change events emitted by the sync engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::OrderStatus;

/// An observed change between two order snapshots.
///
/// Consumed by notification sinks (toasts, banners, logs - rendering is
/// the sink's concern). The change detector emits at most one event per
/// order per snapshot pair, so a sink never sees duplicates for the same
/// transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderEvent {
    /// An order appeared that the previous snapshot did not contain.
    Created(OrderCreated),
    /// An order's status differs from the previous snapshot.
    StatusChanged(StatusTransition),
}

impl OrderEvent {
    /// Identifier of the order this event concerns.
    #[must_use]
    pub fn order_id(&self) -> &str {
        match self {
            Self::Created(e) => &e.order_id,
            Self::StatusChanged(e) => &e.order_id,
        }
    }
}

/// A first-observed status transition for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub order_id: String,
    pub display_id: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub detected_at: DateTime<Utc>,
}

/// An order observed for the first time.
///
/// Distinct from a status transition: there is no "from" state to compare
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: String,
    pub display_id: String,
    pub status: OrderStatus,
    pub detected_at: DateTime<Utc>,
}
