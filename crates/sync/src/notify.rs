//! Notification sinks for change events.
//!
//! The engine hands every detected [`OrderEvent`] to a sink; rendering
//! (toast, banner, log line) is entirely the sink's concern. Delivery
//! failures are the sink's to absorb - a sink must never fail the sync
//! cycle that produced the event.

use purestream_core::OrderEvent;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Consumer of change events emitted by the sync scheduler.
pub trait NotificationSink: Send + Sync {
    /// Deliver one event. Infallible by contract; implementations log and
    /// swallow their own delivery problems.
    fn notify(&self, event: &OrderEvent);
}

/// Sink that renders events as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &OrderEvent) {
        match event {
            OrderEvent::Created(created) => {
                info!(
                    order_id = %created.order_id,
                    display_id = %created.display_id,
                    status = %created.status,
                    "order observed for the first time"
                );
            }
            OrderEvent::StatusChanged(transition) => {
                info!(
                    order_id = %transition.order_id,
                    display_id = %transition.display_id,
                    from = %transition.from,
                    to = %transition.to,
                    "order status changed"
                );
            }
        }
    }
}

/// Sink that forwards events to a channel for a consuming view.
///
/// Cheap to clone; one receiver per view. If the receiving side is gone
/// the event is dropped with a warning rather than failing the cycle.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OrderEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver a view consumes from.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OrderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: &OrderEvent) {
        if self.tx.send(event.clone()).is_err() {
            warn!(order_id = %event.order_id(), "event receiver dropped; discarding event");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use purestream_core::{OrderCreated, OrderStatus};

    fn created_event(id: &str) -> OrderEvent {
        OrderEvent::Created(OrderCreated {
            order_id: id.to_string(),
            display_id: id.to_string(),
            status: OrderStatus::Pending,
            detected_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelSink::new();
        sink.notify(&created_event("ORD-1"));
        sink.notify(&created_event("ORD-2"));

        assert_eq!(rx.recv().await.unwrap().order_id(), "ORD-1");
        assert_eq!(rx.recv().await.unwrap().order_id(), "ORD-2");
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        // Must not panic or error.
        sink.notify(&created_event("ORD-3"));
    }
}
