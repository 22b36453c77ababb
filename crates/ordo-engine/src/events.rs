//! # Lifecycle Events
//!
//! One event per committed state transition. Events are published after the
//! transaction commits, so a consumer never sees an event for a transition
//! that rolled back; a crash between commit and publish can lose the event,
//! which makes delivery at-most-once in-process. Hosts that need stronger
//! guarantees plug in a durable [`EventSink`].
//!
//! The engine never awaits a sink: `publish` is synchronous and expected to
//! be fast (log, push to a channel, append to a queue).

use serde::Serialize;
use tracing::info;

/// A committed order state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    /// Order created; stock reserved.
    Created {
        order_id: String,
        order_number: String,
        user_id: String,
        total_cents: i64,
    },

    /// Order paid; reservation consumed.
    Paid {
        order_id: String,
        order_number: String,
        user_id: String,
        total_cents: i64,
    },

    /// Order cancelled; reservation released.
    Cancelled {
        order_id: String,
        order_number: String,
        user_id: String,
    },

    /// Reservation window elapsed; reservation released.
    Expired {
        order_id: String,
        order_number: String,
        user_id: String,
    },
}

impl OrderEvent {
    /// The order this event is about.
    pub fn order_id(&self) -> &str {
        match self {
            OrderEvent::Created { order_id, .. }
            | OrderEvent::Paid { order_id, .. }
            | OrderEvent::Cancelled { order_id, .. }
            | OrderEvent::Expired { order_id, .. } => order_id,
        }
    }

    /// Event name as published (`created`, `paid`, `cancelled`, `expired`).
    pub fn kind(&self) -> &'static str {
        match self {
            OrderEvent::Created { .. } => "created",
            OrderEvent::Paid { .. } => "paid",
            OrderEvent::Cancelled { .. } => "cancelled",
            OrderEvent::Expired { .. } => "expired",
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Consumer seam for lifecycle events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: OrderEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn publish(&self, _event: OrderEvent) {}
}

/// Logs every event through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: OrderEvent) {
        info!(
            kind = event.kind(),
            order_id = event.order_id(),
            "Order event"
        );
    }
}

/// Test sink that records everything it receives.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink(std::sync::Mutex<Vec<OrderEvent>>);

#[cfg(test)]
impl RecordingSink {
    pub fn events(&self) -> Vec<OrderEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(OrderEvent::kind).collect()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn publish(&self, event: OrderEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_tagged_kind() {
        let event = OrderEvent::Paid {
            order_id: "o1".into(),
            order_number: "ORD-20260828-0001".into(),
            user_id: "u1".into(),
            total_cents: 12_000,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "paid");
        assert_eq!(json["total_cents"], 12_000);
        assert_eq!(event.kind(), "paid");
        assert_eq!(event.order_id(), "o1");
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::default();
        sink.publish(OrderEvent::Created {
            order_id: "o1".into(),
            order_number: "ORD-20260828-0001".into(),
            user_id: "u1".into(),
            total_cents: 100,
        });
        sink.publish(OrderEvent::Cancelled {
            order_id: "o1".into(),
            order_number: "ORD-20260828-0001".into(),
            user_id: "u1".into(),
        });

        assert_eq!(sink.kinds(), vec!["created", "cancelled"]);
    }
}
