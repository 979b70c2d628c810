use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

pub mod outbox;

/// Domain events emitted by the checkout and order services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    FrameOrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Checkout / payment events
    CheckoutStarted {
        intent_id: Uuid,
        gateway_order_id: String,
    },
    CheckoutCancelled(Uuid),
    PaymentVerified {
        gateway_order_id: String,
    },
    PaymentVerificationFailed {
        gateway_order_id: String,
    },

    // Reconciliation events
    ReconciliationQueued {
        gateway_order_id: String,
    },
    ReconciliationReplayed {
        gateway_order_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consume domain events and surface them as structured log lines.
///
/// Webhook fan-out and analytics hang off this consumer; the core only
/// guarantees ordering per sender.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(id) => info!(order_id = %id, "order created"),
            Event::FrameOrderCreated(id) => info!(frame_order_id = %id, "frame order created"),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(%order_id, %old_status, %new_status, "order status changed"),
            Event::CheckoutStarted {
                intent_id,
                gateway_order_id,
            } => info!(%intent_id, %gateway_order_id, "checkout started"),
            Event::CheckoutCancelled(id) => info!(intent_id = %id, "checkout cancelled"),
            Event::PaymentVerified { gateway_order_id } => {
                info!(%gateway_order_id, "payment verified")
            }
            Event::PaymentVerificationFailed { gateway_order_id } => {
                warn!(%gateway_order_id, "payment verification failed")
            }
            Event::ReconciliationQueued { gateway_order_id } => {
                warn!(%gateway_order_id, "verified payment queued for reconciliation")
            }
            Event::ReconciliationReplayed { gateway_order_id } => {
                info!(%gateway_order_id, "reconciled payment replayed into an order")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let id = Uuid::new_v4();
        sender.send(Event::OrderCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::CheckoutCancelled(Uuid::new_v4())).await.is_err());
    }
}
