use tokio::sync::broadcast;

use crate::events::ChainEvent;

/// Thin wrapper over a `tokio::sync::broadcast` channel: the host application
/// channel every component publishes `ChainEvent`s onto. Subscribers receive
/// every event published after they subscribe; a lagging subscriber skips
/// ahead rather than blocking the publisher.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes `event` to every current subscriber. Delivery is synchronous
    /// with respect to the caller: this returns once every subscriber's queue
    /// has the event, not once they've processed it.
    pub fn publish(&self, event: ChainEvent) {
        // No active subscribers is not an error: events are fire-and-forget.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use std::sync::Arc;

    fn block() -> Arc<Block> {
        Arc::new(Block {
            id: "b".into(),
            height: 1,
            previous_block_id: None,
            timestamp: 0,
            generator_public_key: String::new(),
            block_signature: String::new(),
            payload_hash: Block::compute_payload_hash(&[]),
            payload_length: 0,
            number_of_transactions: 0,
            total_amount: 0,
            total_fee: 0,
            reward: 0,
            transactions: Vec::new(),
        })
    }

    #[tokio::test]
    async fn published_events_reach_every_subscriber() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(ChainEvent::NewBlock(block()));

        assert!(matches!(a.recv().await.unwrap(), ChainEvent::NewBlock(_)));
        assert!(matches!(b.recv().await.unwrap(), ChainEvent::NewBlock(_)));
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_error() {
        let bus = EventBus::new(8);
        bus.publish(ChainEvent::TransactionsChanged);
    }
}
