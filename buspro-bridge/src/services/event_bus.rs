use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

const CHANNEL_CAPACITY: usize = 100;

/// Lazily created broadcast channel per key
pub struct EventBus<K, V> {
    publishers: Arc<RwLock<HashMap<K, broadcast::Sender<V>>>>,
}

impl<K, V> EventBus<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            publishers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Delivers `payload` to every receiver of `key`, returns how many got it
    pub async fn publish(&self, key: K, payload: V) -> Result<usize, broadcast::error::SendError<V>> {
        let sender = {
            let mut publishers = self.publishers.write().await;
            publishers
                .entry(key)
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .clone()
        };

        sender.send(payload)
    }

    pub async fn subscribe(&self, key: K) -> broadcast::Receiver<V> {
        let sender = {
            let mut publishers = self.publishers.write().await;
            publishers
                .entry(key)
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .clone()
        };

        sender.subscribe()
    }

}

impl<K, V> Default for EventBus<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for EventBus<K, V> {
    fn clone(&self) -> Self {
        Self {
            publishers: self.publishers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let event_bus = EventBus::<u8, u8>::new();

        let mut receiver1 = event_bus.subscribe(1).await;
        let mut receiver2 = event_bus.subscribe(1).await;

        let receiver_count = event_bus.publish(1, 42).await.unwrap();
        assert_eq!(receiver_count, 2);

        assert_eq!(receiver1.recv().await.unwrap(), 42);
        assert_eq!(receiver2.recv().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let event_bus = EventBus::<u8, u8>::new();

        let mut receiver1 = event_bus.subscribe(1).await;
        let mut receiver2 = event_bus.subscribe(2).await;

        event_bus.publish(2, 20).await.unwrap();
        event_bus.publish(1, 10).await.unwrap();

        assert_eq!(receiver1.recv().await.unwrap(), 10);
        assert_eq!(receiver2.recv().await.unwrap(), 20);
        assert!(receiver1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let event_bus = EventBus::<u8, u8>::new();

        assert!(event_bus.publish(5, 1).await.is_err());
    }
}
