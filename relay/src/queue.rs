// Bounded FIFO buffer between the UDP listener and the drain loop
use std::collections::VecDeque;
use std::sync::Arc;
use tagmirror_common::MetricsCollector;
use tokio::sync::RwLock;
use tracing::warn;

/// Raw payload as received from the network, unparsed.
pub type RawMessage = Vec<u8>;

/// Single producer (listener), single consumer (drain loop). Strictly FIFO:
/// no reordering, no priority, no duplicate suppression.
pub struct PendingQueue {
    inner: RwLock<VecDeque<RawMessage>>,
    capacity: usize,
    metrics: Arc<MetricsCollector>,
}

impl PendingQueue {
    pub fn new(capacity: usize, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            inner: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            metrics,
        }
    }

    /// Append to the tail. At capacity the oldest entry is dropped to make
    /// room, so sustained overload loses the stalest data first.
    pub async fn enqueue(&self, message: RawMessage) {
        let mut inner = self.inner.write().await;
        if inner.len() >= self.capacity {
            inner.pop_front();
            self.metrics.record_queue_overflow();
            warn!(
                capacity = self.capacity,
                "pending queue full, dropping oldest message"
            );
        }
        inner.push_back(message);
        self.metrics.record_queue_depth(inner.len());
    }

    /// Remove and return the head, if any.
    pub async fn dequeue(&self) -> Option<RawMessage> {
        let mut inner = self.inner.write().await;
        let message = inner.pop_front();
        if message.is_some() {
            self.metrics.record_queue_depth(inner.len());
        }
        message
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(capacity: usize) -> PendingQueue {
        PendingQueue::new(capacity, Arc::new(MetricsCollector::new()))
    }

    #[tokio::test]
    async fn preserves_fifo_order() {
        let queue = queue(8);
        queue.enqueue(b"first".to_vec()).await;
        queue.enqueue(b"second".to_vec()).await;
        queue.enqueue(b"third".to_vec()).await;

        assert_eq!(queue.dequeue().await.unwrap(), b"first");
        assert_eq!(queue.dequeue().await.unwrap(), b"second");
        assert_eq!(queue.dequeue().await.unwrap(), b"third");
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn overflow_drops_oldest() {
        let queue = queue(2);
        queue.enqueue(b"a".to_vec()).await;
        queue.enqueue(b"b".to_vec()).await;
        queue.enqueue(b"c".to_vec()).await;

        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.dequeue().await.unwrap(), b"b");
        assert_eq!(queue.dequeue().await.unwrap(), b"c");
    }

    #[tokio::test]
    async fn reports_emptiness() {
        let queue = queue(4);
        assert!(queue.is_empty().await);
        queue.enqueue(b"x".to_vec()).await;
        assert!(!queue.is_empty().await);
        queue.dequeue().await;
        assert!(queue.is_empty().await);
    }
}
