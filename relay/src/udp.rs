// UDP listener: receives change notifications and enqueues raw payloads
use crate::gate::IngestGate;
use crate::queue::PendingQueue;
use std::net::SocketAddr;
use std::sync::Arc;
use tagmirror_common::{MetricsCollector, Result};
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Upper bound of an IPv4 UDP payload; one message per datagram, no
/// fragmentation or reassembly.
const MAX_DATAGRAM: usize = 65_535;

pub struct UdpListener {
    socket: UdpSocket,
    gate: IngestGate,
    queue: Arc<PendingQueue>,
    metrics: Arc<MetricsCollector>,
}

impl UdpListener {
    /// Bind the configured endpoint. Bind failure is fatal: the listener
    /// cannot run degraded.
    pub async fn bind(
        addr: &str,
        gate: IngestGate,
        queue: Arc<PendingQueue>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening for change notifications on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            gate,
            queue,
            metrics,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive datagrams until a socket error, which terminates the listener.
    /// Nothing is ever sent back to the sender.
    pub async fn run(self) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, peer) = self.socket.recv_from(&mut buf).await?;

            // Standby or disconnected states drop datagrams without parsing;
            // the peer re-sends on its own change-stream semantics.
            if !self.gate.is_open() {
                self.metrics.record_gate_drop();
                debug!(%peer, len, "gate closed, dropping datagram");
                continue;
            }

            self.metrics.record_datagram(len);
            debug!(%peer, len, "datagram enqueued");
            self.queue.enqueue(buf[..len].to_vec()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{ActivationFlag, HealthFlag};
    use std::time::Duration;
    use tokio::task::JoinHandle;

    async fn spawn_listener(
        gate: IngestGate,
    ) -> (SocketAddr, Arc<PendingQueue>, JoinHandle<Result<()>>) {
        let metrics = Arc::new(MetricsCollector::new());
        let queue = Arc::new(PendingQueue::new(16, metrics.clone()));
        let listener = UdpListener::bind("127.0.0.1:0", gate, queue.clone(), metrics)
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(listener.run());
        (addr, queue, handle)
    }

    async fn wait_for_len(queue: &PendingQueue, expected: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while queue.len().await < expected {
            assert!(
                tokio::time::Instant::now() < deadline,
                "queue never reached {} entries",
                expected
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn enqueues_when_gate_open() {
        let gate = IngestGate::new(
            Arc::new(ActivationFlag::new(true)),
            Arc::new(HealthFlag::new(true)),
        );
        let (addr, queue, handle) = spawn_listener(gate).await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"payload", addr).await.unwrap();

        wait_for_len(&queue, 1).await;
        assert_eq!(queue.dequeue().await.unwrap(), b"payload");
        handle.abort();
    }

    #[tokio::test]
    async fn gate_closed_drops_datagrams() {
        let gate = IngestGate::new(
            Arc::new(ActivationFlag::new(false)),
            Arc::new(HealthFlag::new(true)),
        );
        let (addr, queue, handle) = spawn_listener(gate).await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"dropped", addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(queue.is_empty().await);
        handle.abort();
    }

    #[tokio::test]
    async fn gate_is_reevaluated_per_datagram() {
        let activation = ActivationFlag::new(false);
        let health = HealthFlag::new(true);
        let gate = IngestGate::new(Arc::new(activation.clone()), Arc::new(health));
        let (addr, queue, handle) = spawn_listener(gate).await;

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"standby", addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Failover: the very next datagram must be accepted.
        activation.set_active(true);
        sender.send_to(b"active", addr).await.unwrap();

        wait_for_len(&queue, 1).await;
        assert_eq!(queue.dequeue().await.unwrap(), b"active");
        handle.abort();
    }
}
