// Metrics recording for the relay pipeline
use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct MetricsCollector {
    max_datagram_size: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            max_datagram_size: AtomicU64::new(0),
        }
    }

    pub fn record_datagram(&self, size: usize) {
        counter!("tagmirror_datagrams_received_total").increment(1);
        histogram!("tagmirror_datagram_bytes").record(size as f64);

        let size = size as u64;
        let previous = self.max_datagram_size.fetch_max(size, Ordering::Relaxed);
        if size > previous {
            gauge!("tagmirror_datagram_bytes_max").set(size as f64);
        }
    }

    /// Largest datagram seen since startup.
    pub fn max_datagram_size(&self) -> u64 {
        self.max_datagram_size.load(Ordering::Relaxed)
    }

    pub fn record_gate_drop(&self) {
        counter!("tagmirror_datagrams_gated_total").increment(1);
    }

    pub fn record_queue_depth(&self, depth: usize) {
        gauge!("tagmirror_queue_depth").set(depth as f64);
    }

    pub fn record_queue_overflow(&self) {
        counter!("tagmirror_queue_overflow_total").increment(1);
    }

    pub fn record_applied(&self) {
        counter!("tagmirror_updates_applied_total").increment(1);
    }

    pub fn record_ignored(&self) {
        counter!("tagmirror_messages_ignored_total").increment(1);
    }

    pub fn record_malformed(&self) {
        counter!("tagmirror_messages_malformed_total").increment(1);
    }

    pub fn record_failed(&self) {
        counter!("tagmirror_updates_failed_total").increment(1);
    }

    pub fn record_drain_latency(&self, millis: f64) {
        histogram!("tagmirror_drain_pass_ms").record(millis);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
