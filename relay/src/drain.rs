// Timer-driven drain loop: decode, normalize, and apply queued messages
use crate::queue::PendingQueue;
use crate::sink::UpdateSink;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tagmirror_common::{decode, Decoded, MetricsCollector, TagMirrorError};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, warn};

/// Per-pass outcome counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub applied: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub failed: usize,
}

impl DrainStats {
    pub fn total(&self) -> usize {
        self.applied + self.ignored + self.malformed + self.failed
    }
}

pub struct DrainLoop {
    queue: Arc<PendingQueue>,
    sink: Arc<dyn UpdateSink>,
    tick_interval: Duration,
    update_timeout: Duration,
    metrics: Arc<MetricsCollector>,
}

impl DrainLoop {
    pub fn new(
        queue: Arc<PendingQueue>,
        sink: Arc<dyn UpdateSink>,
        tick_interval: Duration,
        update_timeout: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            queue,
            sink,
            tick_interval,
            update_timeout,
            metrics,
        }
    }

    /// Run forever. Ticks cannot overlap: the next tick is awaited only
    /// after the current pass has returned.
    pub async fn run(&self) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let started = Instant::now();
            let stats = self.drain_once().await;
            if stats.total() > 0 {
                self.metrics
                    .record_drain_latency(started.elapsed().as_secs_f64() * 1000.0);
                debug!(
                    applied = stats.applied,
                    ignored = stats.ignored,
                    malformed = stats.malformed,
                    failed = stats.failed,
                    "drain pass complete"
                );
            }
        }
    }

    /// Empty the queue, processing strictly in arrival order, one item at a
    /// time. Every failure is contained to its item; the remaining queue is
    /// always processed.
    pub async fn drain_once(&self) -> DrainStats {
        let mut stats = DrainStats::default();
        while let Some(raw) = self.queue.dequeue().await {
            self.process_one(&raw, &mut stats).await;
        }
        stats
    }

    async fn process_one(&self, raw: &[u8], stats: &mut DrainStats) {
        match decode(raw) {
            Decoded::Malformed(reason) => {
                warn!(%reason, "discarding malformed message");
                self.metrics.record_malformed();
                stats.malformed += 1;
            }
            Decoded::Ignored => {
                // Not a source data update; expected and frequent.
                self.metrics.record_ignored();
                stats.ignored += 1;
            }
            Decoded::Recognized(mut envelope) => {
                envelope.normalize_timestamps();
                let update = self
                    .sink
                    .apply(&envelope.document_key, &envelope.updated_fields);
                match timeout(self.update_timeout, update).await {
                    Ok(Ok(outcome)) => {
                        if outcome.matched == 0 {
                            // Updates never create documents; an unknown key
                            // is a silent no-op.
                            debug!(key = ?envelope.document_key, "no matching document");
                        }
                        self.metrics.record_applied();
                        stats.applied += 1;
                    }
                    Ok(Err(e)) => {
                        error!(error = %e, key = ?envelope.document_key, "update failed, message dropped");
                        self.metrics.record_failed();
                        stats.failed += 1;
                    }
                    Err(_) => {
                        let e = TagMirrorError::StorageTimeout(self.update_timeout.as_millis() as u64);
                        error!(error = %e, key = ?envelope.document_key, "message dropped");
                        self.metrics.record_failed();
                        stats.failed += 1;
                    }
                }
            }
        }
    }
}
