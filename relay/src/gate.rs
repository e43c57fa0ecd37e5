// Eligibility gate: only the active instance with a healthy database link
// may accept datagrams
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reports whether this instance is currently the active member of its
/// redundant group.
pub trait ProcessActivation: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Reports whether the target database link is currently usable.
pub trait StoreHealth: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Activation state handle. An external redundancy coordinator holds a clone
/// and flips it on failover; standalone deployments leave it active.
#[derive(Clone)]
pub struct ActivationFlag(Arc<AtomicBool>);

impl ActivationFlag {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }

    pub fn set_active(&self, active: bool) {
        self.0.store(active, Ordering::Relaxed);
    }
}

impl ProcessActivation for ActivationFlag {
    fn is_active(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Database link state handle, maintained by the health monitor.
#[derive(Clone)]
pub struct HealthFlag(Arc<AtomicBool>);

impl HealthFlag {
    pub fn new(connected: bool) -> Self {
        Self(Arc::new(AtomicBool::new(connected)))
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.store(connected, Ordering::Relaxed);
    }
}

impl StoreHealth for HealthFlag {
    fn is_connected(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Combined precondition checked on every datagram, never cached, so
/// failover and reconnect transitions take effect immediately.
#[derive(Clone)]
pub struct IngestGate {
    activation: Arc<dyn ProcessActivation>,
    store_health: Arc<dyn StoreHealth>,
}

impl IngestGate {
    pub fn new(activation: Arc<dyn ProcessActivation>, store_health: Arc<dyn StoreHealth>) -> Self {
        Self {
            activation,
            store_health,
        }
    }

    pub fn is_open(&self) -> bool {
        self.activation.is_active() && self.store_health.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(active: bool, connected: bool) -> IngestGate {
        IngestGate::new(
            Arc::new(ActivationFlag::new(active)),
            Arc::new(HealthFlag::new(connected)),
        )
    }

    #[test]
    fn open_only_when_active_and_connected() {
        assert!(gate(true, true).is_open());
        assert!(!gate(true, false).is_open());
        assert!(!gate(false, true).is_open());
        assert!(!gate(false, false).is_open());
    }

    #[test]
    fn reflects_flag_transitions() {
        let activation = ActivationFlag::new(false);
        let health = HealthFlag::new(true);
        let gate = IngestGate::new(Arc::new(activation.clone()), Arc::new(health.clone()));

        assert!(!gate.is_open());
        activation.set_active(true);
        assert!(gate.is_open());
        health.set_connected(false);
        assert!(!gate.is_open());
    }
}
