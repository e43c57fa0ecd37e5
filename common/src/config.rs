// Relay configuration loaded from TAGMIRROR_* environment variables
use crate::error::{Result, TagMirrorError};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub udp_bind_addr: String,
    pub udp_port: u16,
    pub mongo_url: String,
    pub mongo_database: String,
    pub mongo_collection: String,
    pub drain_interval_ms: u64,
    pub queue_capacity: usize,
    pub update_timeout_ms: u64,
    pub health_interval_ms: u64,
    pub start_active: bool,
    /// Prometheus scrape address; metrics stay process-internal when unset.
    pub metrics_addr: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            udp_bind_addr: "0.0.0.0".to_string(),
            udp_port: 12345,
            mongo_url: "mongodb://localhost:27017".to_string(),
            mongo_database: "tagmirror".to_string(),
            mongo_collection: "realtimeData".to_string(),
            drain_interval_ms: 100,
            queue_capacity: 10_000,
            update_timeout_ms: 5_000,
            health_interval_ms: 1_000,
            start_active: true,
            metrics_addr: None,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            udp_bind_addr: env_or("TAGMIRROR_UDP_BIND", defaults.udp_bind_addr),
            udp_port: parse_env("TAGMIRROR_UDP_PORT", defaults.udp_port)?,
            mongo_url: env_or("TAGMIRROR_MONGO_URL", defaults.mongo_url),
            mongo_database: env_or("TAGMIRROR_MONGO_DATABASE", defaults.mongo_database),
            mongo_collection: env_or("TAGMIRROR_MONGO_COLLECTION", defaults.mongo_collection),
            drain_interval_ms: parse_env("TAGMIRROR_DRAIN_INTERVAL_MS", defaults.drain_interval_ms)?,
            queue_capacity: parse_env("TAGMIRROR_QUEUE_CAPACITY", defaults.queue_capacity)?,
            update_timeout_ms: parse_env("TAGMIRROR_UPDATE_TIMEOUT_MS", defaults.update_timeout_ms)?,
            health_interval_ms: parse_env("TAGMIRROR_HEALTH_INTERVAL_MS", defaults.health_interval_ms)?,
            start_active: parse_env("TAGMIRROR_START_ACTIVE", defaults.start_active)?,
            metrics_addr: std::env::var("TAGMIRROR_METRICS_ADDR").ok(),
        })
    }

    pub fn udp_socket_addr(&self) -> String {
        format!("{}:{}", self.udp_bind_addr, self.udp_port)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| TagMirrorError::ConfigError(format!("{}={}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}
