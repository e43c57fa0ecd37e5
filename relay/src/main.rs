// TagMirror relay - mirrors real-time data updates forwarded by a peer
// installation into the local collection
use dotenvy::dotenv;
use mongodb::bson::{doc, Document};
use mongodb::Client;
use std::sync::Arc;
use std::time::Duration;
use tagmirror_common::{MetricsCollector, RelayConfig};
use tagmirror_relay::drain::DrainLoop;
use tagmirror_relay::gate::{ActivationFlag, HealthFlag, IngestGate};
use tagmirror_relay::mongo::{MongoHealthMonitor, MongoUpdateSink};
use tagmirror_relay::queue::PendingQueue;
use tagmirror_relay::udp::UdpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tagmirror_relay=info,tagmirror_common=info".to_string()),
        )
        .init();

    info!("Starting TagMirror relay v{}", env!("CARGO_PKG_VERSION"));

    let config = RelayConfig::from_env()?;

    if let Some(addr) = &config.metrics_addr {
        let addr: std::net::SocketAddr = addr.parse()?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus metrics available at http://{}/metrics", addr);
    }

    // The relay only starts accepting traffic once the database link is up.
    let client = Client::with_uri_str(&config.mongo_url).await?;
    client
        .database(&config.mongo_database)
        .run_command(doc! { "ping": 1 })
        .await?;
    info!("Connected to MongoDB database '{}'", config.mongo_database);

    let collection = client
        .database(&config.mongo_database)
        .collection::<Document>(&config.mongo_collection);

    let metrics = Arc::new(MetricsCollector::new());
    let queue = Arc::new(PendingQueue::new(config.queue_capacity, metrics.clone()));

    // Standalone deployments run active; a redundancy coordinator can hold
    // this handle and flip it on failover.
    let activation = ActivationFlag::new(config.start_active);
    let health = HealthFlag::new(true);

    let monitor = MongoHealthMonitor::new(
        client.clone(),
        config.mongo_database.clone(),
        health.clone(),
        Duration::from_millis(config.health_interval_ms),
    );
    tokio::spawn(monitor.run());

    let gate = IngestGate::new(Arc::new(activation), Arc::new(health));
    let listener = UdpListener::bind(
        &config.udp_socket_addr(),
        gate,
        queue.clone(),
        metrics.clone(),
    )
    .await?;

    let sink = Arc::new(MongoUpdateSink::new(collection));
    let drain = Arc::new(DrainLoop::new(
        queue.clone(),
        sink,
        Duration::from_millis(config.drain_interval_ms),
        Duration::from_millis(config.update_timeout_ms),
        metrics,
    ));

    let drain_task = {
        let drain = drain.clone();
        tokio::spawn(async move { drain.run().await })
    };
    let listener_task = tokio::spawn(listener.run());

    tokio::select! {
        result = listener_task => {
            match result {
                Ok(Err(e)) => error!(error = %e, "Listener terminated"),
                Ok(Ok(())) => warn!("Listener exited"),
                Err(e) => error!(error = %e, "Listener task failed"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    // Flush whatever is still queued before going down.
    drain_task.abort();
    let stats = drain.drain_once().await;
    if stats.total() > 0 {
        info!(
            applied = stats.applied,
            failed = stats.failed,
            "Final drain pass complete"
        );
    }

    Ok(())
}
