// MongoDB-backed update sink and connection health monitor
use crate::gate::HealthFlag;
use crate::sink::{UpdateOutcome, UpdateSink};
use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::{Client, Collection};
use std::time::Duration;
use tagmirror_common::Result;
use tokio::time::interval;
use tracing::{info, warn};

pub struct MongoUpdateSink {
    collection: Collection<Document>,
}

impl MongoUpdateSink {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl UpdateSink for MongoUpdateSink {
    /// Single-document `$set` keyed by the identity from the message itself.
    /// Not an upsert: a key that matches nothing is a silent no-op.
    async fn apply(&self, key: &Document, fields: &Document) -> Result<UpdateOutcome> {
        let result = self
            .collection
            .update_one(key.clone(), doc! { "$set": fields.clone() })
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }
}

/// Periodically pings the server and maintains the health flag consumed by
/// the ingest gate, so datagrams are dropped while the link is down.
pub struct MongoHealthMonitor {
    client: Client,
    database: String,
    flag: HealthFlag,
    check_interval: Duration,
}

impl MongoHealthMonitor {
    pub fn new(client: Client, database: String, flag: HealthFlag, check_interval: Duration) -> Self {
        Self {
            client,
            database,
            flag,
            check_interval,
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.check_interval);
        // Startup verified the link before spawning this task.
        let mut connected = true;
        loop {
            ticker.tick().await;
            match self
                .client
                .database(&self.database)
                .run_command(doc! { "ping": 1 })
                .await
            {
                Ok(_) => {
                    if !connected {
                        info!("Database link restored");
                    }
                    connected = true;
                    self.flag.set_connected(true);
                }
                Err(e) => {
                    if connected {
                        warn!(error = %e, "Database link lost");
                    }
                    connected = false;
                    self.flag.set_connected(false);
                }
            }
        }
    }
}
