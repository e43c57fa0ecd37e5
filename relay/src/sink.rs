// Seam between the drain loop and the persistent collection
use async_trait::async_trait;
use mongodb::bson::Document;
use tagmirror_common::Result;

/// Match/modify counts reported by the storage layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// Applies a selective field update to the single document matching `key`:
/// only the named fields are set, everything else on the document is left
/// alone, and no document is created when none matches.
#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn apply(&self, key: &Document, fields: &Document) -> Result<UpdateOutcome>;
}
