// Error types for TagMirror services
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagMirrorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("MongoDB error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Storage update timed out after {0} ms")]
    StorageTimeout(u64),
}

pub type Result<T> = std::result::Result<T, TagMirrorError>;
