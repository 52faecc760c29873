use fartmap_common::FartMapError;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored collection is corrupt: {0}")]
    Corrupt(String),

    #[error("Event cannot be stored: {0}")]
    Record(#[from] FartMapError),
}
