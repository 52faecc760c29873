use thiserror::Error;

use crate::codec::CodecError;

#[derive(Error, Debug)]
pub enum FartMapError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Stored event has no coordinates")]
    MissingCoordinates,

    #[error("Stored event has no timestamp")]
    MissingTimestamp,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
