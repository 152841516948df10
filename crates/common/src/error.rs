//! Error types for QuoteHarvest storage and export

use thiserror::Error;

/// Result type alias using the QuoteHarvest common Error
pub type Result<T> = std::result::Result<T, Error>;

/// QuoteHarvest common error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown quote field: {0}")]
    UnknownField(String),

    #[error("Age {age} outside supported range {min}..={max}")]
    AgeOutOfRange { age: u32, min: u32, max: u32 },

    #[error("Corrupt stored record: {0}")]
    CorruptRecord(String),

    #[error("Export error: {0}")]
    Export(String),
}
