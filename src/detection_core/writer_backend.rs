//! Writer backend trait for classification results
//!
//! Defines the interface for persisting results to different backends.

use super::result::ClassificationResult;
use async_trait::async_trait;

#[derive(Debug)]
pub enum ResultWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Csv(csv::Error),
    Database(String),
}

impl From<std::io::Error> for ResultWriterError {
    fn from(err: std::io::Error) -> Self {
        ResultWriterError::Io(err)
    }
}

impl From<serde_json::Error> for ResultWriterError {
    fn from(err: serde_json::Error) -> Self {
        ResultWriterError::Serialization(err)
    }
}

impl From<csv::Error> for ResultWriterError {
    fn from(err: csv::Error) -> Self {
        ResultWriterError::Csv(err)
    }
}

impl From<rusqlite::Error> for ResultWriterError {
    fn from(err: rusqlite::Error) -> Self {
        ResultWriterError::Database(err.to_string())
    }
}

impl std::fmt::Display for ResultWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultWriterError::Io(e) => write!(f, "IO error: {}", e),
            ResultWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ResultWriterError::Csv(e) => write!(f, "CSV error: {}", e),
            ResultWriterError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ResultWriterError {}

/// Backend trait for writing classification results
#[async_trait]
pub trait ResultWriterBackend: Send {
    /// Write a single classification result
    async fn write_result(
        &mut self,
        result: &ClassificationResult,
    ) -> Result<(), ResultWriterError>;

    /// Flush pending writes to storage
    async fn flush(&mut self) -> Result<(), ResultWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
