//! Unified writer interface for classification results
//!
//! Routes writes to the JSONL, CSV or SQLite backend based on configuration.

use super::csv_writer::ClassificationCsvWriter;
use super::jsonl_writer::ClassificationJsonlWriter;
use super::result::ClassificationResult;
use super::sqlite_writer::ClassificationSqliteWriter;
use super::window::WindowSize;
use super::writer_backend::{ResultWriterBackend, ResultWriterError};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    #[default]
    Jsonl,
    Csv,
    Sqlite,
}

impl BackendType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "jsonl" => Some(BackendType::Jsonl),
            "csv" => Some(BackendType::Csv),
            "sqlite" => Some(BackendType::Sqlite),
            _ => None,
        }
    }

    /// Output location used when none is given
    pub fn default_output(&self) -> PathBuf {
        match self {
            BackendType::Jsonl | BackendType::Csv => PathBuf::from("streams/classifications"),
            BackendType::Sqlite => PathBuf::from("data/sandwatch.db"),
        }
    }
}

/// Unified writer that routes to one of the result backends
pub enum ResultWriter {
    Jsonl(ClassificationJsonlWriter),
    Csv(ClassificationCsvWriter),
    Sqlite(ClassificationSqliteWriter),
}

impl ResultWriter {
    /// Create a writer; `base_path` is a directory for JSONL/CSV and a database file for SQLite
    pub fn new(
        backend: BackendType,
        base_path: PathBuf,
        windows: &[WindowSize],
    ) -> Result<Self, ResultWriterError> {
        match backend {
            BackendType::Jsonl => {
                let writer = ClassificationJsonlWriter::new(base_path, windows)?;
                Ok(ResultWriter::Jsonl(writer))
            }
            BackendType::Csv => {
                let writer = ClassificationCsvWriter::new(base_path)?;
                Ok(ResultWriter::Csv(writer))
            }
            BackendType::Sqlite => {
                let writer = ClassificationSqliteWriter::new(base_path)?;
                Ok(ResultWriter::Sqlite(writer))
            }
        }
    }

    fn backend(&mut self) -> &mut dyn ResultWriterBackend {
        match self {
            ResultWriter::Jsonl(w) => w,
            ResultWriter::Csv(w) => w,
            ResultWriter::Sqlite(w) => w,
        }
    }

    pub async fn write_result(
        &mut self,
        result: &ClassificationResult,
    ) -> Result<(), ResultWriterError> {
        self.backend().write_result(result).await
    }

    /// Write every result then flush
    pub async fn write_all(
        &mut self,
        results: &[ClassificationResult],
    ) -> Result<usize, ResultWriterError> {
        for result in results {
            self.write_result(result).await?;
        }
        self.flush().await?;
        Ok(results.len())
    }

    pub async fn flush(&mut self) -> Result<(), ResultWriterError> {
        self.backend().flush().await
    }

    pub fn backend_type(&self) -> &'static str {
        match self {
            ResultWriter::Jsonl(_) => "JSONL",
            ResultWriter::Csv(_) => "CSV",
            ResultWriter::Sqlite(_) => "SQLite",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!(BackendType::from_str("jsonl"), Some(BackendType::Jsonl));
        assert_eq!(BackendType::from_str("CSV"), Some(BackendType::Csv));
        assert_eq!(BackendType::from_str("sqlite"), Some(BackendType::Sqlite));
        assert_eq!(BackendType::from_str("parquet"), None);
        assert_eq!(BackendType::default(), BackendType::Jsonl);
    }

    #[tokio::test]
    async fn test_routes_to_backend() {
        let dir = tempfile::tempdir().unwrap();

        let writer = ResultWriter::new(
            BackendType::Sqlite,
            dir.path().join("out.db"),
            &WindowSize::defaults(),
        )
        .unwrap();
        assert_eq!(writer.backend_type(), "SQLite");

        let mut writer =
            ResultWriter::new(BackendType::Csv, dir.path().join("csv"), &WindowSize::defaults())
                .unwrap();
        assert_eq!(writer.write_all(&[]).await.unwrap(), 0);
        assert!(dir.path().join("csv").join("classifications.csv").exists());
    }
}
