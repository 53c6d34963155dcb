//! Flat CSV export of classification results

use super::result::ClassificationResult;
use super::writer_backend::{ResultWriterBackend, ResultWriterError};
use async_trait::async_trait;
use csv::WriterBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const CSV_FILE_NAME: &str = "classifications.csv";

const HEADER: [&str; 22] = [
    "attacker_signer",
    "victim_signers",
    "victim_count",
    "window_size_ms",
    "window_label",
    "start_timestamp_ms",
    "end_timestamp_ms",
    "span_ms",
    "start_slot",
    "end_slot",
    "total_trades",
    "attacker_trade_count",
    "attack_type",
    "confidence",
    "pattern_confidence",
    "confidence_level",
    "fat_sandwich_score",
    "multi_hop_score",
    "token_pairs_used",
    "unique_pools",
    "is_cycle",
    "oracle_correlated",
];

pub struct ClassificationCsvWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    written: usize,
}

impl ClassificationCsvWriter {
    /// `base_path` is a directory; the file inside it is `classifications.csv`
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self, ResultWriterError> {
        std::fs::create_dir_all(base_path.as_ref())?;
        let path = base_path.as_ref().join(CSV_FILE_NAME);

        let mut writer = WriterBuilder::new().has_headers(true).from_path(&path)?;
        writer.write_record(HEADER)?;

        log::info!("📝 Writing classifications to: {}", path.display());

        Ok(Self {
            path,
            writer,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_result(&mut self, r: &ClassificationResult) -> Result<(), ResultWriterError> {
        self.writer.write_record(&[
            r.attacker_signer.clone(),
            r.victim_signers.join(";"),
            r.victim_count.to_string(),
            r.window_size_ms.to_string(),
            r.window_label.clone(),
            r.start_timestamp_ms.to_string(),
            r.end_timestamp_ms.to_string(),
            r.span_ms.to_string(),
            r.start_slot.to_string(),
            r.end_slot.to_string(),
            r.total_trades.to_string(),
            r.attacker_trade_count.to_string(),
            r.attack_type.as_str().to_string(),
            format!("{:.4}", r.confidence),
            format!("{:.4}", r.pattern_confidence),
            r.confidence_level.as_str().to_string(),
            format!("{:.4}", r.fat_sandwich_score),
            format!("{:.4}", r.multi_hop_score),
            r.token_pairs_used.to_string(),
            r.unique_pools.to_string(),
            r.is_cycle.to_string(),
            r.oracle_correlated.to_string(),
        ])?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ResultWriterError> {
        self.writer.flush()?;
        log::debug!("✅ Flushed {} classifications to CSV", self.written);
        Ok(())
    }
}

#[async_trait]
impl ResultWriterBackend for ClassificationCsvWriter {
    async fn write_result(
        &mut self,
        result: &ClassificationResult,
    ) -> Result<(), ResultWriterError> {
        ClassificationCsvWriter::write_result(self, result)
    }

    async fn flush(&mut self) -> Result<(), ResultWriterError> {
        ClassificationCsvWriter::flush(self)
    }

    fn backend_type(&self) -> &'static str {
        "CSV"
    }
}
