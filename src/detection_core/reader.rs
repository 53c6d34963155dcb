//! Asynchronous JSONL trade event reader with skip-and-continue on bad records

use super::event_store::IngestError;
use super::normalizer::TradeEvent;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Events read from one export plus the number of skipped lines
#[derive(Debug, Default)]
pub struct JsonlLoad {
    pub events: Vec<TradeEvent>,
    pub skipped: usize,
}

pub struct JsonlEventReader {
    path: PathBuf,
}

impl JsonlEventReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read every record; malformed lines are logged and skipped
    pub async fn read_all(&self) -> Result<JsonlLoad, IngestError> {
        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut load = JsonlLoad::default();
        let mut line_no = 0usize;

        log::info!("📖 Reading trade events: {}", self.path.display());

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match TradeEvent::from_jsonl(line) {
                Ok(event) => load.events.push(event),
                Err(e) => {
                    log::warn!("Skipping malformed record at line {}: {}", line_no, e);
                    load.skipped += 1;
                }
            }
        }

        log::info!(
            "📥 Loaded {} events ({} skipped) from {}",
            load.events.len(),
            load.skipped,
            self.path.display()
        );

        Ok(load)
    }
}
