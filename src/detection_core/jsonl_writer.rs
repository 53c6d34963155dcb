//! JSONL writer for classification results - one `<window>.jsonl` file per granularity

use super::result::ClassificationResult;
use super::window::WindowSize;
use super::writer_backend::{ResultWriterBackend, ResultWriterError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct ClassificationJsonlWriter {
    base_path: PathBuf,
    writers: HashMap<WindowSize, BufWriter<File>>,
    written: usize,
}

impl ClassificationJsonlWriter {
    /// Files are truncated so a rerun over the same input reproduces the same output
    pub fn new(base_path: impl AsRef<Path>, windows: &[WindowSize]) -> std::io::Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;

        let mut writer = Self {
            base_path,
            writers: HashMap::new(),
            written: 0,
        };
        for &window in windows {
            writer.open_window(window)?;
        }

        Ok(writer)
    }

    pub fn path_for(&self, window: WindowSize) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", window.as_label()))
    }

    fn open_window(&mut self, window: WindowSize) -> std::io::Result<&mut BufWriter<File>> {
        if !self.writers.contains_key(&window) {
            let file_path = self.path_for(window);
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&file_path)?;

            log::info!("📝 Writing classifications to: {}", file_path.display());
            self.writers.insert(window, BufWriter::new(file));
        }

        self.writers
            .get_mut(&window)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "Writer not found"))
    }

    pub fn write_result(&mut self, result: &ClassificationResult) -> Result<(), ResultWriterError> {
        let json = serde_json::to_string(result)?;
        let writer = self.open_window(WindowSize::from_millis(result.window_size_ms))?;
        writeln!(writer, "{}", json)?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        log::debug!("✅ Flushed {} classifications to JSONL", self.written);
        Ok(())
    }
}

impl Drop for ClassificationJsonlWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[async_trait]
impl ResultWriterBackend for ClassificationJsonlWriter {
    async fn write_result(
        &mut self,
        result: &ClassificationResult,
    ) -> Result<(), ResultWriterError> {
        ClassificationJsonlWriter::write_result(self, result)
    }

    async fn flush(&mut self) -> Result<(), ResultWriterError> {
        ClassificationJsonlWriter::flush(self)?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}
