//! SQLite writer for classification results
//!
//! Results are batched and committed in one transaction per flush.

use super::result::ClassificationResult;
use super::writer_backend::{ResultWriterBackend, ResultWriterError};
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;

const BATCH_SIZE: usize = 500;

pub struct ClassificationSqliteWriter {
    conn: Connection,
    batch: Vec<ClassificationResult>,
    batch_size: usize,
}

impl ClassificationSqliteWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, ResultWriterError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path.as_ref())?;
        apply_optimized_pragmas(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS classifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attacker_signer TEXT NOT NULL,
                victim_signers TEXT NOT NULL,
                victim_count INTEGER NOT NULL,
                window_size_ms INTEGER NOT NULL,
                window_label TEXT NOT NULL,
                start_timestamp_ms INTEGER NOT NULL,
                end_timestamp_ms INTEGER NOT NULL,
                span_ms INTEGER NOT NULL,
                start_slot INTEGER NOT NULL,
                end_slot INTEGER NOT NULL,
                total_trades INTEGER NOT NULL,
                attacker_trade_count INTEGER NOT NULL,
                attack_type TEXT NOT NULL,
                confidence REAL NOT NULL,
                pattern_confidence REAL NOT NULL,
                confidence_level TEXT NOT NULL,
                fat_sandwich_score REAL NOT NULL,
                multi_hop_score REAL NOT NULL,
                token_pairs_used INTEGER NOT NULL,
                unique_pools INTEGER NOT NULL,
                is_cycle INTEGER NOT NULL,
                oracle_correlated INTEGER NOT NULL,
                UNIQUE(attacker_signer, window_size_ms, start_timestamp_ms, end_timestamp_ms,
                       total_trades)
            );
            CREATE INDEX IF NOT EXISTS idx_classifications_type
                ON classifications(attack_type, start_timestamp_ms);
            CREATE INDEX IF NOT EXISTS idx_classifications_attacker
                ON classifications(attacker_signer, start_timestamp_ms);",
        )?;

        log::info!("✅ SQLite classification store initialized: {}", db_path.as_ref().display());

        Ok(Self {
            conn,
            batch: Vec::with_capacity(BATCH_SIZE),
            batch_size: BATCH_SIZE,
        })
    }

    fn flush_batch(&mut self) -> Result<(), ResultWriterError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            // Replacing on the natural key keeps reruns idempotent. Clusters ending on
            // trades with equal timestamps share their bounds and differ in size.
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO classifications
                 (attacker_signer, victim_signers, victim_count, window_size_ms, window_label,
                  start_timestamp_ms, end_timestamp_ms, span_ms, start_slot, end_slot,
                  total_trades, attacker_trade_count, attack_type, confidence, pattern_confidence,
                  confidence_level, fat_sandwich_score, multi_hop_score, token_pairs_used,
                  unique_pools, is_cycle, oracle_correlated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            )?;

            for r in &self.batch {
                let victims = serde_json::to_string(&r.victim_signers)?;
                stmt.execute(params![
                    r.attacker_signer,
                    victims,
                    r.victim_count as i64,
                    r.window_size_ms as i64,
                    r.window_label,
                    r.start_timestamp_ms,
                    r.end_timestamp_ms,
                    r.span_ms as i64,
                    r.start_slot as i64,
                    r.end_slot as i64,
                    r.total_trades as i64,
                    r.attacker_trade_count as i64,
                    r.attack_type.as_str(),
                    r.confidence,
                    r.pattern_confidence,
                    r.confidence_level.as_str(),
                    r.fat_sandwich_score,
                    r.multi_hop_score,
                    r.token_pairs_used as i64,
                    r.unique_pools as i64,
                    r.is_cycle,
                    r.oracle_correlated,
                ])?;
            }
        }
        tx.commit()?;

        log::debug!("✅ Flushed {} classifications to SQLite", self.batch.len());
        self.batch.clear();

        Ok(())
    }
}

#[async_trait]
impl ResultWriterBackend for ClassificationSqliteWriter {
    async fn write_result(
        &mut self,
        result: &ClassificationResult,
    ) -> Result<(), ResultWriterError> {
        self.batch.push(result.clone());

        if self.batch.len() >= self.batch_size {
            self.flush_batch()?;
        }

        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ResultWriterError> {
        self.flush_batch()
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
