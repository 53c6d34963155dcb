//! SQLite-backed event store over the cleaned `trade_events` table
//!
//! Opened read-only; the ingestion side owns writes.

use super::event_store::{EventStore, IngestError};
use super::normalizer::{RawTradeRecord, TradeEvent};
use crate::sqlite_pragma::apply_optimized_pragmas;
use rusqlite::{Connection, Params, Row};
use std::path::Path;

/// Schema expected by the reader
pub const TRADE_EVENTS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS trade_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    signer TEXT,
    timestamp_ms INTEGER,
    slot INTEGER,
    pool_id TEXT,
    token_in TEXT,
    token_out TEXT,
    validator TEXT,
    oracle_burst INTEGER,
    signature TEXT
);
CREATE INDEX IF NOT EXISTS idx_trade_events_time ON trade_events(timestamp_ms, slot);
CREATE INDEX IF NOT EXISTS idx_trade_events_signer ON trade_events(signer, timestamp_ms);";

const SELECT_COLUMNS: &str = "SELECT signer, timestamp_ms, slot, pool_id, token_in, token_out,
        validator, oracle_burst, signature
 FROM trade_events";

pub struct SqliteEventStore {
    conn: Connection,
}

fn raw_from_row(row: &Row<'_>) -> rusqlite::Result<RawTradeRecord> {
    let slot: Option<i64> = row.get(2)?;
    Ok(RawTradeRecord {
        signer: row.get(0)?,
        timestamp_ms: row.get(1)?,
        slot: slot.and_then(|s| u64::try_from(s).ok()),
        pool_id: row.get(3)?,
        token_in: row.get(4)?,
        token_out: row.get(5)?,
        validator: row.get(6)?,
        oracle_burst_in_window: row.get(7)?,
        signature: row.get(8)?,
    })
}

impl SqliteEventStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let conn = Connection::open(db_path.as_ref())?;

        apply_optimized_pragmas(&conn)?;

        // Must come after the PRAGMAs
        conn.execute_batch("PRAGMA query_only = ON")?;

        log::info!("📥 SQLite event store opened: {}", db_path.as_ref().display());

        Ok(Self { conn })
    }

    fn query(&self, filter: &str, params: impl Params) -> Result<Vec<TradeEvent>, IngestError> {
        let sql = format!(
            "{} {} ORDER BY timestamp_ms ASC, slot ASC, id ASC",
            SELECT_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, raw_from_row)?;

        let mut events = Vec::new();
        let mut skipped = 0usize;
        for row in rows {
            match TradeEvent::try_from(row?) {
                Ok(event) => events.push(event),
                Err(e) => {
                    log::warn!("Skipping malformed trade_events row: {}", e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} malformed rows", skipped);
        }
        log::debug!("📥 Read {} events", events.len());

        Ok(events)
    }
}

impl EventStore for SqliteEventStore {
    fn all_events(&self) -> Result<Vec<TradeEvent>, IngestError> {
        self.query("", [])
    }

    fn events_in_range(&self, start_ms: i64, end_ms: i64) -> Result<Vec<TradeEvent>, IngestError> {
        self.query("WHERE timestamp_ms BETWEEN ?1 AND ?2", [start_ms, end_ms])
    }

    fn events_by_signer(
        &self,
        signer: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<TradeEvent>, IngestError> {
        self.query(
            "WHERE signer = ?1 AND timestamp_ms BETWEEN ?2 AND ?3",
            rusqlite::params![signer, start_ms, end_ms],
        )
    }

    fn count(&self) -> Result<usize, IngestError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trade_events", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::tempdir;

    fn setup_test_db() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("events.db");

        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch(TRADE_EVENTS_SCHEMA).unwrap();

        let rows: [(Option<&str>, Option<i64>, &str, &str); 5] = [
            (Some("A"), Some(1150), "PUMP", "WSOL"),
            (Some("A"), Some(1000), "WSOL", "PUMP"),
            (Some("V1"), Some(1050), "WSOL", "PUMP"),
            (None, Some(1100), "WSOL", "PUMP"),
            (Some("V2"), None, "WSOL", "PUMP"),
        ];
        for (signer, ts, token_in, token_out) in rows {
            conn.execute(
                "INSERT INTO trade_events (signer, timestamp_ms, slot, pool_id, token_in, token_out, oracle_burst)
                 VALUES (?1, ?2, 7, 'P1', ?3, ?4, 1)",
                params![signer, ts, token_in, token_out],
            )
            .unwrap();
        }

        (dir, db_path)
    }

    #[test]
    fn test_all_events_ordered_and_filtered() {
        let (_dir, db_path) = setup_test_db();
        let store = SqliteEventStore::new(&db_path).unwrap();

        let events = store.all_events().unwrap();
        // rows without signer or timestamp never surface
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].timestamp_ms, 1000);
        assert_eq!(events[2].timestamp_ms, 1150);
        assert_eq!(events[0].slot, 7);
        assert_eq!(events[0].oracle_burst_in_window, Some(true));
        assert_eq!(store.count().unwrap(), 5);
    }

    #[test]
    fn test_range_queries() {
        let (_dir, db_path) = setup_test_db();
        let store = SqliteEventStore::new(&db_path).unwrap();

        assert_eq!(store.events_in_range(1000, 1050).unwrap().len(), 2);
        assert_eq!(store.events_by_signer("A", 0, 2000).unwrap().len(), 2);
        assert_eq!(store.events_by_signer("A", 1100, 2000).unwrap().len(), 1);
    }

    #[test]
    fn test_read_only_mode() {
        let (_dir, db_path) = setup_test_db();
        let store = SqliteEventStore::new(&db_path).unwrap();

        let result = store.conn.execute(
            "INSERT INTO trade_events (signer, timestamp_ms) VALUES ('x', 1)",
            [],
        );
        assert!(result.is_err());
    }
}
