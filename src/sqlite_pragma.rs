//! Shared SQLite PRAGMA tuning for readers and writers

use rusqlite::Connection;

/// Apply WAL journaling, relaxed sync, in-memory temp store, mmap, page cache
/// and autocheckpoint settings.
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;
         PRAGMA mmap_size = 268435456;
         PRAGMA cache_size = -64000;
         PRAGMA wal_autocheckpoint = 1000;",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pragmas_applied() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("pragma.db")).unwrap();

        apply_optimized_pragmas(&conn).unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
