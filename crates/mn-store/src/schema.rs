use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    // Fold a stale WAL left by a crashed writer back into the main file.
    // In-memory databases reject this; that is fine.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::debug!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id               TEXT PRIMARY KEY,
            position         INTEGER NOT NULL,
            timestamp        REAL NOT NULL,
            source           TEXT NOT NULL,
            content          TEXT NOT NULL,
            memory_type      TEXT NOT NULL,
            retrieval_count  INTEGER NOT NULL DEFAULT 0,
            storage_strength REAL NOT NULL DEFAULT 1.0,
            last_accessed    REAL NOT NULL,
            pinned           INTEGER NOT NULL DEFAULT 0,
            vector           BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_events_position ON events(position);
        CREATE INDEX IF NOT EXISTS idx_events_source ON events(source);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        let version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
    }

    #[test]
    fn test_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
