//! SQLite store shared by the engine's persistence paths.

use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Storage error surface.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("connection lock poisoned")]
    Poisoned,

    #[error("no such row: {0}")]
    Missing(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to the SQLite database.
///
/// A single mutex-guarded connection is enough here: sessions are driven
/// cooperatively and every statement is short. WAL keeps readers from
/// blocking the writer.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database at `path`, creating the file and its parent
    /// directory if needed, and bring the schema up to date.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Migration(format!("creating {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        crate::migrations::run_migrations(&db)?;
        Ok(db)
    }

    /// In-memory database for tests. Schema application is left to the
    /// caller so migration tests can start from a blank slate.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure(conn: &Connection) -> rusqlite::Result<()> {
        // Writers back off up to five seconds before surfacing SQLITE_BUSY.
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run a read-only query against the connection.
    pub fn read<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run statements that need the connection mutably.
    pub fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    /// Run `f` inside a transaction, committing on success and rolling
    /// back on error.
    ///
    /// The version-increment write path depends on this: reading
    /// MAX(version) and inserting the next row must be one atomic unit.
    pub fn transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Flush the WAL into the main database file. Every write is already
    /// durable; this just compacts the log at teardown. A no-op for
    /// in-memory databases.
    pub fn close(&self) {
        if let Ok(conn) = self.lock() {
            let _ = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_round_trip() {
        let db = Database::in_memory().unwrap();
        db.write(|conn| {
            conn.execute("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT)", [])?;
            conn.execute("INSERT INTO kv VALUES ('a', '1')", [])?;
            Ok(())
        })
        .unwrap();

        let value: String = db
            .read(|conn| {
                Ok(conn.query_row("SELECT v FROM kv WHERE k = 'a'", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(value, "1");
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::in_memory().unwrap();
        db.write(|conn| {
            conn.execute("CREATE TABLE t (id INTEGER)", [])?;
            Ok(())
        })
        .unwrap();

        let result: StoreResult<()> = db.transaction(|tx| {
            tx.execute("INSERT INTO t VALUES (1)", [])?;
            Err(StoreError::Missing("forced rollback".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_creates_parent_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/tra.db");
        let db = Database::open(&path).unwrap();
        // Schema is in place without an explicit migration call.
        db.read(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sessions'",
                [],
                |row| row.get(0),
            )?;
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
        db.close();
    }
}
