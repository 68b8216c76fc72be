//! Checkpoint queries: durable session snapshots between nodes.

use crate::store::{Database, StoreError, StoreResult};
use rusqlite::params;

/// Checkpoint row from database.
#[derive(Debug, Clone)]
pub struct CheckpointRow {
    pub session_id: String,
    pub revision: i64,
    pub node: String,
    /// JSON snapshot of the full session record.
    pub state: String,
    pub created_at: String,
}

fn row_from(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckpointRow> {
    Ok(CheckpointRow {
        session_id: row.get(0)?,
        revision: row.get(1)?,
        node: row.get(2)?,
        state: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Write a checkpoint. Idempotent by (session_id, revision): a replayed
/// write of an existing revision is a no-op.
pub fn save_checkpoint(
    db: &Database,
    session_id: &str,
    revision: i64,
    node: &str,
    state_json: &str,
) -> StoreResult<()> {
    let created_at = chrono::Utc::now().to_rfc3339();
    db.write(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO checkpoints (session_id, revision, node, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, revision, node, state_json, created_at],
        )?;
        Ok(())
    })
}

/// Latest checkpoint for a session, if any.
pub fn latest_checkpoint(db: &Database, session_id: &str) -> StoreResult<Option<CheckpointRow>> {
    db.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT session_id, revision, node, state, created_at
             FROM checkpoints WHERE session_id = ?1
             ORDER BY revision DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![session_id], row_from)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    })
}

/// Highest revision written for a session; 0 when none exist.
pub fn max_revision(db: &Database, session_id: &str) -> StoreResult<i64> {
    db.read(|conn| {
        let max: i64 = conn.query_row(
            "SELECT COALESCE(MAX(revision), 0) FROM checkpoints WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(max)
    })
}

/// Full revision history for a session, oldest first.
pub fn history(db: &Database, session_id: &str) -> StoreResult<Vec<CheckpointRow>> {
    db.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT session_id, revision, node, state, created_at
             FROM checkpoints WHERE session_id = ?1
             ORDER BY revision",
        )?;
        let rows = stmt.query_map(params![session_id], row_from)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    })
}

/// Non-terminal sessions whose newest checkpoint is older than the cutoff.
///
/// `julianday` tolerates both RFC3339 and sqlite datetime formats.
pub fn stale_sessions(db: &Database, cutoff_rfc3339: &str) -> StoreResult<Vec<String>> {
    db.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT s.id FROM sessions s
             JOIN checkpoints c ON c.session_id = s.id
             WHERE s.phase NOT IN ('completed', 'failed', 'cancelled')
             GROUP BY s.id
             HAVING julianday(MAX(c.created_at)) < julianday(?1)",
        )?;
        let rows = stmt.query_map(params![cutoff_rfc3339], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::queries::{design_jobs, sessions};

    fn db() -> Database {
        let db = Database::in_memory().unwrap();
        run_migrations(&db).unwrap();
        design_jobs::insert_job(&db, "job-1", "proj-1", "completed", "", "{}", None).unwrap();
        sessions::create_session(&db, "s-1", "proj-1", "user-1", "job-1").unwrap();
        db
    }

    #[test]
    fn test_save_and_load_latest() {
        let db = db();
        save_checkpoint(&db, "s-1", 1, "load_inputs", r#"{"rev":1}"#).unwrap();
        save_checkpoint(&db, "s-1", 2, "analyze_completeness", r#"{"rev":2}"#).unwrap();

        let latest = latest_checkpoint(&db, "s-1").unwrap().unwrap();
        assert_eq!(latest.revision, 2);
        assert_eq!(latest.node, "analyze_completeness");
        assert_eq!(max_revision(&db, "s-1").unwrap(), 2);
    }

    #[test]
    fn test_write_is_idempotent_by_revision() {
        let db = db();
        save_checkpoint(&db, "s-1", 1, "load_inputs", r#"{"first":true}"#).unwrap();
        // A replayed write of the same revision must not clobber the original.
        save_checkpoint(&db, "s-1", 1, "load_inputs", r#"{"first":false}"#).unwrap();

        let latest = latest_checkpoint(&db, "s-1").unwrap().unwrap();
        assert_eq!(latest.state, r#"{"first":true}"#);
        assert_eq!(history(&db, "s-1").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_session_has_no_checkpoint() {
        let db = db();
        assert!(latest_checkpoint(&db, "s-1").unwrap().is_none());
        assert_eq!(max_revision(&db, "s-1").unwrap(), 0);
    }

    #[test]
    fn test_history_is_ordered() {
        let db = db();
        for rev in 1..=3 {
            save_checkpoint(&db, "s-1", rev, "n", "{}").unwrap();
        }
        let revisions: Vec<i64> = history(&db, "s-1")
            .unwrap()
            .into_iter()
            .map(|c| c.revision)
            .collect();
        assert_eq!(revisions, vec![1, 2, 3]);
    }

    #[test]
    fn test_stale_sessions_detects_idle() {
        let db = db();
        save_checkpoint(&db, "s-1", 1, "load_inputs", "{}").unwrap();
        // Cutoff in the future: everything is stale.
        let future = (chrono::Utc::now() + chrono::Duration::hours(2)).to_rfc3339();
        assert_eq!(stale_sessions(&db, &future).unwrap(), vec!["s-1"]);
        // Cutoff in the past: nothing is stale.
        let past = (chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339();
        assert!(stale_sessions(&db, &past).unwrap().is_empty());
    }
}
