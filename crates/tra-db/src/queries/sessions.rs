//! Session summary queries.
//!
//! The authoritative session state lives in the checkpoint table; this table
//! carries the queryable summary (phase, stage, progress, pause flag).

use crate::store::{Database, StoreError, StoreResult};
use rusqlite::params;

/// Session row from database.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub design_job_id: String,
    pub phase: String,
    pub stage: String,
    pub progress: i64,
    pub paused: bool,
    pub awaiting: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn row_from(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        user_id: row.get(2)?,
        design_job_id: row.get(3)?,
        phase: row.get(4)?,
        stage: row.get(5)?,
        progress: row.get(6)?,
        paused: row.get::<_, i64>(7)? != 0,
        awaiting: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const COLUMNS: &str = "id, project_id, user_id, design_job_id, phase, stage, progress, paused, awaiting, created_at, updated_at";

/// Create a new session.
pub fn create_session(
    db: &Database,
    id: &str,
    project_id: &str,
    user_id: &str,
    design_job_id: &str,
) -> StoreResult<()> {
    db.write(|conn| {
        conn.execute(
            "INSERT INTO sessions (id, project_id, user_id, design_job_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, project_id, user_id, design_job_id],
        )?;
        Ok(())
    })
}

/// Get a session by ID.
pub fn get_session(db: &Database, id: &str) -> StoreResult<SessionRow> {
    db.read(|conn| {
        conn.query_row(
            &format!("SELECT {} FROM sessions WHERE id = ?1", COLUMNS),
            params![id],
            row_from,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::Missing(format!("Session: {}", id)),
            e => StoreError::Sqlite(e),
        })
    })
}

/// Update the queryable summary after a checkpoint.
pub fn update_summary(
    db: &Database,
    id: &str,
    phase: &str,
    stage: &str,
    progress: i64,
    paused: bool,
    awaiting: Option<&str>,
) -> StoreResult<()> {
    db.write(|conn| {
        let changed = conn.execute(
            "UPDATE sessions
             SET phase = ?1, stage = ?2, progress = ?3, paused = ?4, awaiting = ?5,
                 updated_at = datetime('now')
             WHERE id = ?6",
            params![phase, stage, progress, paused as i64, awaiting, id],
        )?;
        if changed == 0 {
            return Err(StoreError::Missing(format!("Session: {}", id)));
        }
        Ok(())
    })
}

/// List sessions not yet in a terminal phase.
pub fn list_active_sessions(db: &Database) -> StoreResult<Vec<SessionRow>> {
    db.read(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions
             WHERE phase NOT IN ('completed', 'failed', 'cancelled')
             ORDER BY created_at",
            COLUMNS
        ))?;
        let rows = stmt.query_map([], row_from)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::queries::design_jobs;

    fn db() -> Database {
        let db = Database::in_memory().unwrap();
        run_migrations(&db).unwrap();
        design_jobs::insert_job(&db, "job-1", "proj-1", "completed", "", "{}", None).unwrap();
        db
    }

    #[test]
    fn test_create_and_update_session() {
        let db = db();
        create_session(&db, "s-1", "proj-1", "user-1", "job-1").unwrap();

        let row = get_session(&db, "s-1").unwrap();
        assert_eq!(row.phase, "input_analysis");
        assert_eq!(row.progress, 0);
        assert!(!row.paused);

        update_summary(&db, "s-1", "decision_loop", "wait_user_decision", 42, true, Some("decision"))
            .unwrap();
        let row = get_session(&db, "s-1").unwrap();
        assert_eq!(row.phase, "decision_loop");
        assert_eq!(row.progress, 42);
        assert!(row.paused);
        assert_eq!(row.awaiting.as_deref(), Some("decision"));
    }

    #[test]
    fn test_active_excludes_terminal() {
        let db = db();
        create_session(&db, "s-1", "proj-1", "user-1", "job-1").unwrap();
        create_session(&db, "s-2", "proj-1", "user-1", "job-1").unwrap();
        update_summary(&db, "s-2", "completed", "notify_next_agent", 100, false, None).unwrap();

        let active = list_active_sessions(&db).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "s-1");
    }
}
