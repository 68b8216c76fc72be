//! Versioned artifact queries.
//!
//! History is append-only: every save writes a new row with
//! `version = MAX(version) + 1`, computed and inserted in one transaction.

use crate::store::{Database, StoreError, StoreResult};
use rusqlite::params;

/// Artifact row from database.
#[derive(Debug, Clone)]
pub struct ArtifactRow {
    pub session_id: String,
    pub version: i64,
    pub trd: String,
    pub openapi: String,
    pub sql_ddl: String,
    pub erd: String,
    pub architecture: String,
    pub tech_stack: String,
    /// JSON validation report.
    pub validation_report: String,
    pub created_at: String,
}

fn row_from(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArtifactRow> {
    Ok(ArtifactRow {
        session_id: row.get(0)?,
        version: row.get(1)?,
        trd: row.get(2)?,
        openapi: row.get(3)?,
        sql_ddl: row.get(4)?,
        erd: row.get(5)?,
        architecture: row.get(6)?,
        tech_stack: row.get(7)?,
        validation_report: row.get(8)?,
        created_at: row.get(9)?,
    })
}

const COLUMNS: &str = "session_id, version, trd, openapi, sql_ddl, erd, architecture, tech_stack, validation_report, created_at";

/// Artifact fields for a save, borrowed from the generated bundle.
pub struct NewArtifacts<'a> {
    pub trd: &'a str,
    pub openapi: &'a str,
    pub sql_ddl: &'a str,
    pub erd: &'a str,
    pub architecture: &'a str,
    pub tech_stack: &'a str,
    pub validation_report: &'a str,
}

/// Persist a new artifact version and return it.
pub fn save_artifacts(db: &Database, session_id: &str, new: &NewArtifacts<'_>) -> StoreResult<i64> {
    db.transaction(|tx| {
        let version: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM session_artifacts WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO session_artifacts
               (session_id, version, trd, openapi, sql_ddl, erd, architecture, tech_stack, validation_report)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session_id,
                version,
                new.trd,
                new.openapi,
                new.sql_ddl,
                new.erd,
                new.architecture,
                new.tech_stack,
                new.validation_report,
            ],
        )?;
        Ok(version)
    })
}

/// Latest artifact version for a session.
pub fn latest_artifacts(db: &Database, session_id: &str) -> StoreResult<ArtifactRow> {
    db.read(|conn| {
        conn.query_row(
            &format!(
                "SELECT {} FROM session_artifacts WHERE session_id = ?1
                 ORDER BY version DESC LIMIT 1",
                COLUMNS
            ),
            params![session_id],
            row_from,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                StoreError::Missing(format!("Artifacts for session: {}", session_id))
            }
            e => StoreError::Sqlite(e),
        })
    })
}

/// All versions written for a session, oldest first.
pub fn list_versions(db: &Database, session_id: &str) -> StoreResult<Vec<i64>> {
    db.read(|conn| {
        let mut stmt = conn.prepare(
            "SELECT version FROM session_artifacts WHERE session_id = ?1 ORDER BY version",
        )?;
        let rows = stmt.query_map(params![session_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    })
}
