//! Upstream design-job queries.
//!
//! The workflow only reads this table; the insert helper exists for the
//! upstream pipeline boundary and for test seeding.

use crate::store::{Database, StoreError, StoreResult};
use rusqlite::params;

/// Design job row from database.
#[derive(Debug, Clone)]
pub struct DesignJobRow {
    pub id: String,
    pub project_id: String,
    pub status: String,
    pub prd_text: String,
    /// JSON object mapping design-document name to content.
    pub design_docs: String,
    pub code_archive_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Get a design job by ID.
pub fn get_job(db: &Database, id: &str) -> StoreResult<DesignJobRow> {
    db.read(|conn| {
        conn.query_row(
            "SELECT id, project_id, status, prd_text, design_docs, code_archive_path,
                    created_at, updated_at
             FROM design_jobs WHERE id = ?1",
            params![id],
            |row| {
                Ok(DesignJobRow {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    status: row.get(2)?,
                    prd_text: row.get(3)?,
                    design_docs: row.get(4)?,
                    code_archive_path: row.get(5)?,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                StoreError::Missing(format!("Design job: {}", id))
            }
            e => StoreError::Sqlite(e),
        })
    })
}

/// Insert a design job (upstream boundary / test seeding).
pub fn insert_job(
    db: &Database,
    id: &str,
    project_id: &str,
    status: &str,
    prd_text: &str,
    design_docs_json: &str,
    code_archive_path: Option<&str>,
) -> StoreResult<()> {
    db.write(|conn| {
        conn.execute(
            "INSERT INTO design_jobs (id, project_id, status, prd_text, design_docs, code_archive_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, project_id, status, prd_text, design_docs_json, code_archive_path],
        )?;
        Ok(())
    })
}
