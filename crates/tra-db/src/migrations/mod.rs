//! Schema migrations, embedded at compile time.

use crate::store::{Database, StoreError, StoreResult};
use rusqlite_migration::{Migrations, M};

fn all() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("001_initial.sql"))])
}

/// Bring the schema up to the latest version.
pub fn run_migrations(db: &Database) -> StoreResult<()> {
    db.write(|conn| {
        all()
            .to_latest(conn)
            .map_err(|e| StoreError::Migration(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_gets_full_schema() {
        let db = Database::in_memory().unwrap();
        run_migrations(&db).unwrap();

        db.read(|conn| {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
            let tables: Vec<String> = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            for table in ["checkpoints", "design_jobs", "session_artifacts", "sessions"] {
                assert!(tables.iter().any(|t| t == table), "missing table {}", table);
            }
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        run_migrations(&db).unwrap();
        run_migrations(&db).unwrap();
    }
}
