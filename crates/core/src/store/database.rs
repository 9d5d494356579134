//! SQLite connection handling and schema migrations.

use crate::{ConsultError, ConsultResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_initial.sql")),
    (2, include_str!("../../migrations/002_summary_jobs.sql")),
];

/// How long a writer waits on a lock held by another process (e.g. a standalone worker).
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the service database.
///
/// Cloning is cheap; all clones use the same connection. The lock is held only for the
/// duration of a single store call and never across an `.await`.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (creating if needed) the database file at `path` and run pending migrations.
    pub fn open(path: &Path) -> ConsultResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open a private in-memory database (tests and throwaway runs).
    pub fn open_in_memory() -> ConsultResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> ConsultResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> ConsultResult<T>) -> ConsultResult<T> {
        let conn = self.conn.lock().map_err(|_| ConsultError::LockPoisoned)?;
        f(&conn)
    }
}

/// Apply every migration newer than the recorded schema version, each in its own transaction.
pub fn run_migrations(conn: &Connection) -> ConsultResult<()> {
    let current_version = current_version(conn);

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            tracing::info!("Running migration v{version}");
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| ConsultError::MigrationFailed {
                    version: *version,
                    reason: e.to_string(),
                })?;
            tx.commit()?;
        }
    }

    Ok(())
}

/// The current schema version, or 0 for a fresh database.
fn current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_version_is_current() {
        let db = Database::open_in_memory().unwrap();
        let version = db.with_conn(|conn| Ok(current_version(conn))).unwrap();
        assert_eq!(version, MIGRATIONS.len() as i64);
    }

    #[test]
    fn migrations_are_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(run_migrations).expect("second run should be a no-op");
    }

    #[test]
    fn foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let fk: i64 = db
            .with_conn(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("consultations.db");

        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO patients (full_name, date_of_birth, email) VALUES ('A', '2000-01-01', 'a@example.com')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        let count: i64 = reopened
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }
}
