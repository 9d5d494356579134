//! SQLite-backed [`JobQueue`].

use super::{JobId, JobOutcome, JobQueue, JobStatus, SummaryJob};
use crate::models::ConsultationId;
use crate::store::Database;
use crate::{ConsultError, ConsultResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

const JOB_COLUMNS: &str = "id, consultation_id, status, attempts, last_error, created_at, updated_at";

/// A row as read, before the status text is checked.
struct RawJob {
    id: JobId,
    consultation_id: ConsultationId,
    status: String,
    attempts: u32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RawJob {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            consultation_id: row.get(1)?,
            status: row.get(2)?,
            attempts: row.get(3)?,
            last_error: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_job(self) -> ConsultResult<SummaryJob> {
        Ok(SummaryJob {
            id: self.id,
            consultation_id: self.consultation_id,
            status: self.status.parse()?,
            attempts: self.attempts,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn fetch_job(conn: &Connection, id: JobId) -> ConsultResult<SummaryJob> {
    conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM summary_jobs WHERE id = ?1"),
        params![id],
        RawJob::from_row,
    )
    .optional()?
    .ok_or_else(|| ConsultError::NotFound(format!("Summary job {id} not found.")))?
    .into_job()
}

#[derive(Clone)]
pub struct SqliteJobQueue {
    db: Database,
}

impl SqliteJobQueue {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl JobQueue for SqliteJobQueue {
    fn enqueue(&self, consultation_id: ConsultationId) -> ConsultResult<SummaryJob> {
        self.db.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO summary_jobs (consultation_id, status, attempts, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?3)",
                params![consultation_id, JobStatus::Queued.as_str(), now],
            )?;
            fetch_job(conn, conn.last_insert_rowid())
        })
    }

    fn claim_next(&self) -> ConsultResult<Option<SummaryJob>> {
        self.db.with_conn(|conn| {
            // Select and update in one statement so two workers never claim the same row.
            let sql = format!(
                "UPDATE summary_jobs SET status = ?1, updated_at = ?2
                 WHERE id = (SELECT id FROM summary_jobs WHERE status = ?3 ORDER BY id LIMIT 1)
                 RETURNING {JOB_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![JobStatus::Running.as_str(), Utc::now(), JobStatus::Queued.as_str()],
                RawJob::from_row,
            )
            .optional()?
            .map(RawJob::into_job)
            .transpose()
        })
    }

    fn record_attempt(&self, id: JobId, attempts: u32, last_error: Option<&str>) -> ConsultResult<()> {
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE summary_jobs SET attempts = ?1, last_error = ?2, updated_at = ?3
                 WHERE id = ?4 AND status = ?5",
                params![attempts, last_error, Utc::now(), id, JobStatus::Running.as_str()],
            )?;
            if updated == 0 {
                return Err(not_running(conn, id));
            }
            Ok(())
        })
    }

    fn finish(&self, id: JobId, outcome: &JobOutcome) -> ConsultResult<SummaryJob> {
        self.db.with_conn(|conn| {
            let updated = match outcome {
                JobOutcome::Succeeded => conn.execute(
                    "UPDATE summary_jobs SET status = ?1, last_error = NULL, updated_at = ?2
                     WHERE id = ?3 AND status = ?4",
                    params![
                        JobStatus::Succeeded.as_str(),
                        Utc::now(),
                        id,
                        JobStatus::Running.as_str()
                    ],
                )?,
                JobOutcome::Failed(reason) => conn.execute(
                    "UPDATE summary_jobs SET status = ?1, last_error = ?2, updated_at = ?3
                     WHERE id = ?4 AND status = ?5",
                    params![
                        JobStatus::Failed.as_str(),
                        reason,
                        Utc::now(),
                        id,
                        JobStatus::Running.as_str()
                    ],
                )?,
            };
            if updated == 0 {
                return Err(not_running(conn, id));
            }
            fetch_job(conn, id)
        })
    }

    fn get(&self, id: JobId) -> ConsultResult<SummaryJob> {
        self.db.with_conn(|conn| fetch_job(conn, id))
    }

    fn recover_interrupted(&self) -> ConsultResult<usize> {
        self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE summary_jobs SET status = ?1, updated_at = ?2 WHERE status = ?3",
                params![JobStatus::Queued.as_str(), Utc::now(), JobStatus::Running.as_str()],
            )?)
        })
    }
}

/// Explains why a guarded update matched no row.
fn not_running(conn: &Connection, id: JobId) -> ConsultError {
    match fetch_job(conn, id) {
        Ok(job) => ConsultError::InvalidRequest(format!(
            "Summary job {id} is {}, not running.",
            job.status
        )),
        Err(err) => err,
    }
}
