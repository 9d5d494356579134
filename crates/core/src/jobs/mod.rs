//! Durable queue of asynchronous summary jobs.
//!
//! A job moves `Queued → Running → {Succeeded, Failed}`. Terminal states are final: every
//! store update is guarded on the job's current status, so a late or duplicate write
//! cannot resurrect a finished job.

mod sqlite;
mod worker;

pub use sqlite::SqliteJobQueue;
pub use worker::{run_job, WorkerPool};

use crate::models::ConsultationId;
use crate::{ConsultError, ConsultResult};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Notify;

pub type JobId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ConsultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ConsultError::CorruptRow {
                column: "summary_jobs.status",
                value: other.to_string(),
            }),
        }
    }
}

/// One asynchronous summary request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryJob {
    pub id: JobId,
    pub consultation_id: ConsultationId,
    pub status: JobStatus,
    /// Attempts made so far, including the one in progress.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a running job ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
}

pub trait JobQueue: Send + Sync {
    /// Insert a new `queued` job.
    fn enqueue(&self, consultation_id: ConsultationId) -> ConsultResult<SummaryJob>;

    /// Atomically move the oldest `queued` job to `running` and return it.
    fn claim_next(&self) -> ConsultResult<Option<SummaryJob>>;

    /// Update the attempt counter and last error of a `running` job.
    fn record_attempt(&self, id: JobId, attempts: u32, last_error: Option<&str>) -> ConsultResult<()>;

    /// Move a `running` job to its terminal state.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidRequest` if the job is not running.
    fn finish(&self, id: JobId, outcome: &JobOutcome) -> ConsultResult<SummaryJob>;

    fn get(&self, id: JobId) -> ConsultResult<SummaryJob>;

    /// Re-queue jobs left `running` by a process that stopped mid-job.
    ///
    /// Returns how many jobs were re-queued. Must only be called while no worker is
    /// running against the same database.
    fn recover_interrupted(&self) -> ConsultResult<usize>;
}

/// Enqueues jobs and wakes an idle worker.
///
/// Workers in another process still pick the job up on their next poll.
#[derive(Clone)]
pub struct JobSubmitter {
    queue: Arc<dyn JobQueue>,
    notify: Arc<Notify>,
}

impl JobSubmitter {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self {
            queue,
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn submit(&self, consultation_id: ConsultationId) -> ConsultResult<SummaryJob> {
        let job = self.queue.enqueue(consultation_id)?;
        tracing::info!(job_id = job.id, consultation_id, "summary job queued");
        self.notify.notify_one();
        Ok(job)
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    /// The wake-up handle shared with an in-process [`WorkerPool`].
    pub fn notifier(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!(matches!(
            "paused".parse::<JobStatus>(),
            Err(ConsultError::CorruptRow { .. })
        ));
    }

    #[test]
    fn only_finished_states_are_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
