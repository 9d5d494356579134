//! Background worker pool draining the summary job queue.

use super::{JobOutcome, JobQueue, SummaryJob};
use crate::config::{RetryPolicy, WorkerConfig};
use crate::summary::SummaryService;
use crate::ConsultResult;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A running set of worker tasks.
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Re-queue interrupted jobs, then spawn `cfg.workers` tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        queue: Arc<dyn JobQueue>,
        service: SummaryService,
        notify: Arc<Notify>,
        cfg: WorkerConfig,
    ) -> ConsultResult<Self> {
        let recovered = queue.recover_interrupted()?;
        if recovered > 0 {
            info!(recovered, "re-queued interrupted summary jobs");
        }

        let (shutdown, rx) = watch::channel(false);
        let handles = (0..cfg.workers)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    queue.clone(),
                    service.clone(),
                    notify.clone(),
                    cfg,
                    rx.clone(),
                ))
            })
            .collect();

        info!(workers = cfg.workers, "summary worker pool started");
        Ok(Self { shutdown, handles })
    }

    /// Signal every worker to stop and wait for in-flight jobs to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("summary worker panicked: {e}");
            }
        }
        info!("summary worker pool stopped");
    }
}

async fn worker_loop(
    worker: usize,
    queue: Arc<dyn JobQueue>,
    service: SummaryService,
    notify: Arc<Notify>,
    cfg: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match queue.claim_next() {
            Ok(Some(job)) => {
                info!(worker, job_id = job.id, consultation_id = job.consultation_id, "claimed summary job");
                if let Err(e) = run_job(queue.as_ref(), &service, &job, &cfg.retry).await {
                    error!(worker, job_id = job.id, "failed to record job outcome: {e}");
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => error!(worker, "failed to claim summary job: {e}"),
        }

        tokio::select! {
            _ = notify.notified() => {}
            _ = tokio::time::sleep(cfg.poll_interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

/// Run one claimed job to completion and record its terminal state.
pub async fn run_job(
    queue: &dyn JobQueue,
    service: &SummaryService,
    job: &SummaryJob,
    policy: &RetryPolicy,
) -> ConsultResult<SummaryJob> {
    let result = service
        .generate_with_retry(job.consultation_id, policy, |attempt, err| {
            let message = err.map(ToString::to_string);
            if let Err(e) = queue.record_attempt(job.id, attempt, message.as_deref()) {
                warn!(job_id = job.id, "failed to record attempt {attempt}: {e}");
            }
        })
        .await;

    let outcome = match result {
        Ok(_) => {
            info!(job_id = job.id, consultation_id = job.consultation_id, "summary job succeeded");
            JobOutcome::Succeeded
        }
        Err(e) => {
            error!(job_id = job.id, consultation_id = job.consultation_id, "summary job failed: {e}");
            JobOutcome::Failed(e.to_string())
        }
    };
    queue.finish(job.id, &outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiServiceError, MockSummaryClient, SummaryClient};
    use crate::jobs::{JobStatus, JobSubmitter, SqliteJobQueue};
    use crate::models::Consultation;
    use crate::store::{Database, RecordStore, SqliteRecordStore};
    use crate::validation::{new_consultation, new_patient};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct DownClient {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SummaryClient for DownClient {
        async fn generate_summary(&self, _symptoms: &str, _diagnosis: &str) -> Result<String, AiServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AiServiceError("connection refused".into()))
        }
    }

    struct Fixture {
        store: Arc<SqliteRecordStore>,
        queue: Arc<SqliteJobQueue>,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Database::open_in_memory().unwrap();
            Self {
                store: Arc::new(SqliteRecordStore::new(db.clone())),
                queue: Arc::new(SqliteJobQueue::new(db)),
            }
        }

        fn consultation(&self) -> Consultation {
            let patient = self
                .store
                .create_patient(new_patient(Some("Jane Doe"), Some("1990-05-15"), Some("jane@example.com")).unwrap())
                .unwrap();
            self.store
                .create_consultation(
                    new_consultation(Some(patient.id), Some("Cough and fever"), Some("Common cold")).unwrap(),
                )
                .unwrap()
        }

        fn service(&self, client: Arc<dyn SummaryClient>) -> SummaryService {
            SummaryService::new(self.store.clone(), client)
        }
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            workers: 2,
            poll_interval: Duration::from_millis(20),
            retry: RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_millis(1),
            },
        }
    }

    async fn wait_until_terminal(queue: &dyn JobQueue, id: i64) -> SummaryJob {
        for _ in 0..500 {
            let job = queue.get(id).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish");
    }

    #[tokio::test]
    async fn submitted_job_is_processed() {
        let fx = Fixture::new();
        let consultation = fx.consultation();
        let submitter = JobSubmitter::new(fx.queue.clone());
        let pool = WorkerPool::start(
            fx.queue.clone(),
            fx.service(Arc::new(MockSummaryClient)),
            submitter.notifier(),
            fast_config(),
        )
        .unwrap();

        let job = submitter.submit(consultation.id).unwrap();
        let job = wait_until_terminal(fx.queue.as_ref(), job.id).await;
        pool.shutdown().await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.last_error, None);
        let summary = fx.store.get_consultation(consultation.id).unwrap().ai_summary;
        assert!(summary.unwrap().contains("Cough and fever"));
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_job() {
        let fx = Fixture::new();
        let consultation = fx.consultation();
        let client = Arc::new(DownClient::default());
        let job = fx.queue.enqueue(consultation.id).unwrap();
        fx.queue.claim_next().unwrap();

        let finished = run_job(
            fx.queue.as_ref(),
            &fx.service(client.clone()),
            &job,
            &fast_config().retry,
        )
        .await
        .unwrap();

        assert_eq!(finished.status, JobStatus::Failed);
        assert_eq!(finished.attempts, 4);
        assert!(finished.last_error.unwrap().contains("unavailable"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
        assert_eq!(fx.store.get_consultation(consultation.id).unwrap().ai_summary, None);
    }

    #[tokio::test]
    async fn deleted_consultation_fails_without_retry() {
        let fx = Fixture::new();
        let client = Arc::new(DownClient::default());
        let job = fx.queue.enqueue(31_337).unwrap();
        fx.queue.claim_next().unwrap();

        let finished = run_job(
            fx.queue.as_ref(),
            &fx.service(client.clone()),
            &job,
            &fast_config().retry,
        )
        .await
        .unwrap();

        assert_eq!(finished.status, JobStatus::Failed);
        assert_eq!(finished.attempts, 1);
        assert!(finished.last_error.unwrap().contains("not found"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn interrupted_job_is_resumed_on_start() {
        let fx = Fixture::new();
        let consultation = fx.consultation();
        let job = fx.queue.enqueue(consultation.id).unwrap();
        // A previous process claimed the job and stopped.
        fx.queue.claim_next().unwrap();

        let pool = WorkerPool::start(
            fx.queue.clone(),
            fx.service(Arc::new(MockSummaryClient)),
            Arc::new(Notify::new()),
            fast_config(),
        )
        .unwrap();
        let job = wait_until_terminal(fx.queue.as_ref(), job.id).await;
        pool.shutdown().await;

        assert_eq!(job.status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn shutdown_stops_idle_workers() {
        let fx = Fixture::new();
        let pool = WorkerPool::start(
            fx.queue.clone(),
            fx.service(Arc::new(MockSummaryClient)),
            Arc::new(Notify::new()),
            WorkerConfig {
                poll_interval: Duration::from_secs(3600),
                ..fast_config()
            },
        )
        .unwrap();

        tokio::time::timeout(Duration::from_secs(5), pool.shutdown())
            .await
            .expect("workers should stop promptly");
    }
}
