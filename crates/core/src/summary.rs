//! Summary orchestration.
//!
//! [`SummaryService`] is the only writer of a consultation's `ai_summary`. Request handlers
//! call [`SummaryService::generate`] for a single synchronous attempt; background jobs call
//! [`SummaryService::generate_with_retry`], which backs off exponentially on transient
//! failures.

use crate::ai::SummaryClient;
use crate::config::RetryPolicy;
use crate::models::{Consultation, ConsultationId};
use crate::store::RecordStore;
use crate::{ConsultError, ConsultResult};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn RecordStore>,
    client: Arc<dyn SummaryClient>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn RecordStore>, client: Arc<dyn SummaryClient>) -> Self {
        Self { store, client }
    }

    /// Loads the consultation and checks it has symptoms to summarise.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidRequest` naming `symptoms` when they are blank.
    pub fn check_eligible(&self, id: ConsultationId) -> ConsultResult<Consultation> {
        let consultation = self.store.get_consultation(id)?;
        if consultation.symptoms.trim().is_empty() {
            return Err(ConsultError::InvalidRequest(
                "symptoms: Consultation has no symptoms to summarise.".into(),
            ));
        }
        Ok(consultation)
    }

    /// One attempt: validate, call the provider, store the summary.
    ///
    /// Any previous summary is overwritten. AI failures surface as `ServiceUnavailable`.
    pub async fn generate(&self, id: ConsultationId) -> ConsultResult<Consultation> {
        let consultation = self.check_eligible(id)?;

        let summary = self
            .client
            .generate_summary(&consultation.symptoms, &consultation.diagnosis)
            .await?;

        let updated = self.store.set_ai_summary(id, &summary)?;
        info!(consultation_id = id, "AI summary stored");
        Ok(updated)
    }

    /// Repeats [`generate`](Self::generate) while the failure is transient, up to
    /// `policy.max_retries` extra attempts, sleeping `policy.delay_for(retry)` in between.
    ///
    /// `on_attempt` is told the 1-based attempt number and that attempt's error, if any.
    pub async fn generate_with_retry(
        &self,
        id: ConsultationId,
        policy: &RetryPolicy,
        mut on_attempt: impl FnMut(u32, Option<&ConsultError>),
    ) -> ConsultResult<Consultation> {
        let mut retry = 0;
        loop {
            let result = self.generate(id).await;
            on_attempt(retry + 1, result.as_ref().err());

            match result {
                Err(err) if err.is_transient() && retry < policy.max_retries => {
                    let delay = policy.delay_for(retry);
                    warn!(
                        consultation_id = id,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "summary attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                other => return other,
            }
        }
    }
}
