//! # Consult Core
//!
//! Core business logic for the consultation record service.
//!
//! This crate contains the data operations and the summary pipeline:
//! - Patient and consultation records in SQLite, with page-number pagination
//! - The AI summary client and the orchestrator that stores its output
//! - A durable job queue and worker pool for asynchronous summaries
//!
//! **No API concerns**: HTTP servers and wire DTOs belong in `api-rest` or `api-shared`.

pub mod ai;
pub mod config;
pub mod constants;
pub mod error;
pub mod jobs;
pub mod models;
pub mod pagination;
pub mod store;
pub mod summary;
pub mod validation;

pub use config::{AiConfig, AiProvider, CoreConfig, RetryPolicy, SummaryMode, WorkerConfig};
pub use error::{ConsultError, ConsultResult};
pub use jobs::{JobId, JobOutcome, JobQueue, JobStatus, JobSubmitter, SqliteJobQueue, SummaryJob, WorkerPool};
pub use models::{Consultation, ConsultationId, NewConsultation, NewPatient, Patient, PatientId};
pub use pagination::{Page, PageRequest};
pub use store::{Database, RecordStore, SqliteRecordStore};
pub use summary::SummaryService;
