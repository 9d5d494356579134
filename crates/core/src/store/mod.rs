//! Persistent store for patients and consultations.
//!
//! The [`RecordStore`] trait is the seam between the request layer, the summary
//! orchestrator and the database. [`SqliteRecordStore`] is the production implementation.

mod database;
mod sqlite;

pub use database::{run_migrations, Database};
pub use sqlite::SqliteRecordStore;

use crate::models::{Consultation, ConsultationId, NewConsultation, NewPatient, Patient, PatientId};
use crate::pagination::{Page, PageRequest};
use crate::ConsultResult;

/// Create/read/filter/paginate access to patient and consultation records.
pub trait RecordStore: Send + Sync {
    /// Insert a patient.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if another patient already uses the (lowercased) email.
    fn create_patient(&self, new: NewPatient) -> ConsultResult<Patient>;

    /// `NotFound` if no patient has this id.
    fn get_patient(&self, id: PatientId) -> ConsultResult<Patient>;

    /// Patients ordered by full name, then id.
    fn list_patients(&self, page: PageRequest) -> ConsultResult<Page<Patient>>;

    /// Insert a consultation with no summary.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the referenced patient does not exist.
    fn create_consultation(&self, new: NewConsultation) -> ConsultResult<Consultation>;

    /// `NotFound` if no consultation has this id.
    fn get_consultation(&self, id: ConsultationId) -> ConsultResult<Consultation>;

    /// Consultations newest first, optionally restricted to one patient.
    ///
    /// An unknown patient id yields an empty page, not an error.
    fn list_consultations(
        &self,
        patient: Option<PatientId>,
        page: PageRequest,
    ) -> ConsultResult<Page<Consultation>>;

    /// Overwrite only the `ai_summary` column of one consultation and return the result.
    ///
    /// Reserved for the summary orchestrator; request handlers never call this.
    fn set_ai_summary(&self, id: ConsultationId, summary: &str) -> ConsultResult<Consultation>;
}
