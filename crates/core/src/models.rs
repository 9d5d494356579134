//! Domain records held by the store.

use chrono::{DateTime, NaiveDate, Utc};
use consult_types::{EmailAddress, NonEmptyText};

pub type PatientId = i64;
pub type ConsultationId = i64;

/// A stored patient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patient {
    pub id: PatientId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    /// Always lowercase.
    pub email: String,
}

/// Validated input for creating a patient.
#[derive(Clone, Debug)]
pub struct NewPatient {
    pub full_name: NonEmptyText,
    pub date_of_birth: NaiveDate,
    pub email: EmailAddress,
}

/// A stored consultation, joined with its patient's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Consultation {
    pub id: ConsultationId,
    pub patient_id: PatientId,
    pub patient_name: String,
    pub symptoms: String,
    pub diagnosis: String,
    pub created_at: DateTime<Utc>,
    /// Set only by the summary orchestrator.
    pub ai_summary: Option<String>,
}

/// Validated input for creating a consultation.
///
/// There is intentionally no summary field: a new consultation never has one.
#[derive(Clone, Debug)]
pub struct NewConsultation {
    pub patient_id: PatientId,
    pub symptoms: NonEmptyText,
    pub diagnosis: String,
}
