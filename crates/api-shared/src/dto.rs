//! JSON request and response bodies.
//!
//! Request bodies use `Option` fields so that a missing field reaches validation and is
//! reported by name, rather than failing deserialisation as a whole.

use chrono::SecondsFormat;
use consult_core::{Consultation, Patient, SummaryJob};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub full_name: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: i64,
    pub full_name: String,
    pub date_of_birth: String,
    pub email: String,
}

impl From<Patient> for PatientRes {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            full_name: p.full_name,
            date_of_birth: p.date_of_birth.format("%Y-%m-%d").to_string(),
            email: p.email,
        }
    }
}

/// Any `ai_summary` sent by the client is ignored.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateConsultationReq {
    /// Patient id.
    pub patient: Option<i64>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConsultationRes {
    pub id: i64,
    /// Patient id.
    pub patient: i64,
    pub patient_name: String,
    pub symptoms: String,
    pub diagnosis: String,
    /// RFC 3339, UTC.
    pub created_at: String,
    pub ai_summary: Option<String>,
}

impl From<Consultation> for ConsultationRes {
    fn from(c: Consultation) -> Self {
        Self {
            id: c.id,
            patient: c.patient_id,
            patient_name: c.patient_name,
            symptoms: c.symptoms,
            diagnosis: c.diagnosis,
            created_at: c.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ai_summary: c.ai_summary,
        }
    }
}

/// Acknowledgement for a queued summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SummaryAcceptedRes {
    pub detail: String,
    pub job_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SummaryJobRes {
    pub id: i64,
    /// Consultation id.
    pub consultation: i64,
    /// `queued`, `running`, `succeeded` or `failed`.
    pub status: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SummaryJob> for SummaryJobRes {
    fn from(job: SummaryJob) -> Self {
        Self {
            id: job.id,
            consultation: job.consultation_id,
            status: job.status.as_str().to_string(),
            attempts: job.attempts,
            last_error: job.last_error,
            created_at: job.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            updated_at: job.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatientPage {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<PatientRes>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConsultationPage {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<ConsultationRes>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn consultation_serialises_with_null_summary() {
        let res = ConsultationRes::from(Consultation {
            id: 3,
            patient_id: 1,
            patient_name: "Jane Doe".into(),
            symptoms: "Cough".into(),
            diagnosis: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            ai_summary: None,
        });

        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["patient"], 1);
        assert_eq!(json["created_at"], "2024-03-01T09:30:00.000000Z");
        assert!(json["ai_summary"].is_null());
    }

    #[test]
    fn patient_date_of_birth_is_iso() {
        let res = PatientRes::from(Patient {
            id: 1,
            full_name: "Jane Doe".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 15).unwrap(),
            email: "jane@example.com".into(),
        });
        assert_eq!(res.date_of_birth, "1990-05-15");
    }

    #[test]
    fn create_consultation_ignores_client_summary() {
        let req: CreateConsultationReq = serde_json::from_str(
            r#"{"patient": 1, "symptoms": "Cough", "ai_summary": "forged"}"#,
        )
        .unwrap();
        assert_eq!(req.patient, Some(1));
        assert_eq!(req.diagnosis, None);
    }
}
