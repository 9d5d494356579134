//! SQLite-backed [`RecordStore`].

use super::{Database, RecordStore};
use crate::models::{Consultation, ConsultationId, NewConsultation, NewPatient, Patient, PatientId};
use crate::pagination::{Page, PageRequest};
use crate::{ConsultError, ConsultResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const CONSULTATION_COLUMNS: &str = "c.id, c.patient_id, p.full_name, c.symptoms, c.diagnosis, c.created_at, c.ai_summary";

#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        date_of_birth: row.get(2)?,
        email: row.get(3)?,
    })
}

fn consultation_from_row(row: &Row<'_>) -> rusqlite::Result<Consultation> {
    Ok(Consultation {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        symptoms: row.get(3)?,
        diagnosis: row.get(4)?,
        created_at: row.get(5)?,
        ai_summary: row.get(6)?,
    })
}

fn fetch_consultation(conn: &Connection, id: ConsultationId) -> ConsultResult<Consultation> {
    let sql = format!(
        "SELECT {CONSULTATION_COLUMNS} FROM consultations c
         JOIN patients p ON p.id = c.patient_id
         WHERE c.id = ?1"
    );
    conn.query_row(&sql, params![id], consultation_from_row)
        .optional()?
        .ok_or_else(|| ConsultError::NotFound(format!("Consultation {id} not found.")))
}

fn duplicate_email(email: &str) -> ConsultError {
    ConsultError::InvalidRequest(format!(
        "email: patient with this email already exists ({email})."
    ))
}

impl RecordStore for SqliteRecordStore {
    fn create_patient(&self, new: NewPatient) -> ConsultResult<Patient> {
        self.db.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM patients WHERE email = ?1)",
                params![new.email.as_str()],
                |row| row.get(0),
            )?;
            if taken {
                return Err(duplicate_email(new.email.as_str()));
            }

            let inserted = conn.execute(
                "INSERT INTO patients (full_name, date_of_birth, email) VALUES (?1, ?2, ?3)",
                params![new.full_name.as_str(), new.date_of_birth, new.email.as_str()],
            );
            match inserted {
                Ok(_) => {}
                // Lost a race with a concurrent insert of the same email.
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Err(duplicate_email(new.email.as_str()));
                }
                Err(e) => return Err(e.into()),
            }

            let patient = Patient {
                id: conn.last_insert_rowid(),
                full_name: new.full_name.into_inner(),
                date_of_birth: new.date_of_birth,
                email: new.email.as_str().to_string(),
            };
            tracing::info!(patient_id = patient.id, "patient created");
            Ok(patient)
        })
    }

    fn get_patient(&self, id: PatientId) -> ConsultResult<Patient> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, full_name, date_of_birth, email FROM patients WHERE id = ?1",
                params![id],
                patient_from_row,
            )
            .optional()?
            .ok_or_else(|| ConsultError::NotFound(format!("Patient {id} not found.")))
        })
    }

    fn list_patients(&self, page: PageRequest) -> ConsultResult<Page<Patient>> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
            let count = count as u64;
            page.ensure_in_range(count)?;

            let mut stmt = conn.prepare(
                "SELECT id, full_name, date_of_birth, email FROM patients
                 ORDER BY full_name ASC, id ASC
                 LIMIT ?1 OFFSET ?2",
            )?;
            let items = stmt
                .query_map(
                    params![i64::from(page.page_size), page.offset() as i64],
                    patient_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page {
                count,
                request: page,
                items,
            })
        })
    }

    fn create_consultation(&self, new: NewConsultation) -> ConsultResult<Consultation> {
        self.db.with_conn(|conn| {
            let patient_name: Option<String> = conn
                .query_row(
                    "SELECT full_name FROM patients WHERE id = ?1",
                    params![new.patient_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(patient_name) = patient_name else {
                return Err(ConsultError::InvalidRequest(format!(
                    "patient: Invalid pk \"{}\" - object does not exist.",
                    new.patient_id
                )));
            };

            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO consultations (patient_id, symptoms, diagnosis, created_at, ai_summary)
                 VALUES (?1, ?2, ?3, ?4, NULL)",
                params![new.patient_id, new.symptoms.as_str(), new.diagnosis, created_at],
            )?;

            let consultation = Consultation {
                id: conn.last_insert_rowid(),
                patient_id: new.patient_id,
                patient_name,
                symptoms: new.symptoms.into_inner(),
                diagnosis: new.diagnosis,
                created_at,
                ai_summary: None,
            };
            tracing::info!(
                consultation_id = consultation.id,
                patient_id = consultation.patient_id,
                "consultation created"
            );
            Ok(consultation)
        })
    }

    fn get_consultation(&self, id: ConsultationId) -> ConsultResult<Consultation> {
        self.db.with_conn(|conn| fetch_consultation(conn, id))
    }

    fn list_consultations(
        &self,
        patient: Option<PatientId>,
        page: PageRequest,
    ) -> ConsultResult<Page<Consultation>> {
        self.db.with_conn(|conn| {
            // `?1 IS NULL` keeps one statement for the filtered and unfiltered cases.
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM consultations WHERE ?1 IS NULL OR patient_id = ?1",
                params![patient],
                |row| row.get(0),
            )?;
            let count = count as u64;
            page.ensure_in_range(count)?;

            let sql = format!(
                "SELECT {CONSULTATION_COLUMNS} FROM consultations c
                 JOIN patients p ON p.id = c.patient_id
                 WHERE ?1 IS NULL OR c.patient_id = ?1
                 ORDER BY c.created_at DESC, c.id DESC
                 LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(
                    params![patient, i64::from(page.page_size), page.offset() as i64],
                    consultation_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page {
                count,
                request: page,
                items,
            })
        })
    }

    fn set_ai_summary(&self, id: ConsultationId, summary: &str) -> ConsultResult<Consultation> {
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE consultations SET ai_summary = ?1 WHERE id = ?2",
                params![summary, id],
            )?;
            if updated == 0 {
                return Err(ConsultError::NotFound(format!("Consultation {id} not found.")));
            }
            fetch_consultation(conn, id)
        })
    }
}
