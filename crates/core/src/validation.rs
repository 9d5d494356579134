//! Input validation utilities.
//!
//! Turns loosely-typed request fields into the validated `New*` records the store accepts.
//! Every failure is reported as `ConsultError::InvalidRequest` with a message naming the
//! offending field; when several fields are wrong they are all reported at once.

use crate::constants::MAX_FULL_NAME_LEN;
use crate::models::{NewConsultation, NewPatient, PatientId};
use crate::{ConsultError, ConsultResult};
use chrono::NaiveDate;
use consult_types::{EmailAddress, EmailError, NonEmptyText, TextError};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

/// Accumulates per-field messages into a single `InvalidRequest`.
#[derive(Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn push(&mut self, field: &str, message: impl AsRef<str>) {
        self.0.push(format!("{field}: {}", message.as_ref()));
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> ConsultResult<T> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(ConsultError::InvalidRequest(self.0.join(" ")))
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date_of_birth(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Validates the fields of a patient creation request.
///
/// # Errors
///
/// Returns `InvalidRequest` if any field is missing, blank, too long, or malformed.
pub fn new_patient(
    full_name: Option<&str>,
    date_of_birth: Option<&str>,
    email: Option<&str>,
) -> ConsultResult<NewPatient> {
    let mut errors = FieldErrors::default();

    let full_name = match full_name {
        None => {
            errors.push("full_name", REQUIRED);
            None
        }
        Some(raw) => match NonEmptyText::with_max_len(raw, MAX_FULL_NAME_LEN) {
            Ok(name) => Some(name),
            Err(TextError::Empty) => {
                errors.push("full_name", BLANK);
                None
            }
            Err(TextError::TooLong { max }) => {
                errors.push(
                    "full_name",
                    format!("Ensure this field has no more than {max} characters."),
                );
                None
            }
        },
    };

    let date_of_birth = match date_of_birth {
        None => {
            errors.push("date_of_birth", REQUIRED);
            None
        }
        Some(raw) => {
            let parsed = parse_date_of_birth(raw);
            if parsed.is_none() {
                errors.push(
                    "date_of_birth",
                    "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
                );
            }
            parsed
        }
    };

    let email = match email {
        None => {
            errors.push("email", REQUIRED);
            None
        }
        Some(raw) => match EmailAddress::parse(raw) {
            Ok(email) => Some(email),
            Err(EmailError::Empty) => {
                errors.push("email", BLANK);
                None
            }
            Err(e @ EmailError::Invalid) => {
                errors.push("email", e.to_string());
                None
            }
        },
    };

    match (full_name, date_of_birth, email) {
        (Some(full_name), Some(date_of_birth), Some(email)) => errors.into_result(|| NewPatient {
            full_name,
            date_of_birth,
            email,
        }),
        _ => Err(ConsultError::InvalidRequest(errors.0.join(" "))),
    }
}

/// Validates the fields of a consultation creation request.
///
/// Whether `patient` refers to an existing patient is checked by the store.
pub fn new_consultation(
    patient: Option<PatientId>,
    symptoms: Option<&str>,
    diagnosis: Option<&str>,
) -> ConsultResult<NewConsultation> {
    let mut errors = FieldErrors::default();

    if patient.is_none() {
        errors.push("patient", REQUIRED);
    }

    let symptoms = match symptoms {
        None => {
            errors.push("symptoms", REQUIRED);
            None
        }
        Some(raw) => match NonEmptyText::new(raw) {
            Ok(text) => Some(text),
            Err(_) => {
                errors.push("symptoms", BLANK);
                None
            }
        },
    };

    match (patient, symptoms) {
        (Some(patient_id), Some(symptoms)) => errors.into_result(|| NewConsultation {
            patient_id,
            symptoms,
            diagnosis: diagnosis.map(str::trim).unwrap_or_default().to_string(),
        }),
        _ => Err(ConsultError::InvalidRequest(errors.0.join(" "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(err: ConsultError) -> String {
        match err {
            ConsultError::InvalidRequest(msg) => msg,
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn valid_patient_is_normalised() {
        let patient = new_patient(
            Some("  Jane Doe "),
            Some("1990-05-15"),
            Some("Jane@Example.com"),
        )
        .expect("valid input");

        assert_eq!(patient.full_name.as_str(), "Jane Doe");
        assert_eq!(
            patient.date_of_birth,
            NaiveDate::from_ymd_opt(1990, 5, 15).unwrap()
        );
        assert_eq!(patient.email.as_str(), "jane@example.com");
    }

    #[test]
    fn missing_patient_fields_are_all_reported() {
        let msg = detail(new_patient(None, None, None).unwrap_err());
        assert!(msg.contains("full_name: This field is required."));
        assert!(msg.contains("date_of_birth: This field is required."));
        assert!(msg.contains("email: This field is required."));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let msg = detail(
            new_patient(Some("Bad Date"), Some("not-a-date"), Some("bad@example.com"))
                .unwrap_err(),
        );
        assert!(msg.starts_with("date_of_birth:"));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(MAX_FULL_NAME_LEN + 1);
        let msg = detail(
            new_patient(Some(&name), Some("2000-01-01"), Some("a@example.com")).unwrap_err(),
        );
        assert!(msg.contains("no more than 255 characters"));
    }

    #[test]
    fn consultation_diagnosis_defaults_to_empty() {
        let consultation = new_consultation(Some(7), Some("Headache"), None).unwrap();
        assert_eq!(consultation.patient_id, 7);
        assert_eq!(consultation.symptoms.as_str(), "Headache");
        assert_eq!(consultation.diagnosis, "");
    }

    #[test]
    fn consultation_requires_patient_and_symptoms() {
        let msg = detail(new_consultation(None, Some("   "), Some("x")).unwrap_err());
        assert!(msg.contains("patient: This field is required."));
        assert!(msg.contains("symptoms: This field may not be blank."));

        let msg = detail(new_consultation(Some(1), None, None).unwrap_err());
        assert_eq!(msg, "symptoms: This field is required.");
    }
}
