//! HTTP handlers.

use crate::error::ApiError;
use crate::links::{page_links, LinkParams};
use crate::AppState;
use api_shared::{
    ConsultationPage, ConsultationRes, CreateConsultationReq, CreatePatientReq, ErrorRes, HealthRes,
    HealthService, PatientPage, PatientRes, SummaryAcceptedRes, SummaryJobRes,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use consult_core::{validation, PageRequest, PatientId, SummaryMode};
use serde::Deserialize;
use utoipa::IntoParams;

pub const SUMMARY_STARTED: &str = "Summary generation started.";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number.
    page: Option<String>,
    /// Items per page, at most 50.
    page_size: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConsultationParams {
    /// 1-based page number.
    page: Option<String>,
    /// Items per page, at most 50.
    page_size: Option<String>,
    /// Only consultations of this patient id.
    patient: Option<String>,
}

/// Path ids are integers; anything else cannot name a record.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found())
}

fn link_params(request: PageRequest, page_size: Option<&str>, patient: Option<PatientId>) -> LinkParams {
    LinkParams {
        page_size: page_size.map(|_| request.page_size),
        patient,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients/",
    params(PageParams),
    responses(
        (status = 200, description = "Page of patients", body = PatientPage),
        (status = 404, description = "Invalid page", body = ErrorRes)
    )
)]
/// List patients ordered by name.
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PatientPage>, ApiError> {
    let Query(params) = query?;
    let request = PageRequest::from_query(params.page.as_deref(), params.page_size.as_deref())?;

    let page = state.store.list_patients(request)?;
    let (next, previous) = page_links(
        uri.path(),
        &page,
        link_params(request, params.page_size.as_deref(), None),
    );

    Ok(Json(PatientPage {
        count: page.count,
        next,
        previous,
        results: page.items.into_iter().map(PatientRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients/",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient created", body = PatientRes),
        (status = 400, description = "Missing or malformed field, or duplicate email", body = ErrorRes)
    )
)]
/// Create a patient.
///
/// The email is stored lowercase and must be unique ignoring case.
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<CreatePatientReq>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let Json(req) = payload?;
    let new = validation::new_patient(
        req.full_name.as_deref(),
        req.date_of_birth.as_deref(),
        req.email.as_deref(),
    )?;

    let patient = state.store.create_patient(new)?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    get,
    path = "/consultations/",
    params(ConsultationParams),
    responses(
        (status = 200, description = "Page of consultations, newest first", body = ConsultationPage),
        (status = 400, description = "Non-numeric patient filter", body = ErrorRes),
        (status = 404, description = "Invalid page", body = ErrorRes)
    )
)]
/// List consultations, optionally for one patient.
///
/// An unknown patient id yields an empty page.
#[axum::debug_handler]
pub async fn list_consultations(
    State(state): State<AppState>,
    uri: Uri,
    query: Result<Query<ConsultationParams>, QueryRejection>,
) -> Result<Json<ConsultationPage>, ApiError> {
    let Query(params) = query?;
    let patient = match params.patient.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<PatientId>().map_err(|_| {
            ApiError::new(StatusCode::BAD_REQUEST, "patient: Enter a whole number.")
        })?),
    };
    let request = PageRequest::from_query(params.page.as_deref(), params.page_size.as_deref())?;

    let page = state.store.list_consultations(patient, request)?;
    let (next, previous) = page_links(
        uri.path(),
        &page,
        link_params(request, params.page_size.as_deref(), patient),
    );

    Ok(Json(ConsultationPage {
        count: page.count,
        next,
        previous,
        results: page.items.into_iter().map(ConsultationRes::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/consultations/",
    request_body = CreateConsultationReq,
    responses(
        (status = 201, description = "Consultation created with no summary", body = ConsultationRes),
        (status = 400, description = "Unknown patient or missing symptoms", body = ErrorRes)
    )
)]
/// Create a consultation. `ai_summary` in the body is ignored.
#[axum::debug_handler]
pub async fn create_consultation(
    State(state): State<AppState>,
    payload: Result<Json<CreateConsultationReq>, JsonRejection>,
) -> Result<(StatusCode, Json<ConsultationRes>), ApiError> {
    let Json(req) = payload?;
    let new = validation::new_consultation(req.patient, req.symptoms.as_deref(), req.diagnosis.as_deref())?;

    let consultation = state.store.create_consultation(new)?;
    Ok((StatusCode::CREATED, Json(consultation.into())))
}

#[utoipa::path(
    get,
    path = "/consultations/{id}/",
    params(("id" = i64, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "The consultation", body = ConsultationRes),
        (status = 404, description = "Unknown consultation", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConsultationRes>, ApiError> {
    let consultation = state.store.get_consultation(parse_id(&id)?)?;
    Ok(Json(consultation.into()))
}

#[utoipa::path(
    post,
    path = "/consultations/{id}/generate-summary/",
    params(("id" = i64, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "Summary generated (synchronous mode)", body = ConsultationRes),
        (status = 202, description = "Summary job queued (asynchronous mode)", body = SummaryAcceptedRes),
        (status = 400, description = "Consultation has no symptoms", body = ErrorRes),
        (status = 404, description = "Unknown consultation", body = ErrorRes),
        (status = 503, description = "AI provider unavailable (synchronous mode)", body = ErrorRes)
    )
)]
/// Generate or regenerate the AI summary of a consultation.
///
/// In synchronous mode the request waits for the provider and returns the updated
/// consultation. In asynchronous mode the consultation is checked, a job is queued and
/// its id returned; progress is visible at `/summary-jobs/{id}/`.
#[axum::debug_handler]
pub async fn generate_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;

    match state.mode {
        SummaryMode::Sync => {
            let consultation = state.summaries.generate(id).await?;
            Ok(Json(ConsultationRes::from(consultation)).into_response())
        }
        SummaryMode::Async => {
            state.summaries.check_eligible(id)?;
            let job = state.jobs.submit(id)?;
            let body = SummaryAcceptedRes {
                detail: SUMMARY_STARTED.into(),
                job_id: job.id,
            };
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/summary-jobs/{id}/",
    params(("id" = i64, Path, description = "Summary job id")),
    responses(
        (status = 200, description = "The job record", body = SummaryJobRes),
        (status = 404, description = "Unknown job", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_summary_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SummaryJobRes>, ApiError> {
    let job = state.jobs.queue().get(parse_id(&id)?)?;
    Ok(Json(job.into()))
}
