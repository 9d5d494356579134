//! Mapping from core errors to HTTP responses.

use api_shared::ErrorRes;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use consult_core::ConsultError;

/// An error response: a status code and a `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found.")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<ConsultError> for ApiError {
    fn from(err: ConsultError) -> Self {
        match err {
            ConsultError::NotFound(detail) => Self::new(StatusCode::NOT_FOUND, detail),
            ConsultError::InvalidRequest(detail) => Self::new(StatusCode::BAD_REQUEST, detail),
            ConsultError::ServiceUnavailable(detail) => {
                tracing::warn!("AI provider unavailable: {detail}");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, detail)
            }
            other => {
                tracing::error!("request failed: {other}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("JSON parse error - {}", rejection.body_text()),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorRes { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_keep_their_message() {
        let err = ApiError::from(ConsultError::InvalidRequest("symptoms: This field is required.".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "symptoms: This field is required.");

        let err = ApiError::from(ConsultError::NotFound("Invalid page.".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let err = ApiError::from(ConsultError::LockPoisoned);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), "Internal server error");
    }
}
