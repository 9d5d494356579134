use crate::ai::AiServiceError;

/// Errors raised by core record, summary and job operations.
///
/// The first three variants are the caller-facing kinds the API layer maps to 404, 400
/// and 503. Everything else is an internal failure.
#[derive(Debug, thiserror::Error)]
pub enum ConsultError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("migration v{version} failed: {reason}")]
    MigrationFailed { version: i64, reason: String },
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("invalid stored value in {column}: {value}")]
    CorruptRow { column: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
}

impl ConsultError {
    /// Whether the failure is worth another attempt from a background job.
    ///
    /// Caller mistakes (`NotFound`, `InvalidRequest`) and configuration problems are
    /// permanent; provider outages and database hiccups are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConsultError::ServiceUnavailable(_)
                | ConsultError::Database(_)
                | ConsultError::LockPoisoned
        )
    }
}

impl From<AiServiceError> for ConsultError {
    fn from(err: AiServiceError) -> Self {
        ConsultError::ServiceUnavailable(err.to_string())
    }
}

pub type ConsultResult<T> = std::result::Result<T, ConsultError>;
