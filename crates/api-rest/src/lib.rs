//! # API REST
//!
//! REST API implementation for the consultation service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON errors, pagination links, CORS)
//!
//! Uses `api-shared` for request/response bodies and `consult-core` for everything else.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod links;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, MethodRouter},
    Router,
};
use consult_core::{
    ai::build_summary_client, ConsultResult, CoreConfig, Database, JobSubmitter, RecordStore,
    SqliteJobQueue, SqliteRecordStore, SummaryMode, SummaryService,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub summaries: SummaryService,
    pub jobs: JobSubmitter,
    pub mode: SummaryMode,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        summaries: SummaryService,
        jobs: JobSubmitter,
        mode: SummaryMode,
    ) -> Self {
        Self {
            store,
            summaries,
            jobs,
            mode,
        }
    }

    /// Open the database and build the configured AI client.
    pub fn from_config(cfg: &CoreConfig) -> ConsultResult<Self> {
        let db = Database::open(cfg.database_path())?;
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(db.clone()));
        let client = build_summary_client(cfg.ai())?;
        let jobs = JobSubmitter::new(Arc::new(SqliteJobQueue::new(db)));

        Ok(Self::new(
            store.clone(),
            SummaryService::new(store, client),
            jobs,
            cfg.summary_mode(),
        ))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_patients,
        handlers::create_patient,
        handlers::list_consultations,
        handlers::create_consultation,
        handlers::get_consultation,
        handlers::generate_summary,
        handlers::get_summary_job,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::CreatePatientReq,
        api_shared::PatientRes,
        api_shared::PatientPage,
        api_shared::CreateConsultationReq,
        api_shared::ConsultationRes,
        api_shared::ConsultationPage,
        api_shared::SummaryAcceptedRes,
        api_shared::SummaryJobRes,
    ))
)]
pub struct ApiDoc;

/// Register `path` both with and without a trailing slash.
fn route_both(router: Router<AppState>, path: &str, method_router: MethodRouter<AppState>) -> Router<AppState> {
    router
        .route(path, method_router.clone())
        .route(&format!("{path}/"), method_router)
}

/// The full REST application: endpoints, Swagger UI and CORS.
pub fn router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let mut app = Router::new().route("/health", get(handlers::health));
    app = route_both(
        app,
        "/patients",
        get(handlers::list_patients).post(handlers::create_patient),
    );
    app = route_both(
        app,
        "/consultations",
        get(handlers::list_consultations).post(handlers::create_consultation),
    );
    app = route_both(app, "/consultations/:id", get(handlers::get_consultation));
    app = route_both(
        app,
        "/consultations/:id/generate-summary",
        axum::routing::post(handlers::generate_summary),
    );
    app = route_both(app, "/summary-jobs/:id", get(handlers::get_summary_job));

    app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(cors_allowed_origins))
        .with_state(state)
}

/// CORS for the configured origins; `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}
