use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod analysis;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod roles;
pub mod session;

// Routers split by access level (public, authenticated, admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use analysis::{AnalysisState, HttpAnalysisClient, MockAnalysisService};
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use roles::{Resolution, RoleRegistry, RoleRouter};

/// ApiDoc
///
/// OpenAPI document for every annotated handler and schema, served at
/// `/api-docs/openapi.json` and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_roles, handlers::resolve_landing, handlers::onboard,
        handlers::create_session, handlers::logout, handlers::get_me,
        handlers::get_notifications, handlers::get_analyses, handlers::mark_notification_read,
        handlers::submit_anamnesis, handlers::get_anamnesis, handlers::request_analysis,
        handlers::list_patients, handlers::employer_overview, handlers::get_admin_stats,
        handlers::list_users
    ),
    components(
        schemas(
            roles::Role, roles::Feature, roles::RoleDefinition, roles::Resolution,
            models::User, models::Notification, models::RiskAnalysis, models::Anamnesis,
            models::OnboardingRequest, models::SessionRequest, models::SubmitAnamnesisRequest,
            models::RequestAnalysisRequest, models::NotificationsResponse,
            models::AnalysesResponse, models::RolesResponse, models::UserProfile,
            models::AdminDashboardStats, models::RiskLevelCount, models::ErrorBody,
        )
    ),
    tags(
        (name = "salud-portal", description = "Patient/physician dashboard API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for every service a handler may need. Cloned per request;
/// all members are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Patient history and profiles.
    pub repo: RepositoryState,
    /// Client for the external risk model.
    pub analysis: AnalysisState,
    pub config: AppConfig,
    /// Role resolution and feature gating, built once at startup.
    pub roles: Arc<RoleRouter>,
}

impl AppState {
    /// State wired with the built-in role registry.
    pub fn new(repo: RepositoryState, analysis: AnalysisState, config: AppConfig) -> Self {
        Self {
            repo,
            analysis,
            config,
            roles: Arc::new(RoleRouter::new(Arc::new(RoleRegistry::builtin()))),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects unauthenticated requests before they reach a handler: the `AuthUser`
/// extractor answers 401 on its own when it cannot resolve an identity.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles routes, middleware and state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers authenticate through their own `AuthUser` argument and then
        // check the administration feature.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying method, uri and the `x-request-id` so every log line of a
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
