use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Every handler here receives a validated `AuthUser`. Feature access and patient
/// scoping are checked inside the handlers against the role registry.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // GET /landing?subjectId=...
        // Landing path for the caller's role, used by navigation guards and redirects.
        .route("/landing", get(handlers::resolve_landing))
        // --- Patient History ---
        // GET /history/notifications?patientId=...
        .route("/history/notifications", get(handlers::get_notifications))
        // GET /history/analyses?patientId=...
        .route("/history/analyses", get(handlers::get_analyses))
        // PATCH /notifications/{id}/read
        .route(
            "/notifications/{id}/read",
            patch(handlers::mark_notification_read),
        )
        // --- Anamnesis & Risk Analysis ---
        // POST /anamnesis submits an intake form; GET returns the latest one.
        .route(
            "/anamnesis",
            post(handlers::submit_anamnesis).get(handlers::get_anamnesis),
        )
        // POST /analyses
        // Forwards the latest anamnesis to the external risk model.
        .route("/analyses", post(handlers::request_analysis))
        // --- Role Dashboards ---
        .route("/patients", get(handlers::list_patients))
        .route("/employer/overview", get(handlers::employer_overview))
}
