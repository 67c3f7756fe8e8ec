use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without authentication. None of them read patient history.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /onboarding/roles
        // Role labels, landing paths and feature sets for the onboarding screen.
        .route("/onboarding/roles", get(handlers::list_roles))
        // POST /onboarding
        // Creates the profile for the token's subject and returns its landing path.
        .route("/onboarding", post(handlers::onboard))
        // POST /session
        // Trades a token for the httpOnly session cookie.
        .route("/session", post(handlers::create_session))
        // POST /session/logout
        // Expires the session cookie immediately.
        .route("/session/logout", post(handlers::logout))
}
