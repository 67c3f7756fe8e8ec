use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Administration dashboard. Each handler requires the `administration` feature, which
/// only `administrador` and `superusuario` hold.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Users, patients, analyses and unread notifications.
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/users?role=...
        .route("/users", get(handlers::list_users))
}
