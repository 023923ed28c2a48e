use axum::{routing::get, Router};
use crate::state::AppState;
use crate::handlers::dashboard;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(dashboard::dashboard_stats))
        .route_layer(axum::middleware::from_fn(require_auth))
}
