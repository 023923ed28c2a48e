use axum::{
    routing::{get, patch, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::user;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    // Register and login are the only open routes in the API
    let open = Router::new()
        .route("/auth/register", post(user::register_user))
        .route("/auth/login", post(user::login_user));

    let protected = Router::new()
        .route("/auth/me", get(user::get_me))
        .route("/users", get(user::list_users))
        .route("/users/{id}/role", patch(user::update_role))
        .route_layer(axum::middleware::from_fn(require_auth));

    open.merge(protected)
}
