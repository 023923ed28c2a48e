use axum::{
    routing::get,
    Router,
};
use crate::state::AppState;
use crate::handlers::client;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(client::list_clients).post(client::create_client))
        .route(
            "/clients/{id}",
            get(client::get_client)
                .put(client::update_client)
                .delete(client::delete_client),
        )
        .route_layer(axum::middleware::from_fn(require_auth))
}
