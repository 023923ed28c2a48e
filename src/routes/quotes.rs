use axum::{
    routing::{get, post, put},
    Router,
};
use crate::state::AppState;
use crate::handlers::quote;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quotes", get(quote::list_quotes).post(quote::create_quote))
        .route(
            "/quotes/{id}",
            get(quote::get_quote)
                .put(quote::update_quote)
                .delete(quote::delete_quote),
        )
        .route("/quotes/{id}/status", put(quote::change_quote_status))
        .route("/quotes/{id}/convert", post(quote::convert_quote))
        .route("/quotes/status/{status}", get(quote::list_quotes_by_status))
        .route("/quotes/stats/overview", get(quote::quote_stats))
        .route_layer(axum::middleware::from_fn(require_auth))
}
