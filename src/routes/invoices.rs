use axum::{
    routing::{get, put},
    Router,
};
use crate::state::AppState;
use crate::handlers::invoice;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(invoice::list_invoices).post(invoice::create_invoice))
        .route(
            "/invoices/{id}",
            get(invoice::get_invoice)
                .put(invoice::update_invoice)
                .delete(invoice::delete_invoice),
        )
        .route("/invoices/{id}/status", put(invoice::change_invoice_status))
        .route_layer(axum::middleware::from_fn(require_auth))
}
