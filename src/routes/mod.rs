pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod products;
pub mod quotes;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(clients::routes())
        .merge(products::routes())
        .merge(quotes::routes())
        .merge(invoices::routes())
        .merge(dashboard::routes())
}
