// src/handlers/dashboard.rs
use axum::{extract::{Extension, State}, Json};
use tracing::instrument;

use crate::dtos::dashboard::{DashboardStatsResponse, InvoiceCounts, QuoteCounts};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

#[derive(Debug, sqlx::FromRow)]
struct QuoteCountsRow {
    total: i64,
    accepted: i64,
    refused: i64,
    pending: i64,
    expired: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceCountsRow {
    total: i64,
    paid: i64,
    pending: i64,
}

// GET /dashboard/stats - scoped counters for the landing page
#[instrument(skip(db_pool, auth))]
pub async fn dashboard_stats(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DashboardStatsResponse>, AppError> {
    let scope = auth.scope();
    let admin = scope.is_admin();
    let user_id = scope.user_id();

    let quotes = sqlx::query_as::<_, QuoteCountsRow>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'accepted') AS accepted,
                COUNT(*) FILTER (WHERE status = 'refused') AS refused,
                COUNT(*) FILTER (WHERE status = 'sent' AND valid_until >= NOW()) AS pending,
                COUNT(*) FILTER (WHERE status IN ('draft', 'sent') AND valid_until < NOW()) AS expired
         FROM quotes WHERE ($1 OR created_by = $2)",
    )
    .bind(admin)
    .bind(user_id)
    .fetch_one(&db_pool)
    .await?;

    let invoices = sqlx::query_as::<_, InvoiceCountsRow>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'paid') AS paid,
                COUNT(*) FILTER (WHERE status = 'sent') AS pending
         FROM invoices WHERE ($1 OR created_by = $2)",
    )
    .bind(admin)
    .bind(user_id)
    .fetch_one(&db_pool)
    .await?;

    let total_clients = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM clients WHERE ($1 OR created_by = $2)",
    )
    .bind(admin)
    .bind(user_id)
    .fetch_one(&db_pool)
    .await?;

    let total_products = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products WHERE ($1 OR created_by = $2)",
    )
    .bind(admin)
    .bind(user_id)
    .fetch_one(&db_pool)
    .await?;

    Ok(Json(DashboardStatsResponse {
        quotes: QuoteCounts {
            total: quotes.total,
            accepted: quotes.accepted,
            refused: quotes.refused,
            pending: quotes.pending,
            expired: quotes.expired,
        },
        invoices: InvoiceCounts {
            total: invoices.total,
            paid: invoices.paid,
            pending: invoices.pending,
        },
        total_clients,
        total_products,
    }))
}
