// src/handlers/invoice.rs
//
// Invoice CRUD and the draft -> sent -> paid status machine. Invoices are
// created either directly here or by quote conversion (handlers::quote).
use std::collections::HashMap;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use crate::database;
use crate::domain::numbering::DocumentKind;
use crate::domain::status::{InvoiceEvent, InvoiceStatus};
use crate::domain::totals::{self, LineInput};
use crate::dtos::document::{ChangeStatusRequest, ClientSummary, LineResponse, TotalsResponse};
use crate::dtos::invoice::{CreateInvoiceRequest, InvoiceResponse, UpdateInvoiceRequest};
use crate::error::{self, AppError};
use crate::handlers::lines::{
    ensure_client_in_scope, resolve_lines, ResolvedLine, DEFAULT_TERMS, DEFAULT_VAT_PERCENT,
};
use crate::middleware::auth::AuthContext;
use crate::models::invoice::{Invoice, InvoiceLine};
use crate::state::AppState;

const INVOICE_SELECT: &str =
    "SELECT i.id, i.number, i.client_id, i.status, i.due_date,
            i.global_discount_percent, i.vat_percent, i.terms, i.notes,
            i.paid_at, i.source_quote_id, i.created_by, i.created_at,
            c.name AS client_name, c.email AS client_email, c.company AS client_company
     FROM invoices i
     JOIN clients c ON i.client_id = c.id";

async fn fetch_invoice_row(db_pool: &PgPool, id: i64) -> Result<Option<Invoice>, AppError> {
    let invoice = sqlx::query_as::<_, Invoice>(&format!("{INVOICE_SELECT} WHERE i.id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(invoice)
}

async fn fetch_lines(
    db_pool: &PgPool,
    invoice_ids: &[i64],
) -> Result<HashMap<i64, Vec<InvoiceLine>>, AppError> {
    let rows = sqlx::query_as::<_, InvoiceLine>(
        "SELECT id, invoice_id, product_id, product_name, quantity, unit_price,
                discount_percent, position
         FROM invoice_lines
         WHERE invoice_id = ANY($1)
         ORDER BY invoice_id, position",
    )
    .bind(invoice_ids)
    .fetch_all(db_pool)
    .await?;

    let mut by_invoice: HashMap<i64, Vec<InvoiceLine>> = HashMap::new();
    for row in rows {
        by_invoice.entry(row.invoice_id).or_default().push(row);
    }
    Ok(by_invoice)
}

fn to_response(invoice: Invoice, lines: Vec<InvoiceLine>) -> InvoiceResponse {
    let inputs: Vec<LineInput> = lines
        .iter()
        .map(|l| LineInput {
            quantity: l.quantity,
            unit_price: l.unit_price,
            discount_percent: l.discount_percent,
        })
        .collect();
    let computed =
        totals::compute_totals(&inputs, invoice.global_discount_percent, invoice.vat_percent);

    InvoiceResponse {
        id: invoice.id,
        number: invoice.number,
        client: ClientSummary {
            id: invoice.client_id,
            name: invoice.client_name,
            email: invoice.client_email,
            company: invoice.client_company,
        },
        status: invoice.status,
        due_date: invoice.due_date,
        lines: lines
            .into_iter()
            .map(|l| {
                LineResponse::new(
                    l.id,
                    l.product_id,
                    l.product_name,
                    l.quantity,
                    l.unit_price,
                    l.discount_percent,
                )
            })
            .collect(),
        global_discount_percent: invoice.global_discount_percent,
        vat_percent: invoice.vat_percent,
        totals: TotalsResponse::from(computed),
        terms: invoice.terms,
        notes: invoice.notes,
        paid_at: invoice.paid_at,
        source_quote_id: invoice.source_quote_id,
        created_by: invoice.created_by,
        created_at: invoice.created_at,
    }
}

pub(crate) async fn fetch_invoice_response(
    db_pool: &PgPool,
    id: i64,
) -> Result<InvoiceResponse, AppError> {
    let invoice = fetch_invoice_row(db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice not found"))?;
    let mut lines = fetch_lines(db_pool, &[id]).await?;
    Ok(to_response(invoice, lines.remove(&id).unwrap_or_default()))
}

async fn insert_invoice_lines(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: i64,
    lines: &[ResolvedLine],
) -> Result<(), sqlx::Error> {
    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            "INSERT INTO invoice_lines (invoice_id, product_id, product_name, quantity,
                                        unit_price, discount_percent, position)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(invoice_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount_percent)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// GET /invoices - List invoices visible to the caller, newest first
#[instrument(skip(db_pool, auth))]
pub async fn list_invoices(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let scope = auth.scope();
    let invoices = sqlx::query_as::<_, Invoice>(&format!(
        "{INVOICE_SELECT} WHERE ($1 OR i.created_by = $2) ORDER BY i.created_at DESC"
    ))
    .bind(scope.is_admin())
    .bind(scope.user_id())
    .fetch_all(&db_pool)
    .await?;

    let ids: Vec<i64> = invoices.iter().map(|i| i.id).collect();
    let mut lines = fetch_lines(&db_pool, &ids).await?;

    Ok(Json(
        invoices
            .into_iter()
            .map(|i| {
                let invoice_lines = lines.remove(&i.id).unwrap_or_default();
                to_response(i, invoice_lines)
            })
            .collect(),
    ))
}

// GET /invoices/{id}
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn get_invoice(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = fetch_invoice_row(&db_pool, id)
        .await?
        .filter(|i| auth.scope().allows(i.created_by))
        .ok_or_else(|| AppError::not_found("Invoice not found"))?;

    let mut lines = fetch_lines(&db_pool, &[id]).await?;
    Ok(Json(to_response(invoice, lines.remove(&id).unwrap_or_default())))
}

// POST /invoices - direct creation, independent of any quote
#[instrument(skip(db_pool, auth, payload))]
pub async fn create_invoice(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let scope = auth.scope();
    let vat_percent = payload.vat_percent.unwrap_or(DEFAULT_VAT_PERCENT);

    ensure_client_in_scope(&db_pool, scope, payload.client_id).await?;
    let lines = resolve_lines(
        &db_pool,
        scope,
        &payload.lines,
        payload.global_discount_percent,
        vat_percent,
    )
    .await?;

    let due_date = payload
        .due_date
        .unwrap_or_else(|| Utc::now() + Duration::days(30));
    let terms = payload
        .terms
        .unwrap_or_else(|| DEFAULT_TERMS.to_string());

    let mut invoice_id = None;
    for attempt in 0..2 {
        let mut tx = db_pool.begin().await?;
        let number = database::next_document_number(&mut *tx, DocumentKind::Invoice).await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO invoices (number, client_id, due_date, global_discount_percent,
                                   vat_percent, terms, notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(&number)
        .bind(payload.client_id)
        .bind(due_date)
        .bind(payload.global_discount_percent)
        .bind(vat_percent)
        .bind(&terms)
        .bind(&payload.notes)
        .bind(auth.user_id)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(id) => {
                insert_invoice_lines(&mut tx, id, &lines).await?;
                tx.commit().await?;
                invoice_id = Some(id);
                break;
            }
            Err(e) if error::is_unique_violation(&e) && attempt == 0 => {
                tracing::warn!(%number, "Duplicate invoice number, retrying with a fresh one");
                tx.rollback().await.ok();
            }
            Err(e) => return Err(e.into()),
        }
    }
    let invoice_id = invoice_id
        .ok_or_else(|| AppError::conflict("Could not allocate a unique invoice number"))?;

    tracing::info!(invoice_id, user = %auth.email, "Invoice created");

    let response = fetch_invoice_response(&db_pool, invoice_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// PUT /invoices/{id} - number, status and owner are immutable here
#[instrument(skip(db_pool, auth, payload), fields(id))]
pub async fn update_invoice(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let scope = auth.scope();
    let invoice = fetch_invoice_row(&db_pool, id)
        .await?
        .filter(|i| scope.allows(i.created_by))
        .ok_or_else(|| AppError::not_found("Invoice not found"))?;

    if let Some(client_id) = payload.client_id {
        ensure_client_in_scope(&db_pool, scope, client_id).await?;
    }

    let global_discount = payload
        .global_discount_percent
        .unwrap_or(invoice.global_discount_percent);
    let vat_percent = payload.vat_percent.unwrap_or(invoice.vat_percent);
    if !(0.0..=100.0).contains(&global_discount) {
        return Err(AppError::validation("Global discount must be between 0 and 100"));
    }
    if vat_percent < 0.0 {
        return Err(AppError::validation("VAT rate cannot be negative"));
    }

    let new_lines = match payload.lines.as_deref() {
        Some(requests) => {
            Some(resolve_lines(&db_pool, scope, requests, global_discount, vat_percent).await?)
        }
        None => None,
    };

    let mut tx = db_pool.begin().await?;

    sqlx::query(
        "UPDATE invoices SET
             client_id = COALESCE($2, client_id),
             due_date = COALESCE($3, due_date),
             global_discount_percent = COALESCE($4, global_discount_percent),
             vat_percent = COALESCE($5, vat_percent),
             terms = COALESCE($6, terms),
             notes = COALESCE($7, notes),
             updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(payload.client_id)
    .bind(payload.due_date)
    .bind(payload.global_discount_percent)
    .bind(payload.vat_percent)
    .bind(&payload.terms)
    .bind(&payload.notes)
    .execute(&mut *tx)
    .await?;

    if let Some(lines) = &new_lines {
        sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_invoice_lines(&mut tx, id, lines).await?;
    }

    tx.commit().await?;

    Ok(Json(fetch_invoice_response(&db_pool, id).await?))
}

// DELETE /invoices/{id}
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn delete_invoice(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    fetch_invoice_row(&db_pool, id)
        .await?
        .filter(|i| auth.scope().allows(i.created_by))
        .ok_or_else(|| AppError::not_found("Invoice not found"))?;

    // quotes.linked_invoice_id is ON DELETE SET NULL, so a quote pointing at
    // this invoice simply loses the link.
    sqlx::query("DELETE FROM invoices WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Invoice deleted successfully" })))
}

// PUT /invoices/{id}/status
#[instrument(skip(db_pool, auth, payload), fields(id))]
pub async fn change_invoice_status(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<ChangeStatusRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = fetch_invoice_row(&db_pool, id)
        .await?
        .filter(|i| auth.scope().allows(i.created_by))
        .ok_or_else(|| AppError::not_found("Invoice not found"))?;

    let target = InvoiceStatus::parse(&payload.status).ok_or_else(|| {
        AppError::validation(format!("Unknown invoice status '{}'", payload.status))
    })?;
    let event = InvoiceEvent::for_target(target).ok_or_else(|| {
        AppError::validation(format!("Status '{}' cannot be set directly", payload.status))
    })?;

    let current = InvoiceStatus::parse(&invoice.status)
        .ok_or_else(|| AppError::internal(format!("Corrupt invoice status '{}'", invoice.status)))?;

    let next = current
        .apply(event)
        .map_err(|e| AppError::invalid_state(e.to_string()))?;

    // The UPDATE re-checks the status it was computed from, so a racing
    // transition on the same invoice cannot land on top of this one.
    let result = match event {
        InvoiceEvent::Send => {
            sqlx::query(
                "UPDATE invoices SET status = $2, updated_at = NOW()
                 WHERE id = $1 AND status = $3",
            )
            .bind(id)
            .bind(next.as_str())
            .bind(current.as_str())
            .execute(&db_pool)
            .await?
        }
        InvoiceEvent::MarkPaid => {
            sqlx::query(
                "UPDATE invoices SET status = $2, paid_at = NOW(), updated_at = NOW()
                 WHERE id = $1 AND status = $3",
            )
            .bind(id)
            .bind(next.as_str())
            .bind(current.as_str())
            .execute(&db_pool)
            .await?
        }
    };
    if result.rows_affected() == 0 {
        return Err(AppError::invalid_state(format!(
            "Invoice is no longer in status '{}'",
            current.as_str()
        )));
    }

    tracing::info!(invoice_id = id, from = current.as_str(), to = next.as_str(), "Invoice status changed");

    Ok(Json(fetch_invoice_response(&db_pool, id).await?))
}
