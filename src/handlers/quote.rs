// src/handlers/quote.rs
//
// Quote CRUD plus the status machine and the quote -> invoice conversion.
// Totals are recomputed from the lines on every response; the status a
// caller sees is the effective one (draft/sent past valid_until reads as
// expired).
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
use crate::domain::status::{check_convertible, QuoteEvent, QuoteStatus};
use crate::domain::totals::{self, LineInput};
use crate::dtos::document::{ChangeStatusRequest, ClientSummary, LineResponse, TotalsResponse};
use crate::dtos::quote::{
    ConvertQuoteResponse, CreateQuoteRequest, QuoteResponse, QuoteStatsResponse,
    UpdateQuoteRequest,
};
use crate::error::{self, AppError};
use crate::handlers::invoice;
use crate::handlers::lines::{
    ensure_client_in_scope, resolve_lines, ResolvedLine, DEFAULT_TERMS, DEFAULT_VAT_PERCENT,
};
use crate::middleware::auth::AuthContext;
use crate::models::quote::{Quote, QuoteLine};
use crate::state::AppState;

const QUOTE_SELECT: &str =
    "SELECT q.id, q.number, q.client_id, q.status, q.valid_until,
            q.global_discount_percent, q.vat_percent, q.terms, q.notes,
            q.linked_invoice_id, q.accepted_at, q.refused_at, q.refusal_reason,
            q.created_by, q.created_at,
            c.name AS client_name, c.email AS client_email, c.company AS client_company
     FROM quotes q
     JOIN clients c ON q.client_id = c.id";

async fn fetch_quote_row(db_pool: &PgPool, id: i64) -> Result<Option<Quote>, AppError> {
    let quote = sqlx::query_as::<_, Quote>(&format!("{QUOTE_SELECT} WHERE q.id = $1"))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(quote)
}

async fn fetch_lines(
    db_pool: &PgPool,
    quote_ids: &[i64],
) -> Result<HashMap<i64, Vec<QuoteLine>>, AppError> {
    let rows = sqlx::query_as::<_, QuoteLine>(
        "SELECT id, quote_id, product_id, product_name, quantity, unit_price,
                discount_percent, position
         FROM quote_lines
         WHERE quote_id = ANY($1)
         ORDER BY quote_id, position",
    )
    .bind(quote_ids)
    .fetch_all(db_pool)
    .await?;

    let mut by_quote: HashMap<i64, Vec<QuoteLine>> = HashMap::new();
    for row in rows {
        by_quote.entry(row.quote_id).or_default().push(row);
    }
    Ok(by_quote)
}

fn to_response(quote: Quote, lines: Vec<QuoteLine>, now: DateTime<Utc>) -> QuoteResponse {
    let status = QuoteStatus::parse(&quote.status)
        .map(|s| s.effective(quote.valid_until, now).as_str().to_string())
        .unwrap_or_else(|| quote.status.clone());

    let inputs: Vec<LineInput> = lines
        .iter()
        .map(|l| LineInput {
            quantity: l.quantity,
            unit_price: l.unit_price,
            discount_percent: l.discount_percent,
        })
        .collect();
    let computed = totals::compute_totals(&inputs, quote.global_discount_percent, quote.vat_percent);

    QuoteResponse {
        id: quote.id,
        number: quote.number,
        client: ClientSummary {
            id: quote.client_id,
            name: quote.client_name,
            email: quote.client_email,
            company: quote.client_company,
        },
        status,
        valid_until: quote.valid_until,
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
        global_discount_percent: quote.global_discount_percent,
        vat_percent: quote.vat_percent,
        totals: TotalsResponse::from(computed),
        terms: quote.terms,
        notes: quote.notes,
        linked_invoice_id: quote.linked_invoice_id,
        accepted_at: quote.accepted_at,
        refused_at: quote.refused_at,
        refusal_reason: quote.refusal_reason,
        created_by: quote.created_by,
        created_at: quote.created_at,
    }
}

async fn fetch_quote_response(db_pool: &PgPool, id: i64) -> Result<QuoteResponse, AppError> {
    let quote = fetch_quote_row(db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Quote not found"))?;
    let mut lines = fetch_lines(db_pool, &[id]).await?;
    Ok(to_response(
        quote,
        lines.remove(&id).unwrap_or_default(),
        Utc::now(),
    ))
}

async fn insert_quote_lines(
    tx: &mut Transaction<'_, Postgres>,
    quote_id: i64,
    lines: &[ResolvedLine],
) -> Result<(), sqlx::Error> {
    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            "INSERT INTO quote_lines (quote_id, product_id, product_name, quantity,
                                      unit_price, discount_percent, position)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(quote_id)
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

// GET /quotes - List quotes visible to the caller, newest first
#[instrument(skip(db_pool, auth))]
pub async fn list_quotes(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<QuoteResponse>>, AppError> {
    let scope = auth.scope();
    let quotes = sqlx::query_as::<_, Quote>(&format!(
        "{QUOTE_SELECT} WHERE ($1 OR q.created_by = $2) ORDER BY q.created_at DESC"
    ))
    .bind(scope.is_admin())
    .bind(scope.user_id())
    .fetch_all(&db_pool)
    .await?;

    let ids: Vec<i64> = quotes.iter().map(|q| q.id).collect();
    let mut lines = fetch_lines(&db_pool, &ids).await?;
    let now = Utc::now();

    Ok(Json(
        quotes
            .into_iter()
            .map(|q| {
                let quote_lines = lines.remove(&q.id).unwrap_or_default();
                to_response(q, quote_lines, now)
            })
            .collect(),
    ))
}

// GET /quotes/status/{status} - List quotes with the given effective status
#[instrument(skip(db_pool, auth), fields(status))]
pub async fn list_quotes_by_status(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(status): Path<String>,
) -> Result<Json<Vec<QuoteResponse>>, AppError> {
    let target = QuoteStatus::parse(&status)
        .ok_or_else(|| AppError::validation(format!("Unknown quote status '{status}'")))?;

    let scope = auth.scope();
    let quotes = sqlx::query_as::<_, Quote>(&format!(
        "{QUOTE_SELECT} WHERE ($1 OR q.created_by = $2) ORDER BY q.created_at DESC"
    ))
    .bind(scope.is_admin())
    .bind(scope.user_id())
    .fetch_all(&db_pool)
    .await?;

    let ids: Vec<i64> = quotes.iter().map(|q| q.id).collect();
    let mut lines = fetch_lines(&db_pool, &ids).await?;
    let now = Utc::now();

    Ok(Json(
        quotes
            .into_iter()
            .filter(|q| {
                QuoteStatus::parse(&q.status)
                    .map(|s| s.effective(q.valid_until, now) == target)
                    .unwrap_or(false)
            })
            .map(|q| {
                let quote_lines = lines.remove(&q.id).unwrap_or_default();
                to_response(q, quote_lines, now)
            })
            .collect(),
    ))
}

// GET /quotes/{id}
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn get_quote(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<QuoteResponse>, AppError> {
    let quote = fetch_quote_row(&db_pool, id)
        .await?
        .filter(|q| auth.scope().allows(q.created_by))
        .ok_or_else(|| AppError::not_found("Quote not found"))?;

    let mut lines = fetch_lines(&db_pool, &[id]).await?;
    Ok(Json(to_response(
        quote,
        lines.remove(&id).unwrap_or_default(),
        Utc::now(),
    )))
}

// POST /quotes
#[instrument(skip(db_pool, auth, payload))]
pub async fn create_quote(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<QuoteResponse>), AppError> {
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

    let valid_until = payload
        .valid_until
        .unwrap_or_else(|| Utc::now() + Duration::days(30));
    let terms = payload
        .terms
        .unwrap_or_else(|| DEFAULT_TERMS.to_string());

    // A duplicate number should be impossible with the atomic counter, but a
    // unique violation is still retried once with a fresh number.
    let mut quote_id = None;
    for attempt in 0..2 {
        let mut tx = db_pool.begin().await?;
        let number = database::next_document_number(&mut *tx, DocumentKind::Quote).await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO quotes (number, client_id, valid_until, global_discount_percent,
                                 vat_percent, terms, notes, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(&number)
        .bind(payload.client_id)
        .bind(valid_until)
        .bind(payload.global_discount_percent)
        .bind(vat_percent)
        .bind(&terms)
        .bind(&payload.notes)
        .bind(auth.user_id)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(id) => {
                insert_quote_lines(&mut tx, id, &lines).await?;
                tx.commit().await?;
                quote_id = Some(id);
                break;
            }
            Err(e) if error::is_unique_violation(&e) && attempt == 0 => {
                tracing::warn!(%number, "Duplicate quote number, retrying with a fresh one");
                tx.rollback().await.ok();
            }
            Err(e) => return Err(e.into()),
        }
    }
    let quote_id =
        quote_id.ok_or_else(|| AppError::conflict("Could not allocate a unique quote number"))?;

    tracing::info!(quote_id, user = %auth.email, "Quote created");

    let response = fetch_quote_response(&db_pool, quote_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// PUT /quotes/{id} - number, status, owner and linked invoice are immutable
// here; status moves only through the status endpoint.
#[instrument(skip(db_pool, auth, payload), fields(id))]
pub async fn update_quote(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let scope = auth.scope();
    let quote = fetch_quote_row(&db_pool, id)
        .await?
        .filter(|q| scope.allows(q.created_by))
        .ok_or_else(|| AppError::not_found("Quote not found"))?;

    if let Some(client_id) = payload.client_id {
        ensure_client_in_scope(&db_pool, scope, client_id).await?;
    }

    let global_discount = payload
        .global_discount_percent
        .unwrap_or(quote.global_discount_percent);
    let vat_percent = payload.vat_percent.unwrap_or(quote.vat_percent);
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
        "UPDATE quotes SET
             client_id = COALESCE($2, client_id),
             valid_until = COALESCE($3, valid_until),
             global_discount_percent = COALESCE($4, global_discount_percent),
             vat_percent = COALESCE($5, vat_percent),
             terms = COALESCE($6, terms),
             notes = COALESCE($7, notes),
             updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(payload.client_id)
    .bind(payload.valid_until)
    .bind(payload.global_discount_percent)
    .bind(payload.vat_percent)
    .bind(&payload.terms)
    .bind(&payload.notes)
    .execute(&mut *tx)
    .await?;

    if let Some(lines) = &new_lines {
        sqlx::query("DELETE FROM quote_lines WHERE quote_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_quote_lines(&mut tx, id, lines).await?;
    }

    tx.commit().await?;

    Ok(Json(fetch_quote_response(&db_pool, id).await?))
}

// DELETE /quotes/{id}
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn delete_quote(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    fetch_quote_row(&db_pool, id)
        .await?
        .filter(|q| auth.scope().allows(q.created_by))
        .ok_or_else(|| AppError::not_found("Quote not found"))?;

    sqlx::query("DELETE FROM quotes WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Quote deleted successfully" })))
}

// PUT /quotes/{id}/status - runs the state machine against the effective
// status, so an expired quote can no longer be accepted.
#[instrument(skip(db_pool, auth, payload), fields(id))]
pub async fn change_quote_status(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<ChangeStatusRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let quote = fetch_quote_row(&db_pool, id)
        .await?
        .filter(|q| auth.scope().allows(q.created_by))
        .ok_or_else(|| AppError::not_found("Quote not found"))?;

    let target = QuoteStatus::parse(&payload.status)
        .ok_or_else(|| AppError::validation(format!("Unknown quote status '{}'", payload.status)))?;
    let event = QuoteEvent::for_target(target).ok_or_else(|| {
        AppError::validation(format!("Status '{}' cannot be set directly", payload.status))
    })?;

    let current = QuoteStatus::parse(&quote.status)
        .ok_or_else(|| AppError::internal(format!("Corrupt quote status '{}'", quote.status)))?
        .effective(quote.valid_until, Utc::now());

    let next = current
        .apply(event)
        .map_err(|e| AppError::invalid_state(e.to_string()))?;

    // The UPDATE re-checks the status it was computed from, so a racing
    // transition on the same quote cannot land on top of this one.
    let result = match event {
        QuoteEvent::Send => {
            sqlx::query(
                "UPDATE quotes SET status = $2, updated_at = NOW()
                 WHERE id = $1 AND status = $3",
            )
            .bind(id)
            .bind(next.as_str())
            .bind(current.as_str())
            .execute(&db_pool)
            .await?
        }
        QuoteEvent::Accept => {
            sqlx::query(
                "UPDATE quotes SET status = $2, accepted_at = NOW(), updated_at = NOW()
                 WHERE id = $1 AND status = $3",
            )
            .bind(id)
            .bind(next.as_str())
            .bind(current.as_str())
            .execute(&db_pool)
            .await?
        }
        QuoteEvent::Refuse => {
            let reason = payload
                .refusal_reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| AppError::validation("Refusal reason required"))?;
            sqlx::query(
                "UPDATE quotes SET status = $2, refused_at = NOW(), refusal_reason = $4,
                                   updated_at = NOW()
                 WHERE id = $1 AND status = $3",
            )
            .bind(id)
            .bind(next.as_str())
            .bind(current.as_str())
            .bind(reason)
            .execute(&db_pool)
            .await?
        }
    };
    if result.rows_affected() == 0 {
        return Err(AppError::invalid_state(format!(
            "Quote is no longer in status '{}'",
            current.as_str()
        )));
    }

    tracing::info!(quote_id = id, from = current.as_str(), to = next.as_str(), "Quote status changed");

    Ok(Json(fetch_quote_response(&db_pool, id).await?))
}

// POST /quotes/{id}/convert - the only cross-entity write in the system:
// invoice insert and quote update happen in one transaction, and the quote
// update is guarded so a concurrent convert cannot produce two invoices.
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn convert_quote(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ConvertQuoteResponse>, AppError> {
    let quote = fetch_quote_row(&db_pool, id)
        .await?
        .filter(|q| auth.scope().allows(q.created_by))
        .ok_or_else(|| AppError::not_found("Quote not found"))?;

    let current = QuoteStatus::parse(&quote.status)
        .ok_or_else(|| AppError::internal(format!("Corrupt quote status '{}'", quote.status)))?;
    check_convertible(current, quote.linked_invoice_id)
        .map_err(|e| AppError::invalid_state(e.to_string()))?;

    let mut lines_by_quote = fetch_lines(&db_pool, &[id]).await?;
    let lines = lines_by_quote.remove(&id).unwrap_or_default();

    let mut invoice_id = None;
    for attempt in 0..2 {
        let mut tx = db_pool.begin().await?;
        let number = database::next_document_number(&mut *tx, DocumentKind::Invoice).await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO invoices (number, client_id, due_date, global_discount_percent,
                                   vat_percent, terms, notes, source_quote_id, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(&number)
        .bind(quote.client_id)
        .bind(Utc::now() + Duration::days(30))
        .bind(quote.global_discount_percent)
        .bind(quote.vat_percent)
        .bind(&quote.terms)
        .bind(format!("Generated from quote {}", quote.number))
        .bind(quote.id)
        .bind(quote.created_by)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(new_id) => {
                for line in &lines {
                    sqlx::query(
                        "INSERT INTO invoice_lines (invoice_id, product_id, product_name,
                                                    quantity, unit_price, discount_percent, position)
                         VALUES ($1, $2, $3, $4, $5, $6, $7)",
                    )
                    .bind(new_id)
                    .bind(line.product_id)
                    .bind(&line.product_name)
                    .bind(line.quantity)
                    .bind(line.unit_price)
                    .bind(line.discount_percent)
                    .bind(line.position)
                    .execute(&mut *tx)
                    .await?;
                }

                // Guarded: a concurrent convert that won the race leaves
                // linked_invoice_id set and this update touches no row.
                let updated = sqlx::query(
                    "UPDATE quotes SET linked_invoice_id = $2, updated_at = NOW()
                     WHERE id = $1 AND linked_invoice_id IS NULL",
                )
                .bind(id)
                .bind(new_id)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    tx.rollback().await.ok();
                    return Err(AppError::invalid_state(format!(
                        "Quote {} has already been converted to an invoice",
                        quote.number
                    )));
                }

                tx.commit().await?;
                invoice_id = Some(new_id);
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

    tracing::info!(quote_id = id, invoice_id, user = %auth.email, "Quote converted to invoice");

    Ok(Json(ConvertQuoteResponse {
        message: "Quote converted to invoice successfully".to_string(),
        quote: fetch_quote_response(&db_pool, id).await?,
        invoice: invoice::fetch_invoice_response(&db_pool, invoice_id).await?,
    }))
}

#[derive(Debug, sqlx::FromRow)]
struct QuoteStatsRow {
    total: i64,
    accepted: i64,
    refused: i64,
    pending: i64,
    expired: i64,
}

// GET /quotes/stats/overview
#[instrument(skip(db_pool, auth))]
pub async fn quote_stats(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<QuoteStatsResponse>, AppError> {
    let scope = auth.scope();

    let counts = sqlx::query_as::<_, QuoteStatsRow>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'accepted') AS accepted,
                COUNT(*) FILTER (WHERE status = 'refused') AS refused,
                COUNT(*) FILTER (WHERE status = 'sent' AND valid_until >= NOW()) AS pending,
                COUNT(*) FILTER (WHERE status IN ('draft', 'sent') AND valid_until < NOW()) AS expired
         FROM quotes
         WHERE ($1 OR created_by = $2)",
    )
    .bind(scope.is_admin())
    .bind(scope.user_id())
    .fetch_one(&db_pool)
    .await?;

    // Gross total of accepted quotes, recomputed from the lines in SQL.
    let accepted_gross_total = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(
                    (SELECT COALESCE(SUM(l.unit_price * l.quantity * (1 - l.discount_percent / 100.0)), 0)
                     FROM quote_lines l WHERE l.quote_id = q.id)
                    * (1 - q.global_discount_percent / 100.0)
                    * (1 + q.vat_percent / 100.0)
                ), 0)::FLOAT8
         FROM quotes q
         WHERE q.status = 'accepted' AND ($1 OR q.created_by = $2)",
    )
    .bind(scope.is_admin())
    .bind(scope.user_id())
    .fetch_one(&db_pool)
    .await?;

    let conversion_rate = if counts.total > 0 {
        let rate = counts.accepted as f64 / counts.total as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    } else {
        0.0
    };

    Ok(Json(QuoteStatsResponse {
        total: counts.total,
        accepted: counts.accepted,
        refused: counts.refused,
        pending: counts.pending,
        expired: counts.expired,
        conversion_rate,
        accepted_gross_total,
    }))
}
