// src/handlers/client.rs
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum::http::StatusCode;
use tracing::instrument;

use crate::dtos::client::{ClientResponse, CreateClientRequest, UpdateClientRequest};
use crate::error::{self, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::client::{Client, CLIENT_STATUSES};
use crate::state::AppState;

const CLIENT_SELECT: &str =
    "SELECT id, name, email, company, phone, address_street, address_city,
            address_postal_code, address_country, notes, status, created_by, created_at
     FROM clients";

fn validate_status(status: &str) -> Result<(), AppError> {
    if CLIENT_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::validation("Invalid client status"))
    }
}

// GET /clients - List clients visible to the caller
#[instrument(skip(db_pool, auth))]
pub async fn list_clients(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let scope = auth.scope();
    let clients = sqlx::query_as::<_, Client>(&format!(
        "{CLIENT_SELECT} WHERE ($1 OR created_by = $2) ORDER BY name"
    ))
    .bind(scope.is_admin())
    .bind(scope.user_id())
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(clients.into_iter().map(ClientResponse::from).collect()))
}

// GET /clients/{id}
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn get_client(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = sqlx::query_as::<_, Client>(&format!("{CLIENT_SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .filter(|c| auth.scope().allows(c.created_by))
        .ok_or_else(|| AppError::not_found("Client not found"))?;

    Ok(Json(ClientResponse::from(client)))
}

// POST /clients
#[instrument(skip(db_pool, auth, payload))]
pub async fn create_client(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Client name required"));
    }
    if !payload.email.contains('@') {
        return Err(AppError::validation("Valid client email required"));
    }
    let status = payload.status.as_deref().unwrap_or("active");
    validate_status(status)?;

    let address = payload.address.as_ref();

    let client = sqlx::query_as::<_, Client>(
        "INSERT INTO clients (name, email, company, phone, address_street, address_city,
                              address_postal_code, address_country, notes, status, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 'Maroc'), $9, $10, $11)
         RETURNING id, name, email, company, phone, address_street, address_city,
                   address_postal_code, address_country, notes, status, created_by, created_at",
    )
    .bind(payload.name.trim())
    .bind(payload.email.trim())
    .bind(&payload.company)
    .bind(&payload.phone)
    .bind(address.and_then(|a| a.street.as_deref()))
    .bind(address.and_then(|a| a.city.as_deref()))
    .bind(address.and_then(|a| a.postal_code.as_deref()))
    .bind(address.and_then(|a| a.country.as_deref()))
    .bind(&payload.notes)
    .bind(status)
    .bind(auth.user_id)
    .fetch_one(&db_pool)
    .await?;

    tracing::info!(client_id = client.id, "Client created");

    Ok((StatusCode::CREATED, Json(ClientResponse::from(client))))
}

// PUT /clients/{id}
#[instrument(skip(db_pool, auth, payload), fields(id))]
pub async fn update_client(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    sqlx::query_as::<_, (i64,)>("SELECT created_by FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .filter(|(created_by,)| auth.scope().allows(*created_by))
        .ok_or_else(|| AppError::not_found("Client not found"))?;

    if let Some(name) = payload.name.as_deref() {
        if name.trim().is_empty() {
            return Err(AppError::validation("Client name cannot be empty"));
        }
    }
    if let Some(email) = payload.email.as_deref() {
        if !email.contains('@') {
            return Err(AppError::validation("Valid client email required"));
        }
    }
    if let Some(status) = payload.status.as_deref() {
        validate_status(status)?;
    }

    let address = payload.address.as_ref();

    let client = sqlx::query_as::<_, Client>(
        "UPDATE clients SET
             name = COALESCE($2, name),
             email = COALESCE($3, email),
             company = COALESCE($4, company),
             phone = COALESCE($5, phone),
             address_street = COALESCE($6, address_street),
             address_city = COALESCE($7, address_city),
             address_postal_code = COALESCE($8, address_postal_code),
             address_country = COALESCE($9, address_country),
             notes = COALESCE($10, notes),
             status = COALESCE($11, status),
             updated_at = NOW()
         WHERE id = $1
         RETURNING id, name, email, company, phone, address_street, address_city,
                   address_postal_code, address_country, notes, status, created_by, created_at",
    )
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.email.as_deref().map(str::trim))
    .bind(&payload.company)
    .bind(&payload.phone)
    .bind(address.and_then(|a| a.street.as_deref()))
    .bind(address.and_then(|a| a.city.as_deref()))
    .bind(address.and_then(|a| a.postal_code.as_deref()))
    .bind(address.and_then(|a| a.country.as_deref()))
    .bind(&payload.notes)
    .bind(&payload.status)
    .fetch_one(&db_pool)
    .await?;

    Ok(Json(ClientResponse::from(client)))
}

// DELETE /clients/{id}
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn delete_client(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    sqlx::query_as::<_, (i64,)>("SELECT created_by FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .filter(|(created_by,)| auth.scope().allows(*created_by))
        .ok_or_else(|| AppError::not_found("Client not found"))?;

    sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await
        .map_err(|e| {
            if error::is_foreign_key_violation(&e) {
                AppError::conflict("Client is referenced by existing quotes or invoices")
            } else {
                AppError::db(e)
            }
        })?;

    Ok(Json(serde_json::json!({ "message": "Client deleted successfully" })))
}
