// src/handlers/product.rs
use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum::http::StatusCode;
use tracing::instrument;

use crate::dtos::product::{CreateProductRequest, ProductResponse, UpdateProductRequest};
use crate::error::{self, AppError};
use crate::handlers::lines::DEFAULT_VAT_PERCENT;
use crate::middleware::auth::AuthContext;
use crate::models::product::{Product, PRODUCT_STATUSES};
use crate::state::AppState;

const PRODUCT_SELECT: &str =
    "SELECT id, name, price, description, vat_rate, category, stock, unit, code,
            status, created_by, created_at
     FROM products";

fn validate_price(price: f64) -> Result<(), AppError> {
    if price < 0.0 {
        return Err(AppError::validation("Product price cannot be negative"));
    }
    Ok(())
}

fn validate_vat(vat_rate: f64) -> Result<(), AppError> {
    if !(0.0..=100.0).contains(&vat_rate) {
        return Err(AppError::validation("VAT rate must be between 0 and 100"));
    }
    Ok(())
}

// GET /products - List products visible to the caller
#[instrument(skip(db_pool, auth))]
pub async fn list_products(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let scope = auth.scope();
    let products = sqlx::query_as::<_, Product>(&format!(
        "{PRODUCT_SELECT} WHERE ($1 OR created_by = $2) ORDER BY name"
    ))
    .bind(scope.is_admin())
    .bind(scope.user_id())
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

// GET /products/{id}
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn get_product(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .filter(|p| auth.scope().allows(p.created_by))
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products
#[instrument(skip(db_pool, auth, payload))]
pub async fn create_product(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Product name required"));
    }
    if payload.category.trim().is_empty() {
        return Err(AppError::validation("Product category required"));
    }
    validate_price(payload.price)?;
    let vat_rate = payload.vat_rate.unwrap_or(DEFAULT_VAT_PERCENT);
    validate_vat(vat_rate)?;
    if payload.stock.unwrap_or(0) < 0 {
        return Err(AppError::validation("Stock cannot be negative"));
    }

    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, price, description, vat_rate, category, stock, unit, code, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'unit'), $8, $9)
         RETURNING id, name, price, description, vat_rate, category, stock, unit, code,
                   status, created_by, created_at",
    )
    .bind(payload.name.trim())
    .bind(payload.price)
    .bind(&payload.description)
    .bind(vat_rate)
    .bind(payload.category.trim())
    .bind(payload.stock.unwrap_or(0))
    .bind(&payload.unit)
    .bind(&payload.code)
    .bind(auth.user_id)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        if error::is_unique_violation(&e) {
            AppError::conflict("Product code already exists")
        } else {
            AppError::db(e)
        }
    })?;

    tracing::info!(product_id = product.id, "Product created");

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /products/{id}
#[instrument(skip(db_pool, auth, payload), fields(id))]
pub async fn update_product(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    sqlx::query_as::<_, (i64,)>("SELECT created_by FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .filter(|(created_by,)| auth.scope().allows(*created_by))
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    if let Some(price) = payload.price {
        validate_price(price)?;
    }
    if let Some(vat_rate) = payload.vat_rate {
        validate_vat(vat_rate)?;
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(AppError::validation("Stock cannot be negative"));
        }
    }
    if let Some(status) = payload.status.as_deref() {
        if !PRODUCT_STATUSES.contains(&status) {
            return Err(AppError::validation("Invalid product status"));
        }
    }

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET
             name = COALESCE($2, name),
             price = COALESCE($3, price),
             description = COALESCE($4, description),
             vat_rate = COALESCE($5, vat_rate),
             category = COALESCE($6, category),
             stock = COALESCE($7, stock),
             unit = COALESCE($8, unit),
             code = COALESCE($9, code),
             status = COALESCE($10, status),
             updated_at = NOW()
         WHERE id = $1
         RETURNING id, name, price, description, vat_rate, category, stock, unit, code,
                   status, created_by, created_at",
    )
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.price)
    .bind(&payload.description)
    .bind(payload.vat_rate)
    .bind(payload.category.as_deref().map(str::trim))
    .bind(payload.stock)
    .bind(&payload.unit)
    .bind(&payload.code)
    .bind(&payload.status)
    .fetch_one(&db_pool)
    .await
    .map_err(|e| {
        if error::is_unique_violation(&e) {
            AppError::conflict("Product code already exists")
        } else {
            AppError::db(e)
        }
    })?;

    Ok(Json(ProductResponse::from(product)))
}

// DELETE /products/{id}
#[instrument(skip(db_pool, auth), fields(id))]
pub async fn delete_product(
    State(AppState { db_pool }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    sqlx::query_as::<_, (i64,)>("SELECT created_by FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&db_pool)
        .await?
        .filter(|(created_by,)| auth.scope().allows(*created_by))
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await
        .map_err(|e| {
            if error::is_foreign_key_violation(&e) {
                AppError::conflict("Product is referenced by existing quote or invoice lines")
            } else {
                AppError::db(e)
            }
        })?;

    Ok(Json(serde_json::json!({ "message": "Product deleted successfully" })))
}
