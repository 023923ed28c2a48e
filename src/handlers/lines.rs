// src/handlers/lines.rs
//
// Shared between quote and invoice creation/update: turning line requests
// into rows ready to insert. Product name and price are snapshotted here;
// later product changes never rewrite existing lines.
use sqlx::PgPool;

use crate::domain::scope::AccessScope;
use crate::domain::totals::{self, LineInput};
use crate::dtos::document::LineRequest;
use crate::error::AppError;

pub const DEFAULT_TERMS: &str = "Payment within 30 days";
pub const DEFAULT_VAT_PERCENT: f64 = 20.0;

#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
}

impl ResolvedLine {
    pub fn as_input(&self) -> LineInput {
        LineInput {
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_percent: self.discount_percent,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRef {
    id: i64,
    name: String,
    price: f64,
    created_by: i64,
}

/// Looks up every referenced product (within the caller's scope), applies
/// the price default, and validates the whole line set plus the document
/// level percentages.
pub async fn resolve_lines(
    db_pool: &PgPool,
    scope: AccessScope,
    requests: &[LineRequest],
    global_discount_percent: f64,
    vat_percent: f64,
) -> Result<Vec<ResolvedLine>, AppError> {
    if requests.is_empty() {
        return Err(AppError::validation("Document must contain at least one line"));
    }

    let mut resolved = Vec::with_capacity(requests.len());
    for line in requests {
        let product = sqlx::query_as::<_, ProductRef>(
            "SELECT id, name, price, created_by FROM products WHERE id = $1",
        )
        .bind(line.product_id)
        .fetch_optional(db_pool)
        .await?
        .filter(|p| scope.allows(p.created_by))
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", line.product_id)))?;

        resolved.push(ResolvedLine {
            product_id: product.id,
            product_name: product.name,
            quantity: line.quantity,
            unit_price: line.unit_price.unwrap_or(product.price),
            discount_percent: line.discount_percent,
        });
    }

    let inputs: Vec<LineInput> = resolved.iter().map(ResolvedLine::as_input).collect();
    totals::validate_document(&inputs, global_discount_percent, vat_percent)
        .map_err(AppError::validation)?;

    Ok(resolved)
}

/// Verifies the client exists and is visible to the caller.
pub async fn ensure_client_in_scope(
    db_pool: &PgPool,
    scope: AccessScope,
    client_id: i64,
) -> Result<(), AppError> {
    sqlx::query_as::<_, (i64, i64)>("SELECT id, created_by FROM clients WHERE id = $1")
        .bind(client_id)
        .fetch_optional(db_pool)
        .await?
        .filter(|(_, created_by)| scope.allows(*created_by))
        .ok_or_else(|| AppError::not_found("Client not found"))?;
    Ok(())
}
