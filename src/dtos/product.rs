// src/dtos/product.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub vat_rate: Option<f64>,
    pub category: String,
    pub stock: Option<i32>,
    pub unit: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub vat_rate: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub unit: Option<String>,
    pub code: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub vat_rate: f64,
    pub category: String,
    pub stock: i32,
    pub unit: String,
    pub code: Option<String>,
    pub status: String,
    pub created_by: i64,
    pub created_at: String,
}

// Convert from Model to Response DTO
impl From<crate::models::product::Product> for ProductResponse {
    fn from(product: crate::models::product::Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            description: product.description,
            vat_rate: product.vat_rate,
            category: product.category,
            stock: product.stock,
            unit: product.unit,
            code: product.code,
            status: product.status,
            created_by: product.created_by,
            created_at: product.created_at.to_rfc3339(),
        }
    }
}
