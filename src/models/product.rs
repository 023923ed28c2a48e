use sqlx::FromRow;
use chrono::{DateTime, Utc};

#[derive(Debug, FromRow)]
pub struct Product {
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
    pub created_at: DateTime<Utc>,
}

pub const PRODUCT_STATUSES: &[&str] = &["active", "inactive", "out_of_stock"];
