use sqlx::FromRow;
use chrono::{DateTime, Utc};

/// A quote row joined with its client summary. Monetary totals are not
/// stored: they are recomputed from the lines on every read.
#[derive(Debug, FromRow)]
pub struct Quote {
    pub id: i64,
    pub number: String,
    pub client_id: i64,
    pub status: String,
    pub valid_until: DateTime<Utc>,
    pub global_discount_percent: f64,
    pub vat_percent: f64,
    pub terms: String,
    pub notes: Option<String>,
    pub linked_invoice_id: Option<i64>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub refused_at: Option<DateTime<Utc>>,
    pub refusal_reason: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub client_name: String,
    pub client_email: String,
    pub client_company: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct QuoteLine {
    pub id: i64,
    pub quote_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub position: i32,
}
