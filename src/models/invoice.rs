use sqlx::FromRow;
use chrono::{DateTime, Utc};

/// An invoice row joined with its client summary. Totals are recomputed from
/// the lines on every read, same as quotes.
#[derive(Debug, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub number: String,
    pub client_id: i64,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub global_discount_percent: f64,
    pub vat_percent: f64,
    pub terms: String,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub source_quote_id: Option<i64>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub client_name: String,
    pub client_email: String,
    pub client_company: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct InvoiceLine {
    pub id: i64,
    pub invoice_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub position: i32,
}
