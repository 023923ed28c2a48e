// src/dtos/invoice.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::document::{ClientSummary, LineRequest, LineResponse, TotalsResponse};

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub client_id: i64,
    pub due_date: Option<DateTime<Utc>>, // Default: 30 days from creation
    pub lines: Vec<LineRequest>,
    #[serde(default)]
    pub global_discount_percent: f64,
    pub vat_percent: Option<f64>,
    pub terms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceRequest {
    pub client_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub lines: Option<Vec<LineRequest>>, // Replaces all lines when provided
    pub global_discount_percent: Option<f64>,
    pub vat_percent: Option<f64>,
    pub terms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: i64,
    pub number: String,
    pub client: ClientSummary,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub lines: Vec<LineResponse>,
    pub global_discount_percent: f64,
    pub vat_percent: f64,
    pub totals: TotalsResponse,
    pub terms: String,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub source_quote_id: Option<i64>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}
