// src/dtos/quote.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::document::{ClientSummary, LineRequest, LineResponse, TotalsResponse};
use super::invoice::InvoiceResponse;

#[derive(Debug, Deserialize)]
pub struct CreateQuoteRequest {
    pub client_id: i64,
    pub valid_until: Option<DateTime<Utc>>, // Default: 30 days from creation
    pub lines: Vec<LineRequest>,
    #[serde(default)]
    pub global_discount_percent: f64,
    pub vat_percent: Option<f64>,
    pub terms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuoteRequest {
    pub client_id: Option<i64>,
    pub valid_until: Option<DateTime<Utc>>,
    pub lines: Option<Vec<LineRequest>>, // Replaces all lines when provided
    pub global_discount_percent: Option<f64>,
    pub vat_percent: Option<f64>,
    pub terms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub id: i64,
    pub number: String,
    pub client: ClientSummary,
    pub status: String,
    pub valid_until: DateTime<Utc>,
    pub lines: Vec<LineResponse>,
    pub global_discount_percent: f64,
    pub vat_percent: f64,
    pub totals: TotalsResponse,
    pub terms: String,
    pub notes: Option<String>,
    pub linked_invoice_id: Option<i64>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub refused_at: Option<DateTime<Utc>>,
    pub refusal_reason: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConvertQuoteResponse {
    pub message: String,
    pub quote: QuoteResponse,
    pub invoice: InvoiceResponse,
}

#[derive(Debug, Serialize)]
pub struct QuoteStatsResponse {
    pub total: i64,
    pub accepted: i64,
    pub refused: i64,
    pub pending: i64,
    pub expired: i64,
    pub conversion_rate: f64,
    pub accepted_gross_total: f64,
}
