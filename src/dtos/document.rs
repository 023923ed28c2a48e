// src/dtos/document.rs
// Request/response pieces shared by quotes and invoices.
use serde::{Deserialize, Serialize};

use crate::domain::totals::{line_total, LineInput, Totals};

#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub product_id: i64,
    pub quantity: f64,
    pub unit_price: Option<f64>, // Optional - uses the product's current price if not provided
    #[serde(default)]
    pub discount_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct LineResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub line_total: f64,
}

impl LineResponse {
    pub fn new(
        id: i64,
        product_id: i64,
        product_name: String,
        quantity: f64,
        unit_price: f64,
        discount_percent: f64,
    ) -> Self {
        let total = line_total(&LineInput {
            quantity,
            unit_price,
            discount_percent,
        });
        Self {
            id,
            product_id,
            product_name,
            quantity,
            unit_price,
            discount_percent,
            line_total: total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    pub subtotal: f64,
    pub net_amount: f64,
    pub gross_amount: f64,
}

impl From<Totals> for TotalsResponse {
    fn from(t: Totals) -> Self {
        Self {
            subtotal: t.subtotal,
            net_amount: t.net_amount,
            gross_amount: t.gross_amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
    pub refusal_reason: Option<String>,
}
