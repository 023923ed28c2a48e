// src/dtos/dashboard.rs
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct QuoteCounts {
    pub total: i64,
    pub accepted: i64,
    pub refused: i64,
    pub pending: i64,
    pub expired: i64,
}

#[derive(Debug, Serialize)]
pub struct InvoiceCounts {
    pub total: i64,
    pub paid: i64,
    pub pending: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardStatsResponse {
    pub quotes: QuoteCounts,
    pub invoices: InvoiceCounts,
    pub total_clients: i64,
    pub total_products: i64,
}
