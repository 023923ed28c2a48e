// src/domain/numbering.rs
//
// Human-readable document numbers: DEV-2025-0007 for quotes,
// FAC-2025-0007 for invoices. Unique across the whole collection and
// monotonic within a calendar year; sequence allocation lives in
// database::next_document_number.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Quote,
    Invoice,
}

impl DocumentKind {
    /// Counter key in the document_counters table.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "quote",
            DocumentKind::Invoice => "invoice",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "DEV",
            DocumentKind::Invoice => "FAC",
        }
    }
}

/// Sequence is zero-padded to 4 digits; past 9999 it simply grows wider.
pub fn format_number(kind: DocumentKind, year: i32, seq: i64) -> String {
    format!("{}-{}-{:04}", kind.prefix(), year, seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_quote_and_invoice_numbers() {
        assert_eq!(format_number(DocumentKind::Quote, 2025, 7), "DEV-2025-0007");
        assert_eq!(format_number(DocumentKind::Invoice, 2025, 7), "FAC-2025-0007");
    }

    #[test]
    fn pads_to_four_digits() {
        assert_eq!(format_number(DocumentKind::Quote, 2024, 1), "DEV-2024-0001");
        assert_eq!(format_number(DocumentKind::Quote, 2024, 9999), "DEV-2024-9999");
        assert_eq!(format_number(DocumentKind::Quote, 2024, 10000), "DEV-2024-10000");
    }
}
