// src/domain/totals.rs
//
// Money arithmetic for quotes and invoices. Pure functions, no rounding:
// values are stored and returned at full floating precision, display rounding
// is a client concern.
use serde::Serialize;

/// The three derived monetary fields of a quote or invoice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub net_amount: f64,
    pub gross_amount: f64,
}

/// The part of a line item the calculator cares about.
#[derive(Debug, Clone, Copy)]
pub struct LineInput {
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
}

pub fn line_total(line: &LineInput) -> f64 {
    line.unit_price * line.quantity * (1.0 - line.discount_percent / 100.0)
}

/// Computes subtotal, net (after global discount) and gross (net plus VAT).
/// Always called fresh on save and on read; stored totals are never trusted.
pub fn compute_totals(
    lines: &[LineInput],
    global_discount_percent: f64,
    vat_percent: f64,
) -> Totals {
    let subtotal: f64 = lines.iter().map(line_total).sum();
    let net_amount = subtotal * (1.0 - global_discount_percent / 100.0);
    let gross_amount = net_amount * (1.0 + vat_percent / 100.0);

    Totals {
        subtotal,
        net_amount,
        gross_amount,
    }
}

pub fn validate_line(line: &LineInput) -> Result<(), String> {
    if line.quantity <= 0.0 {
        return Err("Line quantity must be greater than 0".to_string());
    }
    if line.unit_price < 0.0 {
        return Err("Line unit price cannot be negative".to_string());
    }
    if !(0.0..=100.0).contains(&line.discount_percent) {
        return Err("Line discount must be between 0 and 100".to_string());
    }
    Ok(())
}

pub fn validate_document(
    lines: &[LineInput],
    global_discount_percent: f64,
    vat_percent: f64,
) -> Result<(), String> {
    if lines.is_empty() {
        return Err("Document must contain at least one line".to_string());
    }
    for line in lines {
        validate_line(line)?;
    }
    if !(0.0..=100.0).contains(&global_discount_percent) {
        return Err("Global discount must be between 0 and 100".to_string());
    }
    if vat_percent < 0.0 {
        return Err("VAT rate cannot be negative".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn line(quantity: f64, unit_price: f64, discount_percent: f64) -> LineInput {
        LineInput {
            quantity,
            unit_price,
            discount_percent,
        }
    }

    #[test]
    fn reference_scenario() {
        // One line 100 x 2 at 10% line discount, 5% global, 20% VAT.
        let totals = compute_totals(&[line(2.0, 100.0, 10.0)], 5.0, 20.0);
        assert!((totals.subtotal - 180.0).abs() < EPS);
        assert!((totals.net_amount - 171.0).abs() < EPS);
        assert!((totals.gross_amount - 205.2).abs() < EPS);
    }

    #[test]
    fn gross_is_net_times_vat_factor() {
        let lines = [line(3.0, 19.99, 0.0), line(1.5, 42.0, 25.0), line(10.0, 0.5, 100.0)];
        let totals = compute_totals(&lines, 12.5, 20.0);
        let expected = totals.subtotal * (1.0 - 12.5 / 100.0) * (1.0 + 20.0 / 100.0);
        assert!((totals.gross_amount - expected).abs() < EPS);
    }

    #[test]
    fn empty_lines_give_zero_everywhere() {
        let totals = compute_totals(&[], 50.0, 20.0);
        assert_eq!(totals.subtotal, 0.0);
        assert_eq!(totals.net_amount, 0.0);
        assert_eq!(totals.gross_amount, 0.0);
    }

    #[test]
    fn recompute_is_deterministic() {
        let lines = [line(2.0, 100.0, 10.0), line(7.0, 3.33, 5.0)];
        let first = compute_totals(&lines, 5.0, 20.0);
        let second = compute_totals(&lines, 5.0, 20.0);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_vat_means_gross_equals_net() {
        let totals = compute_totals(&[line(4.0, 25.0, 0.0)], 10.0, 0.0);
        assert!((totals.gross_amount - totals.net_amount).abs() < EPS);
        assert!((totals.net_amount - 90.0).abs() < EPS);
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(validate_line(&line(0.0, 10.0, 0.0)).is_err());
        assert!(validate_line(&line(-1.0, 10.0, 0.0)).is_err());
        assert!(validate_line(&line(1.0, -0.01, 0.0)).is_err());
        assert!(validate_line(&line(1.0, 10.0, 100.5)).is_err());
        assert!(validate_line(&line(1.0, 10.0, -2.0)).is_err());
        assert!(validate_line(&line(0.5, 0.0, 100.0)).is_ok());
    }

    #[test]
    fn rejects_bad_document_parameters() {
        let lines = [line(1.0, 10.0, 0.0)];
        assert!(validate_document(&[], 0.0, 20.0).is_err());
        assert!(validate_document(&lines, 101.0, 20.0).is_err());
        assert!(validate_document(&lines, 0.0, -1.0).is_err());
        assert!(validate_document(&lines, 100.0, 0.0).is_ok());
    }
}
