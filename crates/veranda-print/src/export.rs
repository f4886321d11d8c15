//! CSV export of report rows, for handoff to accounting spreadsheets.
//! Amounts are exported in baht with two decimals; timestamps in RFC
//! 3339 so the file round-trips through Excel without locale damage.

use veranda_core::{Money, ReportRow, SalesSummary};

use crate::document::money;
use crate::PrintResult;

/// Serializes report rows (plus a trailing totals row) to CSV bytes.
pub fn report_csv(rows: &[ReportRow], summary: &SalesSummary) -> PrintResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record([
        "receipt_code",
        "issued_at",
        "customer",
        "staff",
        "payment_method",
        "total_thb",
    ])?;

    for row in rows {
        writer.write_record([
            row.receipt_code.as_str(),
            &row.issued_at.to_rfc3339(),
            row.customer_name.as_deref().unwrap_or(""),
            row.staff_name.as_str(),
            row.payment_method.as_str(),
            &money(Money::from_satang(row.total_satang)),
        ])?;
    }

    writer.write_record([
        "TOTAL",
        "",
        "",
        "",
        "",
        &money(Money::from_satang(summary.total_satang)),
    ])?;

    Ok(writer.into_inner()?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn exports_header_rows_and_totals() {
        let rows = vec![ReportRow {
            receipt_code: "RV000001".to_string(),
            issued_at: Utc::now(),
            customer_name: Some("K. Somchai".to_string()),
            staff_name: "Anong S.".to_string(),
            payment_method: "cash".to_string(),
            total_satang: 1_234_50,
        }];
        let summary = SalesSummary {
            receipt_count: 1,
            subtotal_satang: 123_450,
            discount_satang: 0,
            total_satang: 123_450,
        };

        let bytes = report_csv(&rows, &summary).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("receipt_code,issued_at"));
        assert!(lines[1].contains("RV000001"));
        assert!(lines[1].contains("K. Somchai"));
        assert!(lines[1].ends_with("\"1,234.50\""));
        assert!(lines[2].starts_with("TOTAL"));
    }

    #[test]
    fn empty_export_has_header_and_zero_total() {
        let bytes = report_csv(&[], &SalesSummary::default()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("0.00"));
    }
}
