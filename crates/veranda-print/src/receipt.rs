//! # Receipt Rendering
//!
//! Composes the 42-column guest receipt:
//!
//! ```text
//!            The Veranda Hotel
//!          12 Beach Road, Hua Hin
//! ------------------------------------------
//! Receipt: RV000123     31/08/2026 14:05
//! Staff:   Anong S.
//! Guest:   K. Somchai          Room 404
//! ------------------------------------------
//! Pool day pass
//!   2 x 350.00                      700.00
//!   POOL-0007  POOL-0008
//! ------------------------------------------
//! Subtotal                         700.00
//! Discount                         -50.00
//! TOTAL (THB)                      650.00
//! Paid by: Cash
//! ------------------------------------------
//!          Thank you for staying!
//! ```

use chrono::{DateTime, Utc};

use veranda_core::{GeneratedCoupon, Money, Receipt, ReceiptItem};

use crate::document::{center, left_right, money, rule, wrap, RECEIPT_WIDTH};

/// Static venue identity printed at the top of every receipt.
#[derive(Debug, Clone)]
pub struct VenueHeader {
    pub name: String,
    pub address_lines: Vec<String>,
    pub footer: String,
}

impl Default for VenueHeader {
    fn default() -> Self {
        VenueHeader {
            name: "The Veranda Hotel".to_string(),
            address_lines: Vec::new(),
            footer: "Thank you for staying!".to_string(),
        }
    }
}

/// Everything needed to render one receipt. Names come pre-resolved so
/// the renderer stays free of lookups.
#[derive(Debug, Clone)]
pub struct ReceiptDocument<'a> {
    pub header: &'a VenueHeader,
    pub receipt: &'a Receipt,
    pub items: &'a [ReceiptItem],
    pub coupons: &'a [GeneratedCoupon],
    pub staff_name: &'a str,
    pub customer_name: Option<&'a str>,
    pub customer_room: Option<&'a str>,
    pub payment_method_name: &'a str,
    /// True when reprinting an already-printed receipt.
    pub reprint: bool,
}

impl ReceiptDocument<'_> {
    /// Renders the receipt as lines of at most [`RECEIPT_WIDTH`] chars.
    pub fn render(&self) -> Vec<String> {
        let w = RECEIPT_WIDTH;
        let mut out = Vec::new();

        out.push(center(&self.header.name, w));
        for line in &self.header.address_lines {
            out.push(center(line, w));
        }
        if self.reprint {
            out.push(center("*** REPRINT ***", w));
        }
        if self.receipt.cancelled_at.is_some() {
            out.push(center("*** CANCELLED ***", w));
        }
        out.push(rule('-', w));

        out.push(left_right(
            &format!("Receipt: {}", self.receipt.receipt_code),
            &format_stamp(self.receipt.created_at),
            w,
        ));
        out.push(format!("Staff:   {}", self.staff_name));
        if let Some(guest) = self.customer_name {
            let room = self
                .customer_room
                .map(|r| format!("Room {r}"))
                .unwrap_or_default();
            out.push(left_right(&format!("Guest:   {guest}"), &room, w));
        }
        out.push(rule('-', w));

        for item in self.items {
            for line in wrap(&item.name_snapshot, w) {
                out.push(line);
            }
            out.push(left_right(
                &format!(
                    "  {} x {}",
                    item.quantity,
                    money(Money::from_satang(item.unit_price_satang))
                ),
                &money(Money::from_satang(item.quantity * item.unit_price_satang)),
                w,
            ));
            if item.discount_satang > 0 {
                out.push(left_right(
                    "  discount",
                    &format!("-{}", money(Money::from_satang(item.discount_satang))),
                    w,
                ));
            }

            let codes: Vec<&str> = self
                .coupons
                .iter()
                .filter(|c| c.receipt_item_id.as_deref() == Some(item.id.as_str()))
                .map(|c| c.generated_code.as_str())
                .collect();
            if !codes.is_empty() {
                for line in wrap(&codes.join("  "), w - 2) {
                    out.push(format!("  {line}"));
                }
            }
        }
        out.push(rule('-', w));

        out.push(left_right(
            "Subtotal",
            &money(Money::from_satang(self.receipt.subtotal_satang)),
            w,
        ));
        if self.receipt.discount_satang > 0 {
            out.push(left_right(
                "Discount",
                &format!("-{}", money(Money::from_satang(self.receipt.discount_satang))),
                w,
            ));
        }
        out.push(left_right(
            "TOTAL (THB)",
            &money(Money::from_satang(self.receipt.total_satang)),
            w,
        ));
        out.push(format!("Paid by: {}", self.payment_method_name));

        if let Some(notes) = &self.receipt.notes {
            out.push(rule('-', w));
            for line in wrap(notes, w) {
                out.push(line);
            }
        }

        out.push(rule('-', w));
        out.push(center(&self.header.footer, w));
        out
    }
}

fn format_stamp(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use veranda_core::ReceiptStatus;

    fn sample_receipt() -> Receipt {
        Receipt {
            id: "r1".to_string(),
            receipt_code: "RV000123".to_string(),
            status: ReceiptStatus::Active,
            customer_id: None,
            staff_id: "s1".to_string(),
            payment_method: "cash".to_string(),
            subtotal_satang: 70000,
            discount_satang: 5000,
            total_satang: 65000,
            machine_id: "m1".to_string(),
            notes: None,
            created_at: Utc.with_ymd_and_hms(2026, 8, 31, 14, 5, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 8, 31, 14, 5, 0).unwrap(),
            printed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
        }
    }

    fn sample_item() -> ReceiptItem {
        ReceiptItem {
            id: "i1".to_string(),
            receipt_id: "r1".to_string(),
            definition_id: "d1".to_string(),
            name_snapshot: "Pool day pass".to_string(),
            unit_price_satang: 35000,
            quantity: 2,
            discount_satang: 5000,
            line_total_satang: 65000,
            created_at: Utc::now(),
        }
    }

    fn sample_coupon(code: &str) -> GeneratedCoupon {
        GeneratedCoupon {
            id: format!("g-{code}"),
            definition_id: "d1".to_string(),
            generated_code: code.to_string(),
            batch_id: "b1".to_string(),
            seq: 1,
            is_used: true,
            used_at: Some(Utc::now()),
            used_by: Some("s1".to_string()),
            receipt_item_id: Some("i1".to_string()),
            customer_id: None,
            expires_at: None,
            is_complimentary: false,
            redeemed_at: None,
            redeemed_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn renders_within_width_and_includes_codes() {
        let header = VenueHeader::default();
        let receipt = sample_receipt();
        let items = [sample_item()];
        let coupons = [sample_coupon("POOL-0007"), sample_coupon("POOL-0008")];

        let doc = ReceiptDocument {
            header: &header,
            receipt: &receipt,
            items: &items,
            coupons: &coupons,
            staff_name: "Anong S.",
            customer_name: Some("K. Somchai"),
            customer_room: Some("404"),
            payment_method_name: "Cash",
            reprint: false,
        };
        let lines = doc.render();

        assert!(lines.iter().all(|l| l.chars().count() <= RECEIPT_WIDTH));
        assert!(lines.iter().any(|l| l.contains("RV000123")));
        assert!(lines.iter().any(|l| l.contains("POOL-0007") && l.contains("POOL-0008")));
        assert!(lines.iter().any(|l| l.contains("TOTAL (THB)") && l.contains("650.00")));
        assert!(lines.iter().any(|l| l.contains("Room 404")));
        assert!(!lines.iter().any(|l| l.contains("REPRINT")));
    }

    #[test]
    fn reprint_and_cancelled_banners() {
        let header = VenueHeader::default();
        let mut receipt = sample_receipt();
        receipt.cancelled_at = Some(Utc::now());

        let doc = ReceiptDocument {
            header: &header,
            receipt: &receipt,
            items: &[],
            coupons: &[],
            staff_name: "Anong S.",
            customer_name: None,
            customer_room: None,
            payment_method_name: "Cash",
            reprint: true,
        };
        let lines = doc.render();

        assert!(lines.iter().any(|l| l.contains("*** REPRINT ***")));
        assert!(lines.iter().any(|l| l.contains("*** CANCELLED ***")));
        // Anonymous walk-up: no guest line
        assert!(!lines.iter().any(|l| l.contains("Guest:")));
    }
}
