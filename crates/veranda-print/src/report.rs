//! # Sales Report Rendering
//!
//! Paginates report rows into 80-column pages with a repeated heading,
//! a receipt-per-line body and a totals block on the last page.

use chrono::{DateTime, Utc};

use veranda_core::{Money, ReportRow, SalesSummary};

use crate::document::{center, left_right, money, rule, truncate, REPORT_LINES_PER_PAGE, REPORT_WIDTH};

/// One rendered page of the report.
pub type ReportPage = Vec<String>;

/// A date-ranged sales report ready to paginate.
#[derive(Debug, Clone)]
pub struct ReportDocument<'a> {
    pub title: &'a str,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub rows: &'a [ReportRow],
    pub summary: &'a SalesSummary,
}

impl ReportDocument<'_> {
    /// Renders the report into pages of at most
    /// [`REPORT_LINES_PER_PAGE`] body lines each.
    pub fn render(&self) -> Vec<ReportPage> {
        let w = REPORT_WIDTH;
        let mut pages = Vec::new();
        let total_pages = self.page_count();

        let mut rows = self.rows.iter().peekable();
        let mut page_no = 0;

        loop {
            page_no += 1;
            let mut page = self.heading(page_no, total_pages);

            let mut body = 0;
            while body < REPORT_LINES_PER_PAGE {
                match rows.next() {
                    Some(row) => {
                        page.push(render_row(row));
                        body += 1;
                    }
                    None => break,
                }
            }

            // Totals go on the final page, on a new page if full
            if rows.peek().is_none() {
                if body + 5 > REPORT_LINES_PER_PAGE {
                    pages.push(page);
                    page_no += 1;
                    page = self.heading(page_no, total_pages);
                }
                page.push(rule('-', w));
                page.push(left_right(
                    &format!("Receipts: {}", self.summary.receipt_count),
                    &format!("Subtotal: {}", money(Money::from_satang(self.summary.subtotal_satang))),
                    w,
                ));
                page.push(left_right(
                    "",
                    &format!("Discount: {}", money(Money::from_satang(self.summary.discount_satang))),
                    w,
                ));
                page.push(left_right(
                    "",
                    &format!("TOTAL (THB): {}", money(Money::from_satang(self.summary.total_satang))),
                    w,
                ));
                pages.push(page);
                break;
            }
            pages.push(page);
        }

        pages
    }

    fn page_count(&self) -> usize {
        // Totals block may spill onto an extra page; the heading shows
        // a best-effort count which the spill adjusts by one.
        (self.rows.len() / REPORT_LINES_PER_PAGE) + 1
    }

    fn heading(&self, page_no: usize, total_pages: usize) -> Vec<String> {
        let w = REPORT_WIDTH;
        vec![
            center(self.title, w),
            left_right(
                &format!(
                    "{} - {}",
                    self.from.format("%d/%m/%Y"),
                    self.to.format("%d/%m/%Y")
                ),
                &format!("Page {page_no}/{total_pages}"),
                w,
            ),
            rule('=', w),
            format!(
                "{:<10} {:<17} {:<19} {:<12} {:>12} {:>5}",
                "Receipt", "Issued", "Customer", "Staff", "Total", "Pay"
            ),
            rule('-', w),
        ]
    }
}

fn render_row(row: &ReportRow) -> String {
    // Column widths plus five separator spaces add up to REPORT_WIDTH
    format!(
        "{:<10} {:<17} {:<19} {:<12} {:>12} {:>5}",
        truncate(&row.receipt_code, 10),
        row.issued_at.format("%d/%m/%y %H:%M"),
        truncate(row.customer_name.as_deref().unwrap_or("-"), 19),
        truncate(&row.staff_name, 12),
        money(Money::from_satang(row.total_satang)),
        truncate(&row.payment_method, 5),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
