//! # Reporting Queries
//!
//! Read-only aggregations over committed receipts. Everything here
//! counts only `status = 'active'` rows: a cancelled receipt
//! contributes nothing, which is exactly what the compensating
//! cancellation promises.
//!
//! Timestamps are stored as RFC 3339 UTC text, so range filters are
//! plain lexicographic comparisons and the day bucket is `substr(.., 1, 10)`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use veranda_core::{
    DailyTotalRow, DefinitionSalesRow, PaymentMethodTotal, ReportRow, SalesSummary, StaffSalesRow,
};

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Receipt-level rows for the printed/exported sales report.
    pub async fn report_rows(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<ReportRow>> {
        let rows = sqlx::query_as::<_, ReportRow>(
            "SELECT r.receipt_code, r.created_at AS issued_at, c.name AS customer_name, \
                    s.display_name AS staff_name, r.payment_method, r.total_satang \
             FROM receipts r \
             JOIN staff_members s ON s.id = r.staff_id \
             LEFT JOIN customers c ON c.id = r.customer_id \
             WHERE r.status = 'active' AND r.created_at >= ? AND r.created_at < ? \
             ORDER BY r.created_at",
        )
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<SalesSummary> {
        let summary = sqlx::query_as::<_, SalesSummary>(
            "SELECT COUNT(*) AS receipt_count, \
                    COALESCE(SUM(subtotal_satang), 0) AS subtotal_satang, \
                    COALESCE(SUM(discount_satang), 0) AS discount_satang, \
                    COALESCE(SUM(total_satang), 0) AS total_satang \
             FROM receipts \
             WHERE status = 'active' AND created_at >= ? AND created_at < ?",
        )
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    pub async fn sales_by_staff(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<StaffSalesRow>> {
        let rows = sqlx::query_as::<_, StaffSalesRow>(
            "SELECT r.staff_id, s.display_name AS staff_name, \
                    COUNT(*) AS receipt_count, COALESCE(SUM(r.total_satang), 0) AS total_satang \
             FROM receipts r \
             JOIN staff_members s ON s.id = r.staff_id \
             WHERE r.status = 'active' AND r.created_at >= ? AND r.created_at < ? \
             GROUP BY r.staff_id, s.display_name \
             ORDER BY total_satang DESC",
        )
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Per-definition units sold and revenue, plus remaining sellable
    /// stock for limited definitions (NULL for unlimited).
    pub async fn sales_by_definition(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<DefinitionSalesRow>> {
        let rows = sqlx::query_as::<_, DefinitionSalesRow>(
            "SELECT d.id AS definition_id, d.name, d.kind, \
                    COALESCE(SUM(ri.quantity), 0) AS quantity_sold, \
                    COALESCE(SUM(ri.line_total_satang), 0) AS total_satang, \
                    CASE WHEN d.kind = 'limited' THEN \
                        (SELECT COUNT(*) FROM generated_coupons gc \
                         WHERE gc.definition_id = d.id AND gc.is_used = 0) \
                    END AS remaining_units \
             FROM coupon_definitions d \
             LEFT JOIN receipt_items ri ON ri.definition_id = d.id \
                  AND ri.receipt_id IN \
                      (SELECT id FROM receipts \
                       WHERE status = 'active' AND created_at >= ? AND created_at < ?) \
             GROUP BY d.id, d.name, d.kind \
             ORDER BY total_satang DESC, d.name",
        )
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn payment_method_totals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<PaymentMethodTotal>> {
        let rows = sqlx::query_as::<_, PaymentMethodTotal>(
            "SELECT payment_method, COUNT(*) AS receipt_count, \
                    COALESCE(SUM(total_satang), 0) AS total_satang \
             FROM receipts \
             WHERE status = 'active' AND created_at >= ? AND created_at < ? \
             GROUP BY payment_method \
             ORDER BY total_satang DESC",
        )
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn daily_totals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<DailyTotalRow>> {
        let rows = sqlx::query_as::<_, DailyTotalRow>(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*) AS receipt_count, \
                    COALESCE(SUM(total_satang), 0) AS total_satang \
             FROM receipts \
             WHERE status = 'active' AND created_at >= ? AND created_at < ? \
             GROUP BY day ORDER BY day",
        )
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
