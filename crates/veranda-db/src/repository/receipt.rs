//! # Receipt Repository
//!
//! Reads committed receipts and owns the two exit paths:
//!
//! - **cancel**: status flip plus compensating coupon release. The row
//!   stays (audit trail) and its receipt code is NOT recycled; reissuing
//!   it would collide with the unique code still held by the cancelled
//!   row.
//! - **discard_unprinted**: hard delete for a sale abandoned before any
//!   paper left the printer. The row goes away, so the code IS recycled.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::{info, warn};

use veranda_core::{GeneratedCoupon, Receipt, ReceiptItem, ReceiptStatus};

use crate::error::{DbError, DbResult};
use crate::repository::receipt_number::ReceiptNumberRepository;
use crate::repository::{begin_immediate, commit, now_rfc3339, rollback};

#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
}

impl ReceiptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptRepository { pool }
    }

    // === Reads ===

    pub async fn get_by_id(&self, id: &str) -> DbResult<Receipt> {
        sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", id))
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Receipt> {
        sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE receipt_code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", code))
    }

    pub async fn items(&self, receipt_id: &str) -> DbResult<Vec<ReceiptItem>> {
        let rows = sqlx::query_as::<_, ReceiptItem>(
            "SELECT * FROM receipt_items WHERE receipt_id = ? ORDER BY created_at, id",
        )
        .bind(receipt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Coupon units allocated to this receipt, in sequence order.
    pub async fn allocated_coupons(&self, receipt_id: &str) -> DbResult<Vec<GeneratedCoupon>> {
        let rows = sqlx::query_as::<_, GeneratedCoupon>(
            "SELECT gc.* FROM generated_coupons gc \
             JOIN receipt_items ri ON ri.id = gc.receipt_item_id \
             WHERE ri.receipt_id = ? ORDER BY gc.definition_id, gc.seq",
        )
        .bind(receipt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Receipts issued in `[from, to)`, newest first. Cancelled
    /// receipts are included; callers filter on status when they only
    /// want live sales.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Receipt>> {
        let rows = sqlx::query_as::<_, Receipt>(
            "SELECT * FROM receipts WHERE created_at >= ? AND created_at < ? \
             ORDER BY created_at DESC",
        )
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Receipt>> {
        let rows = sqlx::query_as::<_, Receipt>(
            "SELECT * FROM receipts ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Code prefix search for the desk's lookup box.
    pub async fn search_by_code(&self, prefix: &str, limit: i64) -> DbResult<Vec<Receipt>> {
        let pattern = format!("{}%", prefix.replace('%', "").replace('_', ""));
        let rows = sqlx::query_as::<_, Receipt>(
            "SELECT * FROM receipts WHERE receipt_code LIKE ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // === Printing ===

    /// Stamps the first print time. Reprints keep the original stamp,
    /// which is what gates the discard path.
    pub async fn mark_printed(&self, receipt_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE receipts SET printed_at = COALESCE(printed_at, ?), updated_at = ? WHERE id = ?",
        )
        .bind(now_rfc3339())
        .bind(now_rfc3339())
        .bind(receipt_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Receipt", receipt_id));
        }
        Ok(())
    }

    // === Cancellation ===

    /// Cancels an active receipt: status flip plus release of its
    /// coupon units back to sellable stock. Refused when any allocated
    /// unit was already redeemed, since the service it paid for has
    /// been consumed.
    pub async fn cancel(
        &self,
        receipt_id: &str,
        cancelled_by: &str,
        reason: &str,
    ) -> DbResult<Receipt> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;

        match Self::cancel_inner(&mut conn, receipt_id, cancelled_by, reason).await {
            Ok(receipt) => {
                commit(&mut conn).await?;
                info!(receipt_id, cancelled_by, "Receipt cancelled");
                Ok(receipt)
            }
            Err(e) => {
                rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    async fn cancel_inner(
        conn: &mut SqliteConnection,
        receipt_id: &str,
        cancelled_by: &str,
        reason: &str,
    ) -> DbResult<Receipt> {
        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?")
            .bind(receipt_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", receipt_id))?;

        if receipt.status != ReceiptStatus::Active {
            return Err(DbError::invalid("Receipt is already cancelled"));
        }

        let redeemed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM generated_coupons gc \
             JOIN receipt_items ri ON ri.id = gc.receipt_item_id \
             WHERE ri.receipt_id = ? AND gc.redeemed_at IS NOT NULL",
        )
        .bind(receipt_id)
        .fetch_one(&mut *conn)
        .await?;
        if redeemed > 0 {
            return Err(DbError::invalid(
                "Receipt has redeemed coupons and can no longer be cancelled",
            ));
        }

        let flipped = sqlx::query(
            "UPDATE receipts \
             SET status = 'cancelled', cancelled_at = ?, cancelled_by = ?, cancel_reason = ?, updated_at = ? \
             WHERE id = ? AND status = 'active'",
        )
        .bind(now_rfc3339())
        .bind(cancelled_by)
        .bind(reason)
        .bind(now_rfc3339())
        .bind(receipt_id)
        .execute(&mut *conn)
        .await?;
        if flipped.rows_affected() != 1 {
            return Err(DbError::invalid("Receipt was cancelled concurrently"));
        }

        Self::release_coupons(&mut *conn, receipt_id).await?;

        // Re-read on the same connection: the pool may have no second
        // one to give out (in-memory tests pin it to a single slot).
        let cancelled = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?")
            .bind(receipt_id)
            .fetch_one(conn)
            .await?;
        Ok(cancelled)
    }

    /// Compensating update: returns the receipt's allocated units to
    /// unused stock and clears their sale linkage.
    async fn release_coupons(conn: &mut SqliteConnection, receipt_id: &str) -> DbResult<u64> {
        let released = sqlx::query(
            "UPDATE generated_coupons \
             SET is_used = 0, used_at = NULL, used_by = NULL, receipt_item_id = NULL, customer_id = NULL \
             WHERE receipt_item_id IN (SELECT id FROM receipt_items WHERE receipt_id = ?)",
        )
        .bind(receipt_id)
        .execute(&mut *conn)
        .await?;
        Ok(released.rows_affected())
    }

    // === Discard (pre-print cleanup) ===

    /// Hard-deletes an active, never-printed receipt and recycles its
    /// code. For the "guest changed their mind before the paper came
    /// out" case; anything printed must go through [`cancel`](Self::cancel).
    pub async fn discard_unprinted(&self, receipt_id: &str, machine_id: &str) -> DbResult<String> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;

        match Self::discard_inner(&mut conn, receipt_id, machine_id).await {
            Ok(code) => {
                commit(&mut conn).await?;
                info!(receipt_id, code = %code, "Unprinted receipt discarded, code recycled");
                Ok(code)
            }
            Err(e) => {
                rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    async fn discard_inner(
        conn: &mut SqliteConnection,
        receipt_id: &str,
        machine_id: &str,
    ) -> DbResult<String> {
        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?")
            .bind(receipt_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", receipt_id))?;

        if receipt.status != ReceiptStatus::Active {
            return Err(DbError::invalid("Only active receipts can be discarded"));
        }
        if receipt.printed_at.is_some() {
            warn!(receipt_id, "Discard refused: receipt already printed");
            return Err(DbError::invalid(
                "Receipt has been printed; cancel it instead of discarding",
            ));
        }

        let released = Self::release_coupons(conn, receipt_id).await?;
        if released > 0 {
            info!(receipt_id, released, "Coupon units released on discard");
        }

        // Items cascade with the receipt row
        sqlx::query("DELETE FROM receipts WHERE id = ?")
            .bind(receipt_id)
            .execute(&mut *conn)
            .await?;

        ReceiptNumberRepository::recycle_code_on(
            conn,
            &receipt.receipt_code,
            machine_id,
            Some("discarded before printing"),
        )
        .await?;

        Ok(receipt.receipt_code)
    }
}
