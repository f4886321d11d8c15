//! # Checkout
//!
//! Turns a cart into a committed receipt: receipt row, item rows,
//! coupon allocation and reservation cleanup, all inside a single
//! immediate transaction.
//!
//! ## Flow
//! ```text
//! checkout(draft)
//!    │
//!    ├─ 1. issue receipt code (counter / recycled / local fallback)
//!    │
//!    ├─ 2. BEGIN IMMEDIATE
//!    │      insert receipt + items
//!    │      allocate coupon units (preselected or lowest-first)
//!    │      release this session's reservations
//!    │   COMMIT
//!    │
//!    └─ 3. on ANY step-2 failure: recycle the issued code, ROLLBACK
//! ```
//!
//! Allocation re-verifies real stock under the write lock; the soft
//! reservation layer is advisory only. Preselected codes are
//! all-or-nothing: one stale unit aborts the sale so the desk can fix
//! the selection instead of silently selling a different unit.

use sqlx::sqlite::SqliteConnection;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use veranda_core::{
    CouponKind, GeneratedCoupon, Receipt, ReceiptItem, MAX_CART_LINES, MAX_LINE_QUANTITY,
};

use crate::error::{DbError, DbResult};
use crate::repository::receipt_number::ReceiptNumberService;
use crate::repository::reservation::ReservationRepository;
use crate::repository::{begin_immediate, commit, now_rfc3339, rollback};

// =============================================================================
// Draft Types
// =============================================================================

/// One cart line at checkout. Name and unit price are the frozen
/// snapshots taken when the line was added to the cart.
#[derive(Debug, Clone)]
pub struct DraftLine {
    pub definition_id: String,
    pub name: String,
    pub unit_price_satang: i64,
    pub quantity: i64,
    pub discount_satang: i64,

    /// Specific unit ids chosen by the staff member; empty means
    /// lowest-sequence-first automatic selection.
    pub selected_code_ids: Vec<String>,
}

impl DraftLine {
    pub fn line_total_satang(&self) -> i64 {
        self.unit_price_satang * self.quantity - self.discount_satang
    }
}

impl From<&veranda_core::cart::CartLine> for DraftLine {
    fn from(line: &veranda_core::cart::CartLine) -> Self {
        DraftLine {
            definition_id: line.definition_id.clone(),
            name: line.name.clone(),
            unit_price_satang: line.unit_price_satang,
            quantity: line.quantity,
            discount_satang: line.discount_satang,
            selected_code_ids: line.selected_code_ids.clone(),
        }
    }
}

/// A cart ready to commit.
#[derive(Debug, Clone)]
pub struct ReceiptDraft {
    pub session_id: String,
    pub staff_id: String,
    pub customer_id: Option<String>,
    pub payment_method: String,
    pub machine_id: String,
    pub notes: Option<String>,
    pub lines: Vec<DraftLine>,
}

/// Everything the printer needs after a successful checkout.
#[derive(Debug, Clone)]
pub struct CompletedSale {
    pub receipt: Receipt,
    pub items: Vec<ReceiptItem>,
    /// Allocated units, in item order then sequence order.
    pub coupons: Vec<GeneratedCoupon>,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cannot commit an empty cart")]
    EmptyDraft,

    #[error("Cart has too many lines (max {MAX_CART_LINES})")]
    TooManyLines,

    #[error("Line quantity out of range (1..={MAX_LINE_QUANTITY})")]
    QuantityOutOfRange,

    #[error("Selected {selected} unit(s) but line quantity is {quantity}")]
    SelectionMismatch { selected: usize, quantity: i64 },

    /// One or more preselected units were sold by another terminal
    /// between selection and commit.
    #[error("Coupon unit(s) no longer available: {}", unavailable.join(", "))]
    CodesUnavailable { unavailable: Vec<String> },

    #[error("Not enough units of {definition_id}: {available} available, {requested} requested")]
    InsufficientStock {
        definition_id: String,
        available: i64,
        requested: i64,
    },

    #[error("Coupon definition not sellable: {0}")]
    DefinitionUnavailable(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        CheckoutError::Db(err.into())
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CheckoutRepository {
    pool: SqlitePool,
}

impl CheckoutRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutRepository { pool }
    }

    /// Full checkout: issue a receipt code, commit the sale, recycle
    /// the code if the commit fails for any reason.
    pub async fn checkout(
        &self,
        draft: ReceiptDraft,
        numbers: &ReceiptNumberService,
    ) -> Result<CompletedSale, CheckoutError> {
        Self::validate_draft(&draft)?;

        let receipt_code = numbers.next_code().await?;

        match self.commit_with_code(&draft, &receipt_code).await {
            Ok(sale) => Ok(sale),
            Err(e) => {
                warn!(code = %receipt_code, error = %e, "Checkout failed, recycling receipt code");
                if let Err(recycle_err) = numbers.recycle_code(&receipt_code).await {
                    warn!(code = %receipt_code, error = %recycle_err, "Recycle after failed checkout also failed");
                }
                Err(e)
            }
        }
    }

    /// Commits a draft against an already-issued receipt code. The
    /// caller owns recycling the code on failure.
    pub async fn commit_with_code(
        &self,
        draft: &ReceiptDraft,
        receipt_code: &str,
    ) -> Result<CompletedSale, CheckoutError> {
        Self::validate_draft(draft)?;

        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        begin_immediate(&mut conn).await?;

        match Self::commit_inner(&mut conn, draft, receipt_code).await {
            Ok(sale) => {
                commit(&mut conn).await?;
                info!(
                    receipt_code,
                    total_satang = sale.receipt.total_satang,
                    lines = sale.items.len(),
                    "Checkout committed"
                );
                Ok(sale)
            }
            Err(e) => {
                rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    fn validate_draft(draft: &ReceiptDraft) -> Result<(), CheckoutError> {
        if draft.lines.is_empty() {
            return Err(CheckoutError::EmptyDraft);
        }
        if draft.lines.len() > MAX_CART_LINES {
            return Err(CheckoutError::TooManyLines);
        }
        for line in &draft.lines {
            if line.quantity < 1 || line.quantity > MAX_LINE_QUANTITY {
                return Err(CheckoutError::QuantityOutOfRange);
            }
            if !line.selected_code_ids.is_empty()
                && line.selected_code_ids.len() as i64 != line.quantity
            {
                return Err(CheckoutError::SelectionMismatch {
                    selected: line.selected_code_ids.len(),
                    quantity: line.quantity,
                });
            }
        }
        Ok(())
    }

    async fn commit_inner(
        conn: &mut SqliteConnection,
        draft: &ReceiptDraft,
        receipt_code: &str,
    ) -> Result<CompletedSale, CheckoutError> {
        let now = now_rfc3339();

        let subtotal: i64 = draft
            .lines
            .iter()
            .map(|l| l.unit_price_satang * l.quantity)
            .sum();
        let discount: i64 = draft.lines.iter().map(|l| l.discount_satang).sum();
        let total = subtotal - discount;

        let receipt_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO receipts \
             (id, receipt_code, status, customer_id, staff_id, payment_method, \
              subtotal_satang, discount_satang, total_satang, machine_id, notes, created_at, updated_at) \
             VALUES (?, ?, 'active', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&receipt_id)
        .bind(receipt_code)
        .bind(&draft.customer_id)
        .bind(&draft.staff_id)
        .bind(&draft.payment_method)
        .bind(subtotal)
        .bind(discount)
        .bind(total)
        .bind(&draft.machine_id)
        .bind(&draft.notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        let mut coupons = Vec::new();

        for line in &draft.lines {
            let def_row = sqlx::query(
                "SELECT kind, is_active FROM coupon_definitions WHERE id = ?",
            )
            .bind(&line.definition_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CheckoutError::DefinitionUnavailable(line.definition_id.clone()))?;

            let kind: CouponKind = def_row.get("kind");
            let is_active: bool = def_row.get("is_active");
            if !is_active {
                return Err(CheckoutError::DefinitionUnavailable(line.definition_id.clone()));
            }

            let item_id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO receipt_items \
                 (id, receipt_id, definition_id, name_snapshot, unit_price_satang, \
                  quantity, discount_satang, line_total_satang, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&item_id)
            .bind(&receipt_id)
            .bind(&line.definition_id)
            .bind(&line.name)
            .bind(line.unit_price_satang)
            .bind(line.quantity)
            .bind(line.discount_satang)
            .bind(line.line_total_satang())
            .bind(&now)
            .execute(&mut *conn)
            .await?;

            if kind == CouponKind::Limited {
                let allocated =
                    Self::allocate_units(conn, line, &item_id, draft, &now).await?;
                coupons.extend(allocated);
            }

            items.push(ReceiptItem {
                id: item_id,
                receipt_id: receipt_id.clone(),
                definition_id: line.definition_id.clone(),
                name_snapshot: line.name.clone(),
                unit_price_satang: line.unit_price_satang,
                quantity: line.quantity,
                discount_satang: line.discount_satang,
                line_total_satang: line.line_total_satang(),
                created_at: chrono::Utc::now(),
            });
        }

        ReservationRepository::release_session_on(conn, &draft.session_id).await?;

        let receipt = sqlx::query_as::<_, Receipt>("SELECT * FROM receipts WHERE id = ?")
            .bind(&receipt_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(CompletedSale {
            receipt,
            items,
            coupons,
        })
    }

    /// Flips `quantity` units to used for one line, preferring the
    /// staff member's explicit selection. Every flip is guarded on
    /// `is_used = 0`; a failed guard aborts the whole sale.
    async fn allocate_units(
        conn: &mut SqliteConnection,
        line: &DraftLine,
        item_id: &str,
        draft: &ReceiptDraft,
        now: &str,
    ) -> Result<Vec<GeneratedCoupon>, CheckoutError> {
        let unit_ids: Vec<String> = if line.selected_code_ids.is_empty() {
            let ids: Vec<String> = sqlx::query_scalar(
                "SELECT id FROM generated_coupons \
                 WHERE definition_id = ? AND is_used = 0 ORDER BY seq LIMIT ?",
            )
            .bind(&line.definition_id)
            .bind(line.quantity)
            .fetch_all(&mut *conn)
            .await?;

            if (ids.len() as i64) < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    definition_id: line.definition_id.clone(),
                    available: ids.len() as i64,
                    requested: line.quantity,
                });
            }
            ids
        } else {
            line.selected_code_ids.clone()
        };

        let mut stale = Vec::new();
        for unit_id in &unit_ids {
            let updated = sqlx::query(
                "UPDATE generated_coupons \
                 SET is_used = 1, used_at = ?, used_by = ?, receipt_item_id = ?, customer_id = ? \
                 WHERE id = ? AND definition_id = ? AND is_used = 0",
            )
            .bind(now)
            .bind(&draft.staff_id)
            .bind(item_id)
            .bind(&draft.customer_id)
            .bind(unit_id)
            .bind(&line.definition_id)
            .execute(&mut *conn)
            .await?;

            if updated.rows_affected() != 1 {
                let code: Option<String> = sqlx::query_scalar(
                    "SELECT generated_code FROM generated_coupons WHERE id = ?",
                )
                .bind(unit_id)
                .fetch_optional(&mut *conn)
                .await?;
                stale.push(code.unwrap_or_else(|| unit_id.clone()));
            }
        }

        if !stale.is_empty() {
            return Err(CheckoutError::CodesUnavailable { unavailable: stale });
        }

        let mut allocated = Vec::with_capacity(unit_ids.len());
        for unit_id in &unit_ids {
            let row = sqlx::query_as::<_, GeneratedCoupon>(
                "SELECT * FROM generated_coupons WHERE id = ?",
            )
            .bind(unit_id)
            .fetch_one(&mut *conn)
            .await?;
            allocated.push(row);
        }
        Ok(allocated)
    }
}
