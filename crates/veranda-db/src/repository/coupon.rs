//! # Coupon Repository
//!
//! Coupon definitions (the sellable products) and their generated
//! per-unit codes: batch generation, complimentary issue, lookup and
//! venue-side redemption.
//!
//! ## Batch Generation Idempotency
//! `generate_batch` takes a caller-supplied batch id. Replaying the
//! same batch id returns the previously generated codes instead of
//! minting new ones, so a crashed-and-retried admin action never
//! doubles the stock.

use chrono::Utc;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use veranda_core::{
    allocation, validation, CouponDefinition, CouponKind, GeneratedCoupon, RedeemOutcome,
};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_immediate, commit, now_rfc3339, rollback};

// =============================================================================
// Input / Output Types
// =============================================================================

/// Input for creating a coupon definition.
#[derive(Debug, Clone)]
pub struct NewDefinition {
    pub code_prefix: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: CouponKind,
    pub price_satang: i64,
    pub valid_until: Option<chrono::DateTime<Utc>>,
}

/// Updatable fields of a definition. Kind and prefix are frozen after
/// creation; generated codes already carry the prefix.
#[derive(Debug, Clone, Default)]
pub struct DefinitionUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price_satang: Option<i64>,
    pub valid_until: Option<Option<chrono::DateTime<Utc>>>,
}

/// Result of looking up or redeeming a generated code.
///
/// For `lookup_code` the outcome is what `redeem_code` would return
/// right now; for `redeem_code` it is what actually happened.
#[derive(Debug, Clone)]
pub struct CodeLookup {
    pub outcome: RedeemOutcome,
    pub coupon: Option<GeneratedCoupon>,
    pub definition_name: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    // === Definitions ===

    pub async fn create_definition(&self, input: NewDefinition) -> DbResult<CouponDefinition> {
        validation::validate_definition_name(&input.name)
            .map_err(|e| DbError::invalid(e.to_string()))?;
        validation::validate_code_prefix(&input.code_prefix)
            .map_err(|e| DbError::invalid(e.to_string()))?;
        validation::validate_price_satang(input.price_satang)
            .map_err(|e| DbError::invalid(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            "INSERT INTO coupon_definitions \
             (id, code_prefix, name, description, kind, price_satang, valid_until, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&id)
        .bind(&input.code_prefix)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.kind)
        .bind(input.price_satang)
        .bind(input.valid_until.map(|t| t.to_rfc3339()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(definition_id = %id, name = %input.name, "Coupon definition created");
        self.get_definition(&id).await
    }

    pub async fn get_definition(&self, id: &str) -> DbResult<CouponDefinition> {
        sqlx::query_as::<_, CouponDefinition>("SELECT * FROM coupon_definitions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Coupon definition", id))
    }

    pub async fn list_definitions(&self, include_inactive: bool) -> DbResult<Vec<CouponDefinition>> {
        let rows = if include_inactive {
            sqlx::query_as::<_, CouponDefinition>(
                "SELECT * FROM coupon_definitions ORDER BY name",
            )
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, CouponDefinition>(
                "SELECT * FROM coupon_definitions WHERE is_active = 1 ORDER BY name",
            )
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    pub async fn update_definition(
        &self,
        id: &str,
        update: DefinitionUpdate,
    ) -> DbResult<CouponDefinition> {
        let mut def = self.get_definition(id).await?;

        if let Some(name) = update.name {
            validation::validate_definition_name(&name)
                .map_err(|e| DbError::invalid(e.to_string()))?;
            def.name = name;
        }
        if let Some(description) = update.description {
            def.description = description;
        }
        if let Some(price) = update.price_satang {
            validation::validate_price_satang(price)
                .map_err(|e| DbError::invalid(e.to_string()))?;
            def.price_satang = price;
        }
        if let Some(valid_until) = update.valid_until {
            def.valid_until = valid_until;
        }

        sqlx::query(
            "UPDATE coupon_definitions \
             SET name = ?, description = ?, price_satang = ?, valid_until = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&def.name)
        .bind(&def.description)
        .bind(def.price_satang)
        .bind(def.valid_until.map(|t| t.to_rfc3339()))
        .bind(now_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_definition(id).await
    }

    /// Soft delete / restore. Inactive definitions stop selling but keep
    /// their receipt history intact.
    pub async fn set_definition_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE coupon_definitions SET is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(active)
        .bind(now_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon definition", id));
        }
        info!(definition_id = %id, active, "Coupon definition active flag changed");
        Ok(())
    }

    // === Generated Codes ===

    /// Generates `count` new codes for a limited definition, continuing
    /// the sequence from the highest existing seq. Idempotent per
    /// `batch_id`.
    pub async fn generate_batch(
        &self,
        definition_id: &str,
        batch_id: &str,
        count: i64,
    ) -> DbResult<Vec<GeneratedCoupon>> {
        validation::validate_batch_size(count).map_err(|e| DbError::invalid(e.to_string()))?;

        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;

        match Self::generate_batch_inner(&mut conn, definition_id, batch_id, count).await {
            Ok(codes) => {
                commit(&mut conn).await?;
                Ok(codes)
            }
            Err(e) => {
                rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    async fn generate_batch_inner(
        conn: &mut SqliteConnection,
        definition_id: &str,
        batch_id: &str,
        count: i64,
    ) -> DbResult<Vec<GeneratedCoupon>> {
        let def = sqlx::query_as::<_, CouponDefinition>(
            "SELECT * FROM coupon_definitions WHERE id = ?",
        )
        .bind(definition_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Coupon definition", definition_id))?;

        if def.kind != CouponKind::Limited {
            return Err(DbError::invalid(
                "Cannot generate codes for an unlimited definition",
            ));
        }

        // Replay of an already-committed batch returns the same rows
        let existing = sqlx::query_as::<_, GeneratedCoupon>(
            "SELECT * FROM generated_coupons WHERE batch_id = ? ORDER BY seq",
        )
        .bind(batch_id)
        .fetch_all(&mut *conn)
        .await?;
        if !existing.is_empty() {
            debug!(batch_id, "Batch already generated, returning existing codes");
            return Ok(existing);
        }

        let max_seq: Option<i64> =
            sqlx::query_scalar("SELECT MAX(seq) FROM generated_coupons WHERE definition_id = ?")
                .bind(definition_id)
                .fetch_one(&mut *conn)
                .await?;
        let start = max_seq.unwrap_or(0) + 1;

        let now = now_rfc3339();
        let expires_at = def.valid_until.map(|t| t.to_rfc3339());

        for seq in start..start + count {
            let code = format!("{}-{:04}", def.code_prefix, seq);
            sqlx::query(
                "INSERT INTO generated_coupons \
                 (id, definition_id, generated_code, batch_id, seq, is_used, is_complimentary, expires_at, created_at) \
                 VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(definition_id)
            .bind(&code)
            .bind(batch_id)
            .bind(seq)
            .bind(&expires_at)
            .bind(&now)
            .execute(&mut *conn)
            .await?;
        }

        info!(definition_id, batch_id, count, start_seq = start, "Generated coupon batch");

        let rows = sqlx::query_as::<_, GeneratedCoupon>(
            "SELECT * FROM generated_coupons WHERE batch_id = ? ORDER BY seq",
        )
        .bind(batch_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    pub async fn list_codes(
        &self,
        definition_id: &str,
        only_unused: bool,
    ) -> DbResult<Vec<GeneratedCoupon>> {
        let rows = if only_unused {
            sqlx::query_as::<_, GeneratedCoupon>(
                "SELECT * FROM generated_coupons WHERE definition_id = ? AND is_used = 0 ORDER BY seq",
            )
            .bind(definition_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, GeneratedCoupon>(
                "SELECT * FROM generated_coupons WHERE definition_id = ? ORDER BY seq",
            )
            .bind(definition_id)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<GeneratedCoupon>> {
        let row = sqlx::query_as::<_, GeneratedCoupon>(
            "SELECT * FROM generated_coupons WHERE generated_code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Issues `quantity` lowest-sequence unused units as complimentary
    /// (sold outside a receipt, e.g. a goodwill gesture). Atomic: the
    /// selection and the flip happen under one write lock.
    pub async fn issue_complimentary(
        &self,
        definition_id: &str,
        quantity: i64,
        issued_by: &str,
        customer_id: Option<&str>,
    ) -> DbResult<Vec<GeneratedCoupon>> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;

        let result = async {
            let unused: Vec<String> = sqlx::query_scalar(
                "SELECT id FROM generated_coupons \
                 WHERE definition_id = ? AND is_used = 0 ORDER BY seq",
            )
            .bind(definition_id)
            .fetch_all(&mut *conn)
            .await?;

            let selected = allocation::select_lowest(definition_id, &unused, quantity)
                .map_err(|e| DbError::invalid(e.to_string()))?;

            let now = now_rfc3339();
            for id in &selected {
                let updated = sqlx::query(
                    "UPDATE generated_coupons \
                     SET is_used = 1, is_complimentary = 1, used_at = ?, used_by = ?, customer_id = ? \
                     WHERE id = ? AND is_used = 0",
                )
                .bind(&now)
                .bind(issued_by)
                .bind(customer_id)
                .bind(id)
                .execute(&mut *conn)
                .await?;
                if updated.rows_affected() != 1 {
                    return Err(DbError::invalid("Coupon unit taken concurrently"));
                }
            }

            let mut issued = Vec::with_capacity(selected.len());
            for id in &selected {
                let row = sqlx::query_as::<_, GeneratedCoupon>(
                    "SELECT * FROM generated_coupons WHERE id = ?",
                )
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
                issued.push(row);
            }
            Ok(issued)
        }
        .await;

        match result {
            Ok(issued) => {
                commit(&mut conn).await?;
                info!(definition_id, quantity, issued_by, "Complimentary coupons issued");
                Ok(issued)
            }
            Err(e) => {
                rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    // === Redemption ===

    /// Classifies a code without mutating it. The outcome is what
    /// [`redeem_code`](Self::redeem_code) would return right now.
    pub async fn lookup_code(&self, code: &str) -> DbResult<CodeLookup> {
        let coupon = self.find_by_code(code).await?;
        let (outcome, definition_name) = match &coupon {
            None => (RedeemOutcome::NotFound, None),
            Some(c) => {
                let name: Option<String> =
                    sqlx::query_scalar("SELECT name FROM coupon_definitions WHERE id = ?")
                        .bind(&c.definition_id)
                        .fetch_optional(&self.pool)
                        .await?;
                (Self::classify(c), name)
            }
        };
        Ok(CodeLookup {
            outcome,
            coupon,
            definition_name,
        })
    }

    /// Marks a sold, unexpired, not-yet-redeemed code as redeemed.
    /// The stamp is guarded (`redeemed_at IS NULL`), so two venue
    /// terminals scanning the same code yield exactly one `Redeemed`.
    pub async fn redeem_code(&self, code: &str, redeemed_by: &str) -> DbResult<CodeLookup> {
        let lookup = self.lookup_code(code).await?;
        if lookup.outcome != RedeemOutcome::Redeemed {
            return Ok(lookup);
        }

        let updated = sqlx::query(
            "UPDATE generated_coupons SET redeemed_at = ?, redeemed_by = ? \
             WHERE generated_code = ? AND is_used = 1 AND redeemed_at IS NULL",
        )
        .bind(now_rfc3339())
        .bind(redeemed_by)
        .bind(code)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // Lost the race to another terminal
            let mut lost = self.lookup_code(code).await?;
            if lost.outcome == RedeemOutcome::Redeemed {
                lost.outcome = RedeemOutcome::AlreadyRedeemed;
            }
            return Ok(lost);
        }

        info!(code, redeemed_by, "Coupon redeemed");
        self.lookup_code(code).await.map(|mut l| {
            l.outcome = RedeemOutcome::Redeemed;
            l
        })
    }

    fn classify(coupon: &GeneratedCoupon) -> RedeemOutcome {
        if !coupon.is_used {
            return RedeemOutcome::NotSold;
        }
        if coupon.redeemed_at.is_some() {
            return RedeemOutcome::AlreadyRedeemed;
        }
        if let Some(expires) = coupon.expires_at {
            if expires < Utc::now() {
                return RedeemOutcome::Expired;
            }
        }
        RedeemOutcome::Redeemed
    }
}
