//! # Coupon Reservations
//!
//! Soft, TTL-bounded holds on limited coupon stock while a sale is
//! being built. One reservation row per (definition, session); adding
//! more of the same coupon to a cart replaces the row's quantity.
//!
//! ## Atomicity
//! `try_reserve` reads stock and writes the reservation inside one
//! immediate transaction. Two terminals reserving the last unit at the
//! same moment serialize on the write lock; the loser sees the winner's
//! row and is refused.
//!
//! Reservations are advisory: checkout re-verifies real stock, so an
//! expired-but-unpurged row can never oversell, only over-refuse.

use chrono::{Duration, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use veranda_core::{allocation, CoreError, CouponKind, DEFAULT_RESERVATION_TTL_SECS};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_immediate, commit, now_rfc3339, rollback};

#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Reserves `quantity` units of a definition for a session,
    /// replacing any existing reservation by the same session. Refused
    /// with [`CoreError::InsufficientAvailability`] mapped to
    /// [`DbError::InvalidOperation`] when stock (minus other sessions'
    /// live holds) cannot cover it.
    ///
    /// Unlimited definitions always succeed; the row is still written
    /// so the cart survives a session listing.
    ///
    /// `ttl` bounds the hold; `None` uses
    /// [`DEFAULT_RESERVATION_TTL_SECS`].
    pub async fn try_reserve(
        &self,
        definition_id: &str,
        session_id: &str,
        quantity: i64,
        ttl: Option<Duration>,
    ) -> DbResult<()> {
        if quantity <= 0 {
            return Err(DbError::invalid("Reservation quantity must be positive"));
        }
        let ttl = ttl.unwrap_or_else(|| Duration::seconds(DEFAULT_RESERVATION_TTL_SECS));
        if ttl <= Duration::zero() {
            return Err(DbError::invalid("Reservation TTL must be positive"));
        }

        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;

        match Self::try_reserve_inner(&mut conn, definition_id, session_id, quantity, ttl).await {
            Ok(()) => {
                commit(&mut conn).await?;
                debug!(definition_id, session_id, quantity, "Reservation placed");
                Ok(())
            }
            Err(e) => {
                rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    async fn try_reserve_inner(
        conn: &mut SqliteConnection,
        definition_id: &str,
        session_id: &str,
        quantity: i64,
        ttl: Duration,
    ) -> DbResult<()> {
        let kind_row = sqlx::query("SELECT kind FROM coupon_definitions WHERE id = ? AND is_active = 1")
            .bind(definition_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::not_found("Coupon definition", definition_id))?;
        let kind: CouponKind = kind_row.get("kind");

        if kind == CouponKind::Limited {
            let unused = Self::unused_count(conn, definition_id).await?;
            let held_by_others =
                Self::reserved_by_others(conn, definition_id, session_id).await?;

            if !allocation::can_reserve(unused, held_by_others, quantity) {
                let err = CoreError::InsufficientAvailability {
                    definition_id: definition_id.to_string(),
                    available: allocation::available_units(unused, held_by_others),
                    requested: quantity,
                };
                return Err(DbError::invalid(err.to_string()));
            }
        }

        let expires_at = (Utc::now() + ttl).to_rfc3339();

        sqlx::query(
            "INSERT INTO coupon_reservations (definition_id, session_id, quantity, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (definition_id, session_id) \
             DO UPDATE SET quantity = excluded.quantity, expires_at = excluded.expires_at",
        )
        .bind(definition_id)
        .bind(session_id)
        .bind(quantity)
        .bind(&expires_at)
        .bind(now_rfc3339())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Unsold, unredeemed generated codes for a definition.
    pub(crate) async fn unused_count(
        conn: &mut SqliteConnection,
        definition_id: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM generated_coupons WHERE definition_id = ? AND is_used = 0",
        )
        .bind(definition_id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// Units held by live reservations belonging to other sessions.
    pub(crate) async fn reserved_by_others(
        conn: &mut SqliteConnection,
        definition_id: &str,
        session_id: &str,
    ) -> DbResult<i64> {
        let held: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity) FROM coupon_reservations \
             WHERE definition_id = ? AND session_id != ? AND expires_at > ?",
        )
        .bind(definition_id)
        .bind(session_id)
        .bind(now_rfc3339())
        .fetch_one(conn)
        .await?;
        Ok(held.unwrap_or(0))
    }

    /// Units visible to a session: unused stock minus other sessions'
    /// live holds. For display, not for enforcement.
    pub async fn available_for_session(
        &self,
        definition_id: &str,
        session_id: &str,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let unused = Self::unused_count(&mut conn, definition_id).await?;
        let held = Self::reserved_by_others(&mut conn, definition_id, session_id).await?;
        Ok(allocation::available_units(unused, held))
    }

    /// Releases `quantity` units of one definition's hold for a session
    /// (cart line reduced or removed). Drops the row outright when the
    /// release covers the whole hold, otherwise decrements it; the
    /// schema forbids zero-quantity reservation rows.
    pub async fn release(
        &self,
        definition_id: &str,
        session_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        if quantity <= 0 {
            return Err(DbError::invalid("Release quantity must be positive"));
        }

        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;

        let result = async {
            // Delete first: a decrement to zero would trip the
            // CHECK (quantity > 0) constraint.
            sqlx::query(
                "DELETE FROM coupon_reservations \
                 WHERE definition_id = ? AND session_id = ? AND quantity <= ?",
            )
            .bind(definition_id)
            .bind(session_id)
            .bind(quantity)
            .execute(&mut *conn)
            .await?;

            sqlx::query(
                "UPDATE coupon_reservations SET quantity = quantity - ? \
                 WHERE definition_id = ? AND session_id = ?",
            )
            .bind(quantity)
            .bind(definition_id)
            .bind(session_id)
            .execute(&mut *conn)
            .await?;

            DbResult::Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                commit(&mut conn).await?;
                debug!(definition_id, session_id, quantity, "Reservation released");
                Ok(())
            }
            Err(e) => {
                rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    /// Drops every hold a session owns (cart cleared, checkout done,
    /// session ended).
    pub async fn release_session(&self, session_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM coupon_reservations WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        debug!(session_id, released = result.rows_affected(), "Session reservations released");
        Ok(result.rows_affected())
    }

    /// Deletes reservations past their TTL. Run periodically; safe to
    /// skip since expired rows are ignored by every availability query.
    pub async fn purge_expired(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM coupon_reservations WHERE expires_at <= ?")
            .bind(now_rfc3339())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!(purged = result.rows_affected(), "Expired reservations purged");
        }
        Ok(result.rows_affected())
    }

    /// Releases a session's holds on an already-open transaction, for
    /// checkout commit.
    pub(crate) async fn release_session_on(
        conn: &mut SqliteConnection,
        session_id: &str,
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM coupon_reservations WHERE session_id = ?")
            .bind(session_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
