//! # Receipt Numbering
//!
//! Issues receipt codes from a singleton counter row, reusing recycled
//! codes first so cancelled-before-commit numbers don't leave holes.
//!
//! ## Issue Order
//! ```text
//! next_code()
//!    │
//!    ▼ BEGIN IMMEDIATE
//! ┌──────────────────────────────────────────────┐
//! │ 1. pop oldest canceled_receipt_numbers row   │──found──► return it
//! │    (this machine's first, then any)          │
//! │ 2. otherwise: current_number + 1, UPDATE     │──────────► format code
//! └──────────────────────────────────────────────┘
//!    ▼ COMMIT
//! ```
//!
//! Both steps run inside one immediate transaction, so two terminals
//! can never pop the same recycled code or read the same counter value.
//!
//! [`ReceiptNumberService`] layers the settings.json fallback on top:
//! used only when the primary path errors while the database is still
//! reachable. An unreachable database propagates the error instead.

use sqlx::sqlite::SqliteConnection;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use veranda_core::format_receipt_code;

use crate::error::{DbError, DbResult};
use crate::repository::{begin_immediate, commit, now_rfc3339, rollback};
use crate::settings::SettingsStore;

// =============================================================================
// Repository (primary path)
// =============================================================================

/// Counter row state, for diagnostics and fallback syncing.
#[derive(Debug, Clone)]
pub struct CounterState {
    pub prefix: String,
    pub current_number: i64,
    pub recycled_pending: i64,
}

#[derive(Debug, Clone)]
pub struct ReceiptNumberRepository {
    pool: SqlitePool,
}

impl ReceiptNumberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptNumberRepository { pool }
    }

    /// Issues the next receipt code: oldest recycled code first, then
    /// the incremented counter. Atomic across terminals.
    pub async fn next_code(&self, machine_id: &str) -> DbResult<String> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;

        match Self::next_code_inner(&mut conn, machine_id).await {
            Ok(code) => {
                commit(&mut conn).await?;
                debug!(code = %code, "Issued receipt code");
                Ok(code)
            }
            Err(e) => {
                rollback(&mut conn).await;
                Err(e)
            }
        }
    }

    async fn next_code_inner(conn: &mut SqliteConnection, machine_id: &str) -> DbResult<String> {
        // Recycled codes from this terminal first, oldest first
        if let Some(code) = Self::pop_recycled(conn, Some(machine_id)).await? {
            return Ok(code);
        }
        if let Some(code) = Self::pop_recycled(conn, None).await? {
            return Ok(code);
        }

        let row = sqlx::query("SELECT prefix, current_number FROM receipt_counter WHERE id = 1")
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DbError::invalid("receipt_counter row missing (seed migration not applied)"))?;

        let prefix: String = row.get("prefix");
        let current: i64 = row.get("current_number");
        let next = current + 1;

        sqlx::query(
            "UPDATE receipt_counter SET current_number = ?, last_updated = ?, updated_by = ? WHERE id = 1",
        )
        .bind(next)
        .bind(now_rfc3339())
        .bind(machine_id)
        .execute(&mut *conn)
        .await?;

        Ok(format_receipt_code(&prefix, next))
    }

    async fn pop_recycled(
        conn: &mut SqliteConnection,
        machine_id: Option<&str>,
    ) -> DbResult<Option<String>> {
        let row = match machine_id {
            Some(machine) => {
                sqlx::query(
                    "SELECT receipt_code FROM canceled_receipt_numbers \
                     WHERE owner_machine_id = ? ORDER BY canceled_at, rowid LIMIT 1",
                )
                .bind(machine)
                .fetch_optional(&mut *conn)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT receipt_code FROM canceled_receipt_numbers \
                     ORDER BY canceled_at, rowid LIMIT 1",
                )
                .fetch_optional(&mut *conn)
                .await?
            }
        };

        let Some(row) = row else {
            return Ok(None);
        };
        let code: String = row.get("receipt_code");

        let deleted = sqlx::query("DELETE FROM canceled_receipt_numbers WHERE receipt_code = ?")
            .bind(&code)
            .execute(&mut *conn)
            .await?;

        // rows_affected 0 cannot happen under the immediate lock, but
        // treat it as "not found" rather than issuing a code twice
        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        info!(code = %code, "Reusing recycled receipt code");
        Ok(Some(code))
    }

    /// Returns a receipt code to the recycle pool. Idempotent: the
    /// code is the primary key, so a second recycle is a no-op.
    pub async fn recycle_code(&self, code: &str, machine_id: &str) -> DbResult<()> {
        self.recycle_code_with_reason(code, machine_id, None).await
    }

    pub async fn recycle_code_with_reason(
        &self,
        code: &str,
        machine_id: &str,
        reason: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO canceled_receipt_numbers \
             (receipt_code, canceled_at, reason, owner_machine_id) VALUES (?, ?, ?, ?)",
        )
        .bind(code)
        .bind(now_rfc3339())
        .bind(reason)
        .bind(machine_id)
        .execute(&self.pool)
        .await?;

        info!(code = %code, "Receipt code recycled");
        Ok(())
    }

    /// Recycles a code on an already-open transaction, for use inside
    /// checkout failure compensation.
    pub(crate) async fn recycle_code_on(
        conn: &mut SqliteConnection,
        code: &str,
        machine_id: &str,
        reason: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO canceled_receipt_numbers \
             (receipt_code, canceled_at, reason, owner_machine_id) VALUES (?, ?, ?, ?)",
        )
        .bind(code)
        .bind(now_rfc3339())
        .bind(reason)
        .bind(machine_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Current counter state for diagnostics.
    pub async fn counter_state(&self) -> DbResult<CounterState> {
        let row = sqlx::query("SELECT prefix, current_number FROM receipt_counter WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::invalid("receipt_counter row missing"))?;

        let pending: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM canceled_receipt_numbers")
            .fetch_one(&self.pool)
            .await?;

        Ok(CounterState {
            prefix: row.get("prefix"),
            current_number: row.get("current_number"),
            recycled_pending: pending,
        })
    }
}

// =============================================================================
// Service (primary + fallback)
// =============================================================================

/// Receipt numbering with the settings.json fallback layered on.
///
/// The fallback fires only when the database answered a health check
/// but the numbering transaction still failed. A dead database
/// propagates the error: issuing numbers blind would fork the sequence
/// across terminals.
#[derive(Debug, Clone)]
pub struct ReceiptNumberService {
    repo: ReceiptNumberRepository,
    settings: SettingsStore,
    machine_id: String,
}

impl ReceiptNumberService {
    pub fn new(repo: ReceiptNumberRepository, settings: SettingsStore, machine_id: impl Into<String>) -> Self {
        ReceiptNumberService {
            repo,
            settings,
            machine_id: machine_id.into(),
        }
    }

    pub async fn next_code(&self) -> DbResult<String> {
        match self.repo.next_code(&self.machine_id).await {
            Ok(code) => {
                // Keep the fallback counter fresh for the day it is needed
                if let Ok(state) = self.repo.counter_state().await {
                    let _ = self
                        .settings
                        .sync_counter(&state.prefix, state.current_number + 1);
                }
                Ok(code)
            }
            Err(DbError::ConnectionFailed(msg)) => Err(DbError::ConnectionFailed(msg)),
            Err(DbError::PoolExhausted) => Err(DbError::PoolExhausted),
            Err(primary_err) => {
                warn!(error = %primary_err, "Primary receipt numbering failed, using local fallback");
                self.settings.next_fallback_code()
            }
        }
    }

    pub async fn recycle_code(&self, code: &str) -> DbResult<()> {
        match self.repo.recycle_code(code, &self.machine_id).await {
            Ok(()) => Ok(()),
            Err(DbError::ConnectionFailed(msg)) => Err(DbError::ConnectionFailed(msg)),
            Err(primary_err) => {
                warn!(error = %primary_err, code = %code, "Recycle failed in database, recording locally");
                self.settings.push_recycled(code)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
