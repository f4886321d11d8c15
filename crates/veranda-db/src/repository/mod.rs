//! # Repository Modules
//!
//! One repository per aggregate. Each holds a pool clone and exposes
//! async methods returning domain types from veranda-core.
//!
//! Multi-step writes that must be atomic (numbering, reservation,
//! checkout, cancellation) open an explicit `BEGIN IMMEDIATE`
//! transaction so the write lock is taken before the first read.

pub mod audit;
pub mod checkout;
pub mod coupon;
pub mod customer;
pub mod payment_method;
pub mod receipt;
pub mod receipt_number;
pub mod report;
pub mod reservation;
pub mod staff;

use chrono::Utc;
use sqlx::sqlite::SqliteConnection;

use crate::error::DbResult;

/// Current timestamp as the RFC 3339 UTC string stored in every
/// timestamp column. Lexicographic order matches chronological order.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Opens an immediate transaction on a dedicated connection, runs the
/// closure-free inner body via the caller, then commits or rolls back.
///
/// sqlx's `Pool::begin` issues a deferred BEGIN; SQLite only upgrades
/// to the write lock at the first write, which reopens the
/// check-then-write race this layer exists to close. So the write
/// transactions here are managed by hand.
pub(crate) async fn begin_immediate(conn: &mut SqliteConnection) -> DbResult<()> {
    sqlx::query("BEGIN IMMEDIATE").execute(conn).await?;
    Ok(())
}

pub(crate) async fn commit(conn: &mut SqliteConnection) -> DbResult<()> {
    sqlx::query("COMMIT").execute(conn).await?;
    Ok(())
}

pub(crate) async fn rollback(conn: &mut SqliteConnection) {
    // Rollback failure leaves the connection poisoned; dropping it
    // returns it to the pool where sqlx resets it.
    let _ = sqlx::query("ROLLBACK").execute(conn).await;
}
