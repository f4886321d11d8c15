//! Append-only audit log. Written on the mutations that matter to a
//! night auditor: cancellation, discard, complimentary issue, counter
//! fallback use.

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use veranda_core::AuditLogEntry;

use crate::error::DbResult;
use crate::repository::now_rfc3339;

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    pub async fn record(
        &self,
        actor: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        detail: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO audit_log (id, actor, action, entity_type, entity_id, detail, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(actor)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(detail)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Serializes a detail payload to JSON and records it.
    pub async fn record_with<T: Serialize>(
        &self,
        actor: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        detail: &T,
    ) -> DbResult<()> {
        let json = serde_json::to_string(detail).unwrap_or_default();
        self.record(actor, action, entity_type, entity_id, Some(&json))
            .await
    }

    pub async fn for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DbResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_log WHERE entity_type = ? AND entity_id = ? \
             ORDER BY created_at DESC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent(&self, limit: i64) -> DbResult<Vec<AuditLogEntry>> {
        let rows =
            sqlx::query_as::<_, AuditLogEntry>("SELECT * FROM audit_log ORDER BY created_at DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }
}
