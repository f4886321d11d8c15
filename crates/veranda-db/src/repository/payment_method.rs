//! Payment methods, seeded by migration and extendable by admins.

use sqlx::SqlitePool;
use tracing::info;

use veranda_core::PaymentMethod;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct PaymentMethodRepository {
    pool: SqlitePool,
}

impl PaymentMethodRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentMethodRepository { pool }
    }

    pub async fn list_active(&self) -> DbResult<Vec<PaymentMethod>> {
        let rows = sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, code: &str) -> DbResult<PaymentMethod> {
        sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Payment method", code))
    }

    pub async fn upsert(&self, code: &str, name: &str) -> DbResult<PaymentMethod> {
        sqlx::query(
            "INSERT INTO payment_methods (code, name, is_active) VALUES (?, ?, 1) \
             ON CONFLICT (code) DO UPDATE SET name = excluded.name",
        )
        .bind(code)
        .bind(name)
        .execute(&self.pool)
        .await?;

        info!(code, "Payment method upserted");
        self.get(code).await
    }

    pub async fn set_active(&self, code: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE payment_methods SET is_active = ? WHERE code = ?")
            .bind(active)
            .bind(code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment method", code));
        }
        Ok(())
    }
}
