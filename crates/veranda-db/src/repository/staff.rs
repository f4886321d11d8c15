//! Staff members. Attribution only; authentication is the terminal
//! shell's concern.

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use veranda_core::StaffMember;

use crate::error::{DbError, DbResult};
use crate::repository::now_rfc3339;

#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    pub async fn create(&self, display_name: &str, login_name: &str) -> DbResult<StaffMember> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO staff_members (id, display_name, login_name, is_active, created_at) \
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(&id)
        .bind(display_name)
        .bind(login_name)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(staff_id = %id, login_name, "Staff member created");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> DbResult<StaffMember> {
        sqlx::query_as::<_, StaffMember>("SELECT * FROM staff_members WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Staff member", id))
    }

    pub async fn get_by_login(&self, login_name: &str) -> DbResult<StaffMember> {
        sqlx::query_as::<_, StaffMember>("SELECT * FROM staff_members WHERE login_name = ?")
            .bind(login_name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Staff member", login_name))
    }

    pub async fn list_active(&self) -> DbResult<Vec<StaffMember>> {
        let rows = sqlx::query_as::<_, StaffMember>(
            "SELECT * FROM staff_members WHERE is_active = 1 ORDER BY display_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Soft delete / restore. History keeps pointing at the row.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE staff_members SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Staff member", id));
        }
        Ok(())
    }
}
