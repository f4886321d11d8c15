//! Customer CRUD. Customers are optional on a sale; most walk-ups stay
//! anonymous and only room-charge guests get a record.

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use veranda_core::{validation, Customer};

use crate::error::{DbError, DbResult};
use crate::repository::now_rfc3339;

/// Input for creating or updating a customer.
#[derive(Debug, Clone)]
pub struct CustomerInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, input: CustomerInput) -> DbResult<Customer> {
        validation::validate_person_name(&input.name)
            .map_err(|e| DbError::invalid(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            "INSERT INTO customers (id, name, phone, email, room_number, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.room_number)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(customer_id = %id, "Customer created");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn update(&self, id: &str, input: CustomerInput) -> DbResult<Customer> {
        validation::validate_person_name(&input.name)
            .map_err(|e| DbError::invalid(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE customers SET name = ?, phone = ?, email = ?, room_number = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.room_number)
        .bind(now_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        self.get(id).await
    }

    /// Name / phone / room search for the desk lookup box.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Customer>> {
        validation::validate_search_query(query).map_err(|e| DbError::invalid(e.to_string()))?;

        let pattern = format!("%{}%", query.replace('%', "").replace('_', ""));
        let rows = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers \
             WHERE name LIKE ? OR phone LIKE ? OR room_number LIKE ? \
             ORDER BY name LIMIT ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list(&self, limit: i64) -> DbResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
