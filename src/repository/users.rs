//! Read-only lookups against the identity service's users table.
//!
//! This service never inserts, updates or deletes a user row.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{Principal, Role},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a principal by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Principal> {
        sqlx::query_as::<_, Principal>("SELECT id, email, role, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::UserNotFound(format!("User with id {} not found", id)))
    }

    /// Get a principal by ID, requiring a specific role
    pub async fn get_with_role(&self, id: i64, role: Role) -> AppResult<Principal> {
        let principal = self.get_by_id(id).await?;
        if principal.role != role {
            return Err(AppError::UserNotFound(format!(
                "{} with id {} not found",
                role, id
            )));
        }
        Ok(principal)
    }
}
