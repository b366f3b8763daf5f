//! PostgreSQL-backed user store

use async_trait::async_trait;
use common::error::DatabaseError;
use sqlx::{PgPool, Row};
use tracing::info;

use super::password::{hash_password, verify_password};
use super::{StoreError, UserStore};
use crate::models::{ProfileUpdate, User, UserId};

/// User store over the `users` table
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A unique violation on insert means the email is taken
fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Database(DatabaseError::Query(err))
}

fn query_error(err: sqlx::Error) -> StoreError {
    StoreError::Database(DatabaseError::Query(err))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, email: &str, password: &str) -> Result<UserId, StoreError> {
        info!("Creating new user: {}", email);

        let hashed_password = hash_password(password).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (email, hashed_password)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(&hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(row.get("id"))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserId, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, hashed_password
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?
        .ok_or(StoreError::InvalidCredentials)?;

        let hashed_password: String = row.get("hashed_password");
        if !verify_password(&hashed_password, password).await? {
            return Err(StoreError::InvalidCredentials);
        }

        Ok(row.get("id"))
    }

    async fn get(&self, id: UserId) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, age, phone, created
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn update(&self, changes: &ProfileUpdate, id: UserId) -> Result<(), StoreError> {
        info!(
            "Updating user {}: name={:?}, phone={:?}, age={}",
            id, changes.name, changes.phone, changes.age
        );

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $1, phone = $2, age = $3
            WHERE id = $4
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.phone)
        .bind(changes.age)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        common::database::health_check(&self.pool).await?;
        Ok(())
    }
}
