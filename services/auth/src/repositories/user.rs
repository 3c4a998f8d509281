//! User repository for database operations

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::UserDirectory;
use crate::{
    error::{AuthError, AuthResult},
    models::{NewUser, User, user::normalize_email},
    password::hash_password_blocking,
    validation::validate_credentials,
};

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist yet
    pub async fn ensure_schema(&self) -> AuthResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Provision a new user, hashing the password
    ///
    /// Credentials that login would refuse are rejected up front.
    pub async fn create(&self, new_user: &NewUser) -> AuthResult<User> {
        let email = normalize_email(&new_user.email);
        validate_credentials(&email, &new_user.password).map_err(AuthError::BadRequest)?;
        info!("Creating new user: {}", email);

        let password_hash = hash_password_blocking(new_user.password.clone()).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Remove a user
    pub async fn delete(&self, id: Uuid) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let email = normalize_email(email);
        debug!("Finding user by email: {}", email);

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        debug!("Finding user by ID: {}", id);

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn health_check(&self) -> AuthResult<bool> {
        Ok(common::database::health_check(&self.pool).await?)
    }
}
