//! Postgres-backed identity store for the durable configuration.
//!
//! Only credential records live in Postgres; the fast-moving lockout and
//! revocation state is Redis-backed (see [`super::redis`]).

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{AuthError, Result};
use crate::models::User;
use crate::storage::{with_timeout, IdentityStore};

pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let pool = self.pool.clone();
        with_timeout(async move {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&pool)
                .await?;
            Ok(user)
        })
        .await
    }

    async fn create(&self, user: User) -> Result<()> {
        let pool = self.pool.clone();
        with_timeout(async move {
            let result = sqlx::query(
                r#"
                INSERT INTO users (email, password_hash, display_name, disabled,
                                   two_factor_enabled, two_factor_secret,
                                   pending_two_factor_secret, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.display_name)
            .bind(user.disabled)
            .bind(user.two_factor_enabled)
            .bind(&user.two_factor_secret)
            .bind(&user.pending_two_factor_secret)
            .bind(user.created_at)
            .execute(&pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    Err(AuthError::EmailAlreadyExists)
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn set_pending_second_factor(&self, email: &str, secret: &str) -> Result<()> {
        let pool = self.pool.clone();
        with_timeout(async move {
            let result =
                sqlx::query("UPDATE users SET pending_two_factor_secret = $2 WHERE email = $1")
                    .bind(email)
                    .bind(secret)
                    .execute(&pool)
                    .await?;

            if result.rows_affected() == 0 {
                return Err(AuthError::UnknownSubject);
            }
            Ok(())
        })
        .await
    }

    async fn activate_second_factor(&self, email: &str) -> Result<()> {
        let pool = self.pool.clone();
        with_timeout(async move {
            // Promotion is a single statement so the pending secret cannot
            // be activated twice.
            let result = sqlx::query(
                r#"
                UPDATE users
                SET two_factor_enabled = TRUE,
                    two_factor_secret = pending_two_factor_secret,
                    pending_two_factor_secret = NULL
                WHERE email = $1 AND pending_two_factor_secret IS NOT NULL
                "#,
            )
            .bind(email)
            .execute(&pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AuthError::SecondFactorNotEnabled);
            }
            Ok(())
        })
        .await
    }

    async fn clear_second_factor(&self, email: &str) -> Result<()> {
        let pool = self.pool.clone();
        with_timeout(async move {
            let result = sqlx::query(
                r#"
                UPDATE users
                SET two_factor_enabled = FALSE,
                    two_factor_secret = NULL,
                    pending_two_factor_secret = NULL
                WHERE email = $1
                "#,
            )
            .bind(email)
            .execute(&pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AuthError::UnknownSubject);
            }
            Ok(())
        })
        .await
    }
}
