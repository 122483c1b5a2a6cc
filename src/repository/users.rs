//! Users repository for identity operations

use chrono::{Duration, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, UpdateProfile, User, UserShort},
    repository::is_unique_violation,
};

/// Verification code purposes as stored
pub const PURPOSE_EMAIL_VERIFICATION: &str = "email_verification";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Create a user account
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        firstname: Option<&str>,
        lastname: Option<&str>,
        role: Role,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, firstname, lastname, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(firstname)
        .bind(lastname)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("An account with this email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })
    }

    /// List users with pagination
    pub async fn list(&self, page: i64, per_page: i64) -> AppResult<(Vec<UserShort>, i64)> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let users = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT id, email, firstname, lastname, role, is_verified, is_active
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    /// Update profile fields; absent fields keep their current value
    pub async fn update_profile(&self, id: i64, profile: &UpdateProfile) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET firstname = COALESCE($2, firstname),
                lastname = COALESCE($3, lastname),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&profile.firstname)
        .bind(&profile.lastname)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Mark a user's email as verified
    pub async fn set_verified(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Activate or deactivate an account
    pub async fn set_active(&self, id: i64, active: bool) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Store a verification code with its expiry
    pub async fn create_verification_code(
        &self,
        user_id: i64,
        code: &str,
        purpose: &str,
        ttl_minutes: u64,
    ) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::minutes(ttl_minutes as i64);
        sqlx::query(
            r#"
            INSERT INTO verification_codes (user_id, code, purpose, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(purpose)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Consume a live verification code; returns false when no live code
    /// matches (wrong, expired, or already used).
    pub async fn consume_verification_code(
        &self,
        user_id: i64,
        code: &str,
        purpose: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE verification_codes
            SET consumed_at = NOW()
            WHERE user_id = $1 AND code = $2 AND purpose = $3
              AND consumed_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(purpose)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
