//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::Rng;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        RegisterAdmin, RegisterUser, Role, UpdateProfile, User, UserClaims, UserShort,
    },
    repository::{users::PURPOSE_EMAIL_VERIFICATION, Repository},
    services::email::{notify_detached, EmailService},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
    email: EmailService,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig, email: EmailService) -> Self {
        Self { repository, config, email }
    }

    /// Register a member account. The account stays unverified until the
    /// emailed code is confirmed.
    pub async fn register_member(&self, payload: &RegisterUser) -> AppResult<UserShort> {
        let password_hash = self.hash_password(&payload.password)?;
        let user = self
            .repository
            .users
            .create(
                &payload.email,
                &password_hash,
                payload.firstname.as_deref(),
                payload.lastname.as_deref(),
                Role::Member,
            )
            .await?;

        let code = generate_verification_code();
        self.repository
            .users
            .create_verification_code(
                user.id,
                &code,
                PURPOSE_EMAIL_VERIFICATION,
                self.config.verification_code_ttl_minutes,
            )
            .await?;

        let email = self.email.clone();
        let recipient = user.email.clone();
        notify_detached(async move { email.send_verification_code(&recipient, &code).await });

        tracing::info!(user_id = user.id, "Member registered");
        Ok(user.into())
    }

    /// Register an admin account, gated by the configured secret code.
    /// Admin accounts skip email verification.
    pub async fn register_admin(&self, payload: &RegisterAdmin) -> AppResult<UserShort> {
        if payload.secret_code != self.config.admin_secret_code {
            return Err(AppError::Forbidden("Invalid admin registration code".to_string()));
        }

        let password_hash = self.hash_password(&payload.password)?;
        let user = self
            .repository
            .users
            .create(
                &payload.email,
                &password_hash,
                payload.firstname.as_deref(),
                payload.lastname.as_deref(),
                Role::Admin,
            )
            .await?;
        self.repository.users.set_verified(user.id).await?;

        tracing::info!(user_id = user.id, "Admin registered");
        self.repository.users.get_by_id(user.id).await.map(Into::into)
    }

    /// Confirm an emailed verification code and activate the account
    pub async fn verify_email(&self, email: &str, code: &str) -> AppResult<()> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid or expired verification code".to_string()))?;

        let consumed = self
            .repository
            .users
            .consume_verification_code(user.id, code, PURPOSE_EMAIL_VERIFICATION)
            .await?;
        if !consumed {
            return Err(AppError::Validation(
                "Invalid or expired verification code".to_string(),
            ));
        }

        self.repository.users.set_verified(user.id).await?;
        tracing::info!(user_id = user.id, "Email verified");
        Ok(())
    }

    /// Authenticate by email and password, returning a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }
        if !user.is_active {
            return Err(AppError::Authentication("Account is deactivated".to_string()));
        }
        if !user.is_verified {
            return Err(AppError::Authentication("Email address is not verified".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };
        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Get a user's profile
    pub async fn get_profile(&self, user_id: i64) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Update the caller's profile
    pub async fn update_profile(&self, user_id: i64, profile: &UpdateProfile) -> AppResult<User> {
        self.repository.users.update_profile(user_id, profile).await
    }

    /// List users (admin surface)
    pub async fn list(&self, page: i64, per_page: i64) -> AppResult<(Vec<UserShort>, i64)> {
        self.repository.users.list(page, per_page).await
    }

    /// Get a user (admin surface)
    pub async fn get(&self, user_id: i64) -> AppResult<UserShort> {
        self.repository.users.get_by_id(user_id).await.map(Into::into)
    }

    /// Activate or deactivate an account (admin surface)
    pub async fn set_active(&self, user_id: i64, active: bool) -> AppResult<()> {
        self.repository.users.set_active(user_id, active).await
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| AppError::Internal(format!("Invalid stored password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }
}

/// Six-digit numeric verification code
fn generate_verification_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
