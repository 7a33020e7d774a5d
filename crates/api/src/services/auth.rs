//! Authentication service: opaque bearer tokens and password flows.

use chrono::{DateTime, Utc};
use domain::models::auth::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
    ResetPasswordRequest,
};
use domain::models::{CurrentUser, User};
use persistence::repositories::{AccessTokenRepository, PasswordResetRepository, UserRepository};
use shared::crypto::{generate_access_token, generate_secure_token, is_well_formed_access_token, sha256_hex};
use shared::password::{check_new_password, hash_password, verify_password, PasswordError};
use sqlx::PgPool;
use thiserror::Error;
use validator::Validate;

use crate::config::AuthConfig;
use crate::error::ApiError;
use crate::services::email::EmailService;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    ResetTokenExpired,

    #[error("Invalid or expired token")]
    InvalidResetToken,

    #[error("Token and email are required")]
    MissingResetFields,

    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    #[error("User not found")]
    UserNotFound,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::ResetTokenExpired
            | AuthError::InvalidResetToken
            | AuthError::MissingResetFields
            | AuthError::WrongCurrentPassword => ApiError::BadRequest(err.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::PasswordError(e) => e.into(),
            AuthError::Validation(e) => e.into(),
            AuthError::DatabaseError(e) => e.into(),
        }
    }
}

/// A reset token that passed every check.
#[derive(Debug, Clone)]
pub struct VerifiedReset {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    tokens: AccessTokenRepository,
    resets: PasswordResetRepository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(pool: PgPool, config: &AuthConfig) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            tokens: AccessTokenRepository::new(pool.clone()),
            resets: PasswordResetRepository::new(pool),
            config: config.clone(),
        }
    }

    /// Checks credentials and issues a new bearer token.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        request.validate()?;

        let Some(entity) = self.users.find_by_email(&request.email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&request.password, &entity.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let user: User = entity.into();
        let token = generate_access_token();
        let expires_at = self.config.token_ttl().map(|ttl| Utc::now() + ttl);
        self.tokens
            .create(user.id, &sha256_hex(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(LoginResponse::bearer(user.into(), token))
    }

    /// Revokes only the presented token.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let removed = self.tokens.delete_by_hash(&sha256_hex(token)).await?;
        if !removed {
            return Err(AuthError::InvalidToken);
        }
        Ok(())
    }

    /// Resolves a bearer token to the user behind it.
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        if !is_well_formed_access_token(token) {
            return Err(AuthError::InvalidToken);
        }
        let hash = sha256_hex(token);
        let Some(row) = self.tokens.find_owner(&hash).await? else {
            return Err(AuthError::InvalidToken);
        };

        if row.expires_at.is_some_and(|at| at <= Utc::now()) {
            if let Err(e) = self.tokens.delete_by_hash(&hash).await {
                tracing::warn!(error = %e, "Failed to delete expired token");
            }
            return Err(AuthError::InvalidToken);
        }

        if let Err(e) = self.tokens.touch(row.token_id).await {
            tracing::warn!(token_id = row.token_id, error = %e, "Failed to update token last_used_at");
        }

        let user: User = row.user.into();
        Ok(user.as_current())
    }

    /// Stores a fresh reset token for the email and returns the plain token.
    ///
    /// Earlier tokens for the same address are replaced.
    pub async fn forgot_password(
        &self,
        request: &ForgotPasswordRequest,
    ) -> Result<(User, String), AuthError> {
        request.validate()?;
        let Some(entity) = self.users.find_by_email(&request.email).await? else {
            return Err(AuthError::UserNotFound);
        };
        let user: User = entity.into();

        let token = generate_secure_token();
        self.resets.replace(&user.email, &sha256_hex(&token)).await?;
        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok((user, token))
    }

    /// Checks a reset token. An expired one is deleted on the way out.
    pub async fn verify_reset_token(
        &self,
        token: Option<&str>,
        email: Option<&str>,
    ) -> Result<VerifiedReset, AuthError> {
        let (Some(token), Some(email)) = (
            token.map(str::trim).filter(|t| !t.is_empty()),
            email.map(str::trim).filter(|e| !e.is_empty()),
        ) else {
            return Err(AuthError::MissingResetFields);
        };

        let Some(reset) = self.resets.find(email).await? else {
            return Err(AuthError::InvalidResetToken);
        };
        let reset: domain::models::auth::PasswordReset = reset.into();
        if reset.token_hash != sha256_hex(token) {
            return Err(AuthError::InvalidResetToken);
        }

        let ttl = self.config.reset_token_ttl();
        if reset.is_expired(Utc::now(), ttl) {
            self.resets.delete(&reset.email).await?;
            return Err(AuthError::ResetTokenExpired);
        }

        Ok(VerifiedReset {
            expires_at: reset.expires_at(ttl),
            email: reset.email,
        })
    }

    /// Sets a new password from a reset token and revokes every bearer token.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), AuthError> {
        request.validate()?;
        check_new_password(
            &request.password,
            Some(request.password_confirmation.as_deref().unwrap_or_default()),
        )?;

        let verified = self
            .verify_reset_token(Some(&request.token), Some(&request.email))
            .await?;
        let Some(user) = self.users.find_by_email(&verified.email).await? else {
            return Err(AuthError::UserNotFound);
        };

        let hash = hash_password(&request.password)?;
        self.users.update_password(user.id, &hash).await?;
        self.resets.delete(&verified.email).await?;
        let revoked = self.tokens.delete_for_user(user.id).await?;

        tracing::info!(user_id = %user.id, revoked_tokens = revoked, "Password reset completed");
        Ok(())
    }

    pub async fn change_password(
        &self,
        actor: &CurrentUser,
        request: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        request.validate()?;
        check_new_password(
            &request.password,
            Some(request.password_confirmation.as_deref().unwrap_or_default()),
        )?;

        let Some(user) = self.users.find_by_id(actor.id).await? else {
            return Err(AuthError::UserNotFound);
        };
        if !verify_password(&request.current_password, &user.password_hash)? {
            return Err(AuthError::WrongCurrentPassword);
        }

        let hash = hash_password(&request.password)?;
        self.users.update_password(user.id, &hash).await?;
        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}

/// Emails the reset link without holding up the response. Failures are logged.
pub fn spawn_reset_email(email: EmailService, user: User, token: String) {
    tokio::spawn(async move {
        if let Err(e) = email
            .send_password_reset_email(&user.email, Some(&user.name), &token)
            .await
        {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }
    });
}
