//! Login, logout and password flows.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::models::auth::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
    ResetPasswordRequest, VerifyTokenQuery,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{bearer_token, AuthUser};
use crate::services::auth::{spawn_reset_email, AuthService};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub expires_in: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenResponse {
    pub message: String,
    pub email: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.pool.clone(), &state.config.auth)
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = auth_service(&state).login(request).await?;
    Ok(Json(response))
}

/// Revokes the token that made this request.
///
/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
    auth_service(&state).logout(token).await?;
    Ok(Json(json!({ "message": "Logged out" })))
}

/// POST /api/password/forgot
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let (user, token) = auth_service(&state).forgot_password(&request).await?;
    spawn_reset_email(state.email.clone(), user, token);

    Ok(Json(ForgotPasswordResponse {
        message: "Password reset link sent".to_string(),
        expires_in: format_ttl(state.config.auth.reset_token_ttl_minutes),
    }))
}

/// GET /api/password/verify-token?token=&email=
pub async fn verify_token(
    State(state): State<AppState>,
    Query(query): Query<VerifyTokenQuery>,
) -> Result<Json<VerifyTokenResponse>, ApiError> {
    let verified = auth_service(&state)
        .verify_reset_token(query.token.as_deref(), query.email.as_deref())
        .await?;
    Ok(Json(VerifyTokenResponse {
        message: "Token is valid".to_string(),
        email: verified.email,
        expires_at: verified.expires_at,
    }))
}

/// POST /api/password/reset
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    auth_service(&state).reset_password(request).await?;
    Ok(Json(json!({ "message": "Password reset successfully" })))
}

/// POST /api/password/change
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    auth_service(&state).change_password(&user, request).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Password changed successfully" })),
    ))
}

fn format_ttl(minutes: i64) -> String {
    match minutes {
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{} minutes", m),
    }
}
