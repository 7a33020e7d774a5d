//! Bearer token authentication middleware.
//!
//! Resolves the opaque token in the Authorization header to a
//! [`CurrentUser`](domain::models::CurrentUser) and stores it in request
//! extensions for [`AuthUser`](crate::extractors::AuthUser).

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;
use crate::extractors::bearer_token;
use crate::services::auth::{AuthError, AuthService};

/// Middleware that requires a valid bearer token.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()).map(str::to_string) else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    let auth = AuthService::new(state.pool.clone(), &state.config.auth);
    match auth.authenticate(&token).await {
        Ok(user) => {
            tracing::Span::current().record("user_id", tracing::field::display(user.id));
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(AuthError::DatabaseError(e)) => {
            tracing::error!(error = %e, "Token lookup failed");
            internal_error_response("Authentication service unavailable")
        }
        Err(e) => {
            tracing::debug!(error = %e, "Bearer token rejected");
            unauthorized_response("Invalid or expired token")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

fn internal_error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": message
        })),
    )
        .into_response()
}
