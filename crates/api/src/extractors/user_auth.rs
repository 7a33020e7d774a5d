//! Authenticated user extractor.
//!
//! `require_user_auth` resolves the bearer token and stores the
//! [`CurrentUser`] in request extensions; handlers receive it explicitly
//! through [`AuthUser`].

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::CurrentUser;

use crate::error::ApiError;

/// The user behind the bearer token of this request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub CurrentUser);

impl std::ops::Deref for AuthUser {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

/// Raw bearer token of the request, as presented by the client.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Request};
    use domain::models::Role;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let (mut parts, _) = Request::new(()).into_parts();
        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_user_from_extensions() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            name: "Bob".into(),
            email: "bob@example.com".into(),
            role: Role::Support,
        };
        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(user.clone());
        let AuthUser(found) = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, Role::Support);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer hd_abc"));
        assert_eq!(bearer_token(&headers), Some("hd_abc"));
    }
}
