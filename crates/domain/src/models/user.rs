//! User accounts and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// The four closed roles of the helpdesk. Exactly one per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full visibility, manages user accounts.
    Admin,
    /// Full ticket visibility.
    #[serde(alias = "suporte")]
    Support,
    /// Sees only tickets assigned to them.
    #[serde(alias = "assistente")]
    Assistant,
    /// Customer; sees only their own tickets.
    #[serde(alias = "client")]
    Cliente,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Support => "support",
            Role::Assistant => "assistant",
            Role::Cliente => "cliente",
        }
    }

    /// Any non-client role.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Cliente)
    }

    pub fn all() -> &'static [Role] {
        &[Role::Admin, Role::Support, Role::Assistant, Role::Cliente]
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "support" | "suporte" => Ok(Role::Support),
            "assistant" | "assistente" => Ok(Role::Assistant),
            "cliente" | "client" => Ok(Role::Cliente),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn as_current(&self) -> CurrentUser {
        CurrentUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Public projection of a user embedded in other responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The authenticated caller. Passed explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Full user payload returned by `/me` and the user admin endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Request body for `POST /users`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub role: Role,
}

/// Request body for `PUT /users/{id}`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub role: Option<Role>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// Request body for `PUT /me`. Role changes are not possible here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str_accepts_portuguese_aliases() {
        assert_eq!(Role::from_str("suporte").unwrap(), Role::Support);
        assert_eq!(Role::from_str("ASSISTENTE").unwrap(), Role::Assistant);
        assert_eq!(Role::from_str("cliente").unwrap(), Role::Cliente);
        assert!(Role::from_str("root").is_err());
    }

    #[test]
    fn test_role_roundtrips_through_display() {
        for role in Role::all() {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), *role);
        }
    }

    #[test]
    fn test_role_is_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Support.is_staff());
        assert!(Role::Assistant.is_staff());
        assert!(!Role::Cliente.is_staff());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Cliente).unwrap(), "\"cliente\"");
        let role: Role = serde_json::from_str("\"suporte\"").unwrap();
        assert_eq!(role, Role::Support);
    }

    #[test]
    fn test_user_never_serializes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Cliente,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "cliente");
    }

    #[test]
    fn test_create_user_request_validation() {
        let mut request = CreateUserRequest {
            name: "Bob".into(),
            email: "bob@example.com".into(),
            password: "secret1".into(),
            role: Role::Support,
        };
        assert!(request.validate().is_ok());

        request.password = "12345".into();
        assert!(request.validate().is_err());

        request.password = "secret1".into();
        request.email = "not-an-email".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_user_request_accepts_generated_users() {
        use fake::faker::internet::en::{Password, SafeEmail};
        use fake::faker::name::en::Name;
        use fake::Fake;

        for _ in 0..20 {
            let request = CreateUserRequest {
                name: Name().fake(),
                email: SafeEmail().fake(),
                password: Password(6..32).fake(),
                role: Role::Cliente,
            };
            assert!(request.validate().is_ok(), "{:?}", request.email);
        }
    }

    #[test]
    fn test_update_profile_allows_empty_patch() {
        assert!(UpdateProfileRequest::default().validate().is_ok());
        let bad = UpdateProfileRequest {
            name: Some(String::new()),
            email: None,
        };
        assert!(bad.validate().is_err());
    }
}
