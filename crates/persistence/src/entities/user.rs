//! User and authentication entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::Role;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for user roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum RoleDb {
    Admin,
    Support,
    Assistant,
    Cliente,
}

impl From<RoleDb> for Role {
    fn from(db: RoleDb) -> Self {
        match db {
            RoleDb::Admin => Role::Admin,
            RoleDb::Support => Role::Support,
            RoleDb::Assistant => Role::Assistant,
            RoleDb::Cliente => Role::Cliente,
        }
    }
}

impl From<Role> for RoleDb {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => RoleDb::Admin,
            Role::Support => RoleDb::Support,
            Role::Assistant => RoleDb::Assistant,
            Role::Cliente => RoleDb::Cliente,
        }
    }
}

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: RoleDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for domain::models::User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            password_hash: entity.password_hash,
            role: entity.role.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the personal_access_tokens table.
#[derive(Debug, Clone, FromRow)]
pub struct AccessTokenEntity {
    pub id: i64,
    pub user_id: Uuid,
    pub token_hash: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccessTokenEntity {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Database row mapping for the password_resets table.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetEntity {
    pub email: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<PasswordResetEntity> for domain::models::auth::PasswordReset {
    fn from(entity: PasswordResetEntity) -> Self {
        Self {
            email: entity.email,
            token_hash: entity.token_hash,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_conversions_roundtrip() {
        for role in Role::all() {
            let db: RoleDb = (*role).into();
            assert_eq!(Role::from(db), *role);
        }
    }

    #[test]
    fn test_user_entity_to_domain() {
        let now = Utc::now();
        let entity = UserEntity {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
            role: RoleDb::Cliente,
            created_at: now,
            updated_at: now,
        };
        let user: domain::models::User = entity.clone().into();
        assert_eq!(user.id, entity.id);
        assert_eq!(user.role, Role::Cliente);
    }

    #[test]
    fn test_token_expiry() {
        let now = Utc::now();
        let mut token = AccessTokenEntity {
            id: 1,
            user_id: Uuid::new_v4(),
            token_hash: "a".repeat(64),
            last_used_at: None,
            expires_at: None,
            created_at: now,
        };
        assert!(!token.is_expired(now));
        token.expires_at = Some(now - Duration::seconds(1));
        assert!(token.is_expired(now));
    }
}
