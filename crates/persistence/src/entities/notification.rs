//! Notification entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Notification, NotificationKind};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Database row mapping for the notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub data: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationEntity> for Notification {
    type Error = String;

    fn try_from(entity: NotificationEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            kind: NotificationKind::from_str(&entity.kind)?,
            data: entity.data,
            read_at: entity.read_at,
            created_at: entity.created_at,
        })
    }
}
