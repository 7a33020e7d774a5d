//! Attachment entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Attachment;
use sqlx::FromRow;

/// Database row mapping for the attachments table.
#[derive(Debug, Clone, FromRow)]
pub struct AttachmentEntity {
    pub id: i64,
    pub ticket_id: i64,
    pub message_id: Option<i64>,
    pub original_name: String,
    pub stored_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<AttachmentEntity> for Attachment {
    fn from(entity: AttachmentEntity) -> Self {
        Self {
            id: entity.id,
            ticket_id: entity.ticket_id,
            message_id: entity.message_id,
            original_name: entity.original_name,
            stored_path: entity.stored_path,
            mime_type: entity.mime_type,
            size_bytes: entity.size_bytes,
            created_at: entity.created_at,
        }
    }
}
