//! Attachment metadata repository.

use domain::models::NewAttachment;
use sqlx::PgPool;

use crate::entities::AttachmentEntity;
use crate::metrics::QueryTimer;

const ATTACHMENT_COLUMNS: &str =
    "id, ticket_id, message_id, original_name, stored_path, mime_type, size_bytes, created_at";

#[derive(Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
}

impl AttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewAttachment) -> Result<AttachmentEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_attachment");
        let result = sqlx::query_as::<_, AttachmentEntity>(&format!(
            r#"
            INSERT INTO attachments (
                ticket_id, message_id, original_name, stored_path, mime_type, size_bytes
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        ))
        .bind(new.scope.ticket_id())
        .bind(new.scope.message_id())
        .bind(&new.original_name)
        .bind(&new.stored_path)
        .bind(&new.mime_type)
        .bind(new.size_bytes)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<AttachmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_attachment_by_id");
        let result = sqlx::query_as::<_, AttachmentEntity>(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Ticket-level attachments (not tied to a message), newest first.
    pub async fn list_for_ticket(&self, ticket_id: i64) -> Result<Vec<AttachmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_ticket_attachments");
        let result = sqlx::query_as::<_, AttachmentEntity>(&format!(
            r#"
            SELECT {ATTACHMENT_COLUMNS}
            FROM attachments
            WHERE ticket_id = $1 AND message_id IS NULL
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Attachments of several messages at once, oldest first.
    pub async fn list_for_messages(
        &self,
        message_ids: &[i64],
    ) -> Result<Vec<AttachmentEntity>, sqlx::Error> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = QueryTimer::new("list_message_attachments");
        let result = sqlx::query_as::<_, AttachmentEntity>(&format!(
            r#"
            SELECT {ATTACHMENT_COLUMNS}
            FROM attachments
            WHERE message_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(message_ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Storage keys of every file under a ticket, message files included.
    /// Read before a ticket delete so the files can be cleaned up afterwards.
    pub async fn stored_paths_for_ticket(&self, ticket_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let timer = QueryTimer::new("attachment_paths_for_ticket");
        let result = sqlx::query_scalar::<_, String>(
            "SELECT stored_path FROM attachments WHERE ticket_id = $1",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn stored_paths_for_message(&self, message_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let timer = QueryTimer::new("attachment_paths_for_message");
        let result = sqlx::query_scalar::<_, String>(
            "SELECT stored_path FROM attachments WHERE message_id = $1",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_attachment");
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }
}
