//! WhatsApp channel message repository.

use domain::models::WhatsappMessageKind;
use sqlx::PgPool;

use crate::entities::WhatsappMessageEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct WhatsappMessageRepository {
    pool: PgPool,
}

impl WhatsappMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        ticket_id: i64,
        body: &str,
        kind: WhatsappMessageKind,
    ) -> Result<WhatsappMessageEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_whatsapp_message");
        let result = sqlx::query_as::<_, WhatsappMessageEntity>(
            r#"
            INSERT INTO whatsapp_messages (ticket_id, body, kind)
            VALUES ($1, $2, $3)
            RETURNING id, ticket_id, body, kind, created_at
            "#,
        )
        .bind(ticket_id)
        .bind(body)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Conversation of a ticket, oldest first.
    pub async fn list_for_ticket(
        &self,
        ticket_id: i64,
    ) -> Result<Vec<WhatsappMessageEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_whatsapp_messages");
        let result = sqlx::query_as::<_, WhatsappMessageEntity>(
            r#"
            SELECT id, ticket_id, body, kind, created_at
            FROM whatsapp_messages
            WHERE ticket_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
