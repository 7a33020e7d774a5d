//! Ticket message repository.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::TicketMessageEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct TicketMessageRepository {
    pool: PgPool,
}

impl TicketMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        ticket_id: i64,
        user_id: Uuid,
        message: &str,
        is_internal: bool,
    ) -> Result<TicketMessageEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_ticket_message");
        let result = sqlx::query_as::<_, TicketMessageEntity>(
            r#"
            INSERT INTO ticket_messages (ticket_id, user_id, message, is_internal)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ticket_id, user_id, message, is_internal, created_at
            "#,
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(message)
        .bind(is_internal)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<TicketMessageEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_ticket_message_by_id");
        let result = sqlx::query_as::<_, TicketMessageEntity>(
            r#"
            SELECT id, ticket_id, user_id, message, is_internal, created_at
            FROM ticket_messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Messages of a ticket, oldest first. Internal ones only when asked for.
    pub async fn list_for_ticket(
        &self,
        ticket_id: i64,
        include_internal: bool,
    ) -> Result<Vec<TicketMessageEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_ticket_messages");
        let result = sqlx::query_as::<_, TicketMessageEntity>(
            r#"
            SELECT id, ticket_id, user_id, message, is_internal, created_at
            FROM ticket_messages
            WHERE ticket_id = $1 AND ($2 OR is_internal = FALSE)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(ticket_id)
        .bind(include_internal)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Delete a message; its attachment rows cascade.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_ticket_message");
        let result = sqlx::query("DELETE FROM ticket_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }
}
