//! Ticket message and WhatsApp message entities.

use chrono::{DateTime, Utc};
use domain::models::{TicketMessage, WhatsappMessage, WhatsappMessageKind};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Database row mapping for the ticket_messages table.
#[derive(Debug, Clone, FromRow)]
pub struct TicketMessageEntity {
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: Uuid,
    pub message: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TicketMessageEntity> for TicketMessage {
    fn from(entity: TicketMessageEntity) -> Self {
        Self {
            id: entity.id,
            ticket_id: entity.ticket_id,
            user_id: entity.user_id,
            message: entity.message,
            is_internal: entity.is_internal,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the whatsapp_messages table.
#[derive(Debug, Clone, FromRow)]
pub struct WhatsappMessageEntity {
    pub id: i64,
    pub ticket_id: i64,
    pub body: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl From<WhatsappMessageEntity> for WhatsappMessage {
    fn from(entity: WhatsappMessageEntity) -> Self {
        Self {
            id: entity.id,
            ticket_id: entity.ticket_id,
            body: entity.body,
            // The column has a CHECK constraint; anything else is system noise.
            kind: WhatsappMessageKind::from_str(&entity.kind)
                .unwrap_or(WhatsappMessageKind::Sistema),
            created_at: entity.created_at,
        }
    }
}
