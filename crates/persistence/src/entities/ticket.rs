//! Ticket entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Ticket, TicketOrigin, TicketPriority, TicketStatus};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
pub enum TicketStatusDb {
    Aberto,
    Pendente,
    Resolvido,
    Finalizado,
}

impl From<TicketStatusDb> for TicketStatus {
    fn from(db: TicketStatusDb) -> Self {
        match db {
            TicketStatusDb::Aberto => TicketStatus::Aberto,
            TicketStatusDb::Pendente => TicketStatus::Pendente,
            TicketStatusDb::Resolvido => TicketStatus::Resolvido,
            TicketStatusDb::Finalizado => TicketStatus::Finalizado,
        }
    }
}

impl From<TicketStatus> for TicketStatusDb {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::Aberto => TicketStatusDb::Aberto,
            TicketStatus::Pendente => TicketStatusDb::Pendente,
            TicketStatus::Resolvido => TicketStatusDb::Resolvido,
            TicketStatus::Finalizado => TicketStatusDb::Finalizado,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ticket_priority")]
pub enum TicketPriorityDb {
    #[sqlx(rename = "baixa")]
    Baixa,
    #[sqlx(rename = "média")]
    Media,
    #[sqlx(rename = "alta")]
    Alta,
}

impl From<TicketPriorityDb> for TicketPriority {
    fn from(db: TicketPriorityDb) -> Self {
        match db {
            TicketPriorityDb::Baixa => TicketPriority::Baixa,
            TicketPriorityDb::Media => TicketPriority::Media,
            TicketPriorityDb::Alta => TicketPriority::Alta,
        }
    }
}

impl From<TicketPriority> for TicketPriorityDb {
    fn from(priority: TicketPriority) -> Self {
        match priority {
            TicketPriority::Baixa => TicketPriorityDb::Baixa,
            TicketPriority::Media => TicketPriorityDb::Media,
            TicketPriority::Alta => TicketPriorityDb::Alta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ticket_origin", rename_all = "snake_case")]
pub enum TicketOriginDb {
    FormularioWeb,
    Email,
    Api,
    TelManual,
}

impl From<TicketOriginDb> for TicketOrigin {
    fn from(db: TicketOriginDb) -> Self {
        match db {
            TicketOriginDb::FormularioWeb => TicketOrigin::FormularioWeb,
            TicketOriginDb::Email => TicketOrigin::Email,
            TicketOriginDb::Api => TicketOrigin::Api,
            TicketOriginDb::TelManual => TicketOrigin::TelManual,
        }
    }
}

impl From<TicketOrigin> for TicketOriginDb {
    fn from(origin: TicketOrigin) -> Self {
        match origin {
            TicketOrigin::FormularioWeb => TicketOriginDb::FormularioWeb,
            TicketOrigin::Email => TicketOriginDb::Email,
            TicketOrigin::Api => TicketOriginDb::Api,
            TicketOrigin::TelManual => TicketOriginDb::TelManual,
        }
    }
}

/// Database row mapping for the tickets table.
#[derive(Debug, Clone, FromRow)]
pub struct TicketEntity {
    pub id: i64,
    pub title: String,
    pub client_name: String,
    pub description: String,
    pub whatsapp_number: Option<String>,
    pub status: TicketStatusDb,
    pub priority: TicketPriorityDb,
    pub origin: Option<TicketOriginDb>,
    pub user_id: Option<Uuid>,
    pub cliente_id: Option<Uuid>,
    pub resolution_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TicketEntity> for Ticket {
    fn from(entity: TicketEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            client_name: entity.client_name,
            description: entity.description,
            whatsapp_number: entity.whatsapp_number,
            status: entity.status.into(),
            priority: entity.priority.into(),
            origin: entity.origin.map(Into::into),
            user_id: entity.user_id,
            cliente_id: entity.cliente_id,
            resolution_time_minutes: entity.resolution_time_minutes,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_mapping_keeps_accented_variant() {
        let db: TicketPriorityDb = TicketPriority::Media.into();
        assert_eq!(db, TicketPriorityDb::Media);
        assert_eq!(TicketPriority::from(db), TicketPriority::Media);
    }

    #[test]
    fn test_entity_to_domain() {
        let now = Utc::now();
        let entity = TicketEntity {
            id: 12,
            title: "Printer".into(),
            client_name: "ACME".into(),
            description: "Paper jam".into(),
            whatsapp_number: Some("5511999990000".into()),
            status: TicketStatusDb::Pendente,
            priority: TicketPriorityDb::Baixa,
            origin: Some(TicketOriginDb::TelManual),
            user_id: None,
            cliente_id: Some(Uuid::new_v4()),
            resolution_time_minutes: None,
            created_at: now,
            updated_at: now,
        };
        let ticket: Ticket = entity.into();
        assert_eq!(ticket.id, 12);
        assert_eq!(ticket.status, TicketStatus::Pendente);
        assert_eq!(ticket.origin, Some(TicketOrigin::TelManual));
    }
}
