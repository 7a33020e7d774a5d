//! In-app notifications and their payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ticket::{Ticket, TicketPriority, TicketStatus};
use super::user::{Role, UserSummary};
use super::message::TicketMessage;

/// Characters of the message body copied into a notification.
pub const MESSAGE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TicketAssigned,
    NewMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TicketAssigned => "ticket_assigned",
            NotificationKind::NewMessage => "new_message",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ticket_assigned" => Ok(NotificationKind::TicketAssigned),
            "new_message" => Ok(NotificationKind::NewMessage),
            _ => Err(format!("Unknown notification kind: {}", s)),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted notification for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub data: JsonValue,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// A notification row about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub data: JsonValue,
}

/// Why a user receives a TicketAssigned notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignedType {
    /// The assigned staff member.
    User,
    /// The owning client.
    Cliente,
    /// An admin learning of a new ticket.
    Admin,
}

/// Recipient perspective for a NewMessage notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    Cliente,
    Atendente,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAssignedData {
    pub ticket_id: i64,
    pub ticket_title: String,
    pub ticket_status: TicketStatus,
    pub ticket_priority: TicketPriority,
    pub assigned_type: AssignedType,
    pub message: String,
}

impl TicketAssignedData {
    pub fn new(ticket: &Ticket, assigned_type: AssignedType) -> Self {
        let message = match assigned_type {
            AssignedType::User => format!("Ticket #{} was assigned to you", ticket.id),
            AssignedType::Cliente => format!("Ticket #{} was linked to your account", ticket.id),
            AssignedType::Admin => format!("New ticket #{} was created", ticket.id),
        };
        Self {
            ticket_id: ticket.id,
            ticket_title: ticket.title.clone(),
            ticket_status: ticket.status,
            ticket_priority: ticket.priority,
            assigned_type,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessageData {
    pub ticket_id: i64,
    pub ticket_title: String,
    pub ticket_status: TicketStatus,
    pub ticket_priority: TicketPriority,
    pub message_id: i64,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_email: String,
    pub sender_role: Role,
    pub message_preview: String,
    pub recipient_role: RecipientRole,
    pub has_attachments: bool,
    pub message: String,
}

impl NewMessageData {
    pub fn new(
        ticket: &Ticket,
        message: &TicketMessage,
        sender: &UserSummary,
        recipient_role: RecipientRole,
        has_attachments: bool,
    ) -> Self {
        Self {
            ticket_id: ticket.id,
            ticket_title: ticket.title.clone(),
            ticket_status: ticket.status,
            ticket_priority: ticket.priority,
            message_id: message.id,
            sender_id: sender.id,
            sender_name: sender.name.clone(),
            sender_email: sender.email.clone(),
            sender_role: sender.role,
            message_preview: preview(&message.message),
            recipient_role,
            has_attachments,
            message: format!("New message from {} on ticket #{}", sender.name, ticket.id),
        }
    }
}

/// First [`MESSAGE_PREVIEW_CHARS`] characters of a message body.
pub fn preview(text: &str) -> String {
    text.chars().take(MESSAGE_PREVIEW_CHARS).collect()
}

/// Response body for `GET /notifications/count`.
#[derive(Debug, Clone, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}
