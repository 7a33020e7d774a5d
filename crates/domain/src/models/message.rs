//! Ticket conversation messages (internal channel) and WhatsApp channel messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::attachment::Attachment;
use super::user::UserSummary;
use crate::errors::{DomainError, FieldError};

/// A message posted on a ticket by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub id: i64,
    pub ticket_id: i64,
    pub user_id: Uuid,
    pub message: String,
    /// Staff-only. Never shown to or notified to the client.
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// JSON body for `POST /tickets/{id}/messages-internal`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicketMessageRequest {
    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub message: String,

    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketMessageResponse {
    #[serde(flatten)]
    pub message: TicketMessage,
    pub author: Option<UserSummary>,
    pub attachments: Vec<Attachment>,
}

/// Direction of a WhatsApp channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhatsappMessageKind {
    /// Inbound from the customer.
    Recebido,
    /// Outbound from staff.
    Enviado,
    Sistema,
}

impl WhatsappMessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhatsappMessageKind::Recebido => "recebido",
            WhatsappMessageKind::Enviado => "enviado",
            WhatsappMessageKind::Sistema => "sistema",
        }
    }
}

impl FromStr for WhatsappMessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recebido" => Ok(WhatsappMessageKind::Recebido),
            "enviado" => Ok(WhatsappMessageKind::Enviado),
            "sistema" => Ok(WhatsappMessageKind::Sistema),
            _ => Err(format!("Unknown message kind: {}", s)),
        }
    }
}

impl fmt::Display for WhatsappMessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatsappMessage {
    pub id: i64,
    pub ticket_id: i64,
    pub body: String,
    pub kind: WhatsappMessageKind,
    pub created_at: DateTime<Utc>,
}

/// JSON body for `POST /tickets/{id}/messages`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendWhatsappMessageRequest {
    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    pub message: String,
}

/// Inbound webhook payload from the WhatsApp gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhatsappWebhookPayload {
    pub from: Option<String>,
    pub text: Option<String>,
}

/// A webhook payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundWhatsapp {
    pub from: String,
    pub text: String,
}

/// Longest title derived from an inbound message.
pub const INBOUND_TITLE_MAX_CHARS: usize = 80;

impl WhatsappWebhookPayload {
    /// Both fields must be present and non-blank; the sender number is normalized.
    pub fn into_inbound(self) -> Result<InboundWhatsapp, DomainError> {
        let from = self
            .from
            .map(|f| shared::validation::normalize_phone_number(&f))
            .unwrap_or_default();
        let text = self.text.map(|t| t.trim().to_string()).unwrap_or_default();

        let mut errors = Vec::new();
        if from.is_empty() {
            errors.push(FieldError::new("from", "Sender number is required"));
        } else if shared::validation::validate_phone_number(&from).is_err() {
            errors.push(FieldError::new("from", "Invalid phone number"));
        }
        if text.is_empty() {
            errors.push(FieldError::new("text", "Message text is required"));
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }
        Ok(InboundWhatsapp { from, text })
    }
}

impl InboundWhatsapp {
    /// Ticket title for a conversation that opens a new ticket.
    pub fn derived_title(&self) -> String {
        let mut title: String = self.text.chars().take(INBOUND_TITLE_MAX_CHARS).collect();
        if self.text.chars().count() > INBOUND_TITLE_MAX_CHARS {
            title.push_str("...");
        }
        title
    }
}
