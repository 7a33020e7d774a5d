//! Ticket model and its request/response shapes.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use shared::pagination::PageRequest;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::user::UserSummary;

/// Ticket lifecycle states. Any state may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Aberto,
    Pendente,
    Resolvido,
    Finalizado,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Aberto => "aberto",
            TicketStatus::Pendente => "pendente",
            TicketStatus::Resolvido => "resolvido",
            TicketStatus::Finalizado => "finalizado",
        }
    }

    /// Resolved or finalized.
    pub fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Resolvido | TicketStatus::Finalizado)
    }

    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aberto" => Ok(TicketStatus::Aberto),
            "pendente" => Ok(TicketStatus::Pendente),
            "resolvido" => Ok(TicketStatus::Resolvido),
            "finalizado" => Ok(TicketStatus::Finalizado),
            _ => Err(format!("Unknown ticket status: {}", s)),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketPriority {
    #[serde(rename = "baixa")]
    Baixa,
    #[serde(rename = "média", alias = "media")]
    Media,
    #[serde(rename = "alta")]
    Alta,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Baixa => "baixa",
            TicketPriority::Media => "média",
            TicketPriority::Alta => "alta",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baixa" => Ok(TicketPriority::Baixa),
            "média" | "media" => Ok(TicketPriority::Media),
            "alta" => Ok(TicketPriority::Alta),
            _ => Err(format!("Unknown ticket priority: {}", s)),
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel a ticket arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketOrigin {
    FormularioWeb,
    Email,
    Api,
    TelManual,
}

impl TicketOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketOrigin::FormularioWeb => "formulario_web",
            TicketOrigin::Email => "email",
            TicketOrigin::Api => "api",
            TicketOrigin::TelManual => "tel_manual",
        }
    }
}

impl FromStr for TicketOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "formulario_web" => Ok(TicketOrigin::FormularioWeb),
            "email" => Ok(TicketOrigin::Email),
            "api" => Ok(TicketOrigin::Api),
            "tel_manual" => Ok(TicketOrigin::TelManual),
            _ => Err(format!("Unknown ticket origin: {}", s)),
        }
    }
}

impl fmt::Display for TicketOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A support ticket.
///
/// `resolution_time_minutes` is the single stored resolution value; the
/// resolution timestamp is always derived from it (see [`Ticket::resolved_at`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub client_name: String,
    pub description: String,
    pub whatsapp_number: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub origin: Option<TicketOrigin>,
    /// Assigned staff member.
    pub user_id: Option<Uuid>,
    /// Owning client account.
    pub cliente_id: Option<Uuid>,
    pub resolution_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolution_time_minutes
            .map(|minutes| self.created_at + Duration::minutes(i64::from(minutes)))
    }
}

/// Ticket fields ready to be inserted. Produced by the lifecycle rules.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub title: String,
    pub client_name: String,
    pub description: String,
    pub whatsapp_number: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub origin: Option<TicketOrigin>,
    pub user_id: Option<Uuid>,
    pub cliente_id: Option<Uuid>,
    pub resolution_time_minutes: Option<i32>,
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    TicketStatus::from_str(value)
        .map(|_| ())
        .map_err(|_| {
            invalid(
                "invalid_status",
                "Status must be one of aberto, pendente, resolvido, finalizado",
            )
        })
}

fn validate_priority(value: &str) -> Result<(), ValidationError> {
    TicketPriority::from_str(value)
        .map(|_| ())
        .map_err(|_| {
            invalid(
                "invalid_priority",
                "Priority must be one of baixa, média, alta",
            )
        })
}

fn validate_origin(value: &str) -> Result<(), ValidationError> {
    TicketOrigin::from_str(value)
        .map(|_| ())
        .map_err(|_| {
            invalid(
                "invalid_origin",
                "Origin must be one of formulario_web, email, api, tel_manual",
            )
        })
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Request body for `POST /tickets`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(
        length(min = 1, max = 250, message = "Title must be 1-250 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub title: String,

    #[serde(alias = "nome_cliente")]
    #[validate(
        length(min = 1, max = 100, message = "Client name must be 1-100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub client_name: String,

    #[serde(alias = "descricao")]
    #[validate(
        length(min = 1, message = "Description is required"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub description: String,

    #[serde(default, alias = "whatsapp_numero")]
    #[validate(length(max = 20, message = "WhatsApp number must be at most 20 characters"))]
    pub whatsapp_number: Option<String>,

    #[validate(custom(function = "validate_status"))]
    pub status: String,

    #[validate(custom(function = "validate_priority"))]
    pub priority: String,

    #[serde(default, alias = "origem")]
    #[validate(custom(function = "validate_origin"))]
    pub origin: Option<String>,

    #[serde(default)]
    pub user_id: Option<Uuid>,

    /// Ignored when a cliente creates the ticket.
    #[serde(default)]
    pub cliente_id: Option<Uuid>,

    #[serde(default, alias = "tempo_resolucao")]
    #[validate(custom(function = "shared::validation::validate_non_negative_minutes"))]
    pub resolution_time_minutes: Option<i32>,
}

/// Request body for `PUT /tickets/{id}`. Absent fields are left unchanged;
/// `user_id`/`cliente_id` accept an explicit `null` to clear the reference.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTicketRequest {
    #[validate(
        length(min = 1, max = 250, message = "Title must be 1-250 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub title: Option<String>,

    #[serde(default, alias = "nome_cliente")]
    #[validate(
        length(min = 1, max = 100, message = "Client name must be 1-100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub client_name: Option<String>,

    #[serde(default, alias = "descricao")]
    #[validate(
        length(min = 1, message = "Description must not be empty"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub description: Option<String>,

    #[serde(default, alias = "whatsapp_numero")]
    #[validate(length(max = 20, message = "WhatsApp number must be at most 20 characters"))]
    pub whatsapp_number: Option<String>,

    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,

    #[validate(custom(function = "validate_priority"))]
    pub priority: Option<String>,

    #[serde(default, alias = "origem")]
    #[validate(custom(function = "validate_origin"))]
    pub origin: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub user_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub cliente_id: Option<Option<Uuid>>,

    #[serde(default, alias = "tempo_resolucao")]
    #[validate(custom(function = "shared::validation::validate_non_negative_minutes"))]
    pub resolution_time_minutes: Option<i32>,
}

/// Distinguishes a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query parameters for `GET /tickets`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketQuery {
    pub q: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub user_id: Option<Uuid>,
    pub cliente_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl TicketQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// The date range only applies when both ends are present.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => None,
        }
    }
}

/// Ticket as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct TicketResponse {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub resolved_at: Option<DateTime<Utc>>,
    pub user: Option<UserSummary>,
    pub cliente: Option<UserSummary>,
}

impl TicketResponse {
    pub fn new(ticket: Ticket, user: Option<UserSummary>, cliente: Option<UserSummary>) -> Self {
        Self {
            resolved_at: ticket.resolved_at(),
            ticket,
            user,
            cliente,
        }
    }
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self::new(ticket, None, None)
    }
}
