//! Ticket lifecycle rules.
//!
//! These functions turn a request plus the acting user into the exact row to
//! store, and report which side effects (events, activity entries) follow.
//! Persistence happens in the caller.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::str::FromStr;
use validator::Validate;

use crate::errors::{AccessDenied, DomainError};
use crate::models::ticket::{CreateTicketRequest, NewTicket, UpdateTicketRequest};
use crate::models::{CurrentUser, Role, Ticket, TicketOrigin, TicketPriority, TicketStatus};
use crate::services::access;
use crate::services::events::{Assignment, DomainEvent};

/// Whole minutes elapsed between creation and `now`, never negative.
pub fn resolution_minutes(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    let minutes = (now - created_at).num_minutes().max(0);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

fn parse<T: FromStr<Err = String>>(field: &str, value: &str) -> Result<T, DomainError> {
    T::from_str(value).map_err(|e| DomainError::invalid(field, e))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates a create request and applies the assignment defaults.
///
/// A cliente always owns the ticket it creates and cannot pick an assignee.
/// Staff without an explicit assignee take the ticket themselves.
pub fn prepare_create(
    request: CreateTicketRequest,
    actor: &CurrentUser,
) -> Result<NewTicket, DomainError> {
    request.validate()?;

    let status: TicketStatus = parse("status", &request.status)?;
    let priority: TicketPriority = parse("priority", &request.priority)?;
    let origin = match blank_to_none(request.origin) {
        Some(value) => Some(parse::<TicketOrigin>("origin", &value)?),
        None => None,
    };

    let (user_id, cliente_id) = match actor.role {
        Role::Cliente => (None, Some(actor.id)),
        _ => (request.user_id.or(Some(actor.id)), request.cliente_id),
    };

    // Created already closed: nothing has elapsed yet.
    let resolution_time_minutes = match request.resolution_time_minutes {
        Some(minutes) => Some(minutes),
        None if status.is_closed() => Some(0),
        None => None,
    };

    Ok(NewTicket {
        title: request.title.trim().to_string(),
        client_name: request.client_name.trim().to_string(),
        description: request.description,
        whatsapp_number: blank_to_none(request.whatsapp_number),
        status,
        priority,
        origin,
        user_id,
        cliente_id,
        resolution_time_minutes,
    })
}

/// Event announcing a freshly stored ticket. `actor` is `None` for tickets
/// opened by the system.
pub fn created_event(ticket: Ticket, actor: Option<&CurrentUser>) -> DomainEvent {
    DomainEvent::TicketAssigned {
        ticket,
        previous: None,
        actor_id: actor.map(|a| a.id),
    }
}

/// Outcome of applying an update request to a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketUpdatePlan {
    /// The ticket as it should be stored.
    pub ticket: Ticket,
    /// Changed fields with their old and new values.
    pub changes: BTreeMap<&'static str, (JsonValue, JsonValue)>,
    pub status_change: Option<(TicketStatus, TicketStatus)>,
    /// Assignment before the update, present only when it changed.
    pub previous_assignment: Option<Assignment>,
}

impl TicketUpdatePlan {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn old_values(&self) -> JsonValue {
        self.side(|(old, _)| old)
    }

    pub fn new_values(&self) -> JsonValue {
        self.side(|(_, new)| new)
    }

    fn side(&self, pick: impl Fn(&(JsonValue, JsonValue)) -> &JsonValue) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .changes
            .iter()
            .map(|(field, pair)| (field.to_string(), pick(pair).clone()))
            .collect();
        JsonValue::Object(map)
    }

    pub fn assignee_changed(&self) -> bool {
        self.previous_assignment
            .map(|prev| prev.user_id != self.ticket.user_id)
            .unwrap_or(false)
    }

    /// Event for the stored ticket, emitted only when user_id or cliente_id changed.
    pub fn assignment_event(&self, stored: Ticket, actor: &CurrentUser) -> Option<DomainEvent> {
        self.previous_assignment
            .map(|previous| DomainEvent::TicketAssigned {
                ticket: stored,
                previous: Some(previous),
                actor_id: Some(actor.id),
            })
    }
}

fn record<T: serde::Serialize + PartialEq>(
    changes: &mut BTreeMap<&'static str, (JsonValue, JsonValue)>,
    field: &'static str,
    old: &T,
    new: &T,
) {
    if old != new {
        changes.insert(field, (json!(old), json!(new)));
    }
}

/// Applies an update request on top of the freshly loaded ticket.
///
/// Entering resolvido/finalizado from an open state fills
/// `resolution_time_minutes` once when neither the ticket nor the request
/// carries a value. A manual value in the request always wins.
pub fn prepare_update(
    current: &Ticket,
    request: UpdateTicketRequest,
    actor: &CurrentUser,
    now: DateTime<Utc>,
) -> Result<TicketUpdatePlan, DomainError> {
    access::ensure_can_edit_ticket(actor, current)?;
    request.validate()?;

    let mut next = current.clone();
    if let Some(title) = request.title {
        next.title = title.trim().to_string();
    }
    if let Some(client_name) = request.client_name {
        next.client_name = client_name.trim().to_string();
    }
    if let Some(description) = request.description {
        next.description = description;
    }
    if request.whatsapp_number.is_some() {
        next.whatsapp_number = blank_to_none(request.whatsapp_number);
    }
    if let Some(status) = request.status {
        next.status = parse("status", &status)?;
    }
    if let Some(priority) = request.priority {
        next.priority = parse("priority", &priority)?;
    }
    if let Some(origin) = request.origin {
        next.origin = Some(parse("origin", &origin)?);
    }
    if let Some(user_id) = request.user_id {
        next.user_id = user_id;
    }
    if let Some(cliente_id) = request.cliente_id {
        next.cliente_id = cliente_id;
    }

    match request.resolution_time_minutes {
        Some(minutes) => next.resolution_time_minutes = Some(minutes),
        None => {
            let entering_closed = current.status.is_open() && next.status.is_closed();
            if entering_closed && current.resolution_time_minutes.is_none() {
                next.resolution_time_minutes = Some(resolution_minutes(current.created_at, now));
            }
        }
    }

    let mut changes = BTreeMap::new();
    record(&mut changes, "title", &current.title, &next.title);
    record(&mut changes, "client_name", &current.client_name, &next.client_name);
    record(&mut changes, "description", &current.description, &next.description);
    record(&mut changes, "whatsapp_number", &current.whatsapp_number, &next.whatsapp_number);
    record(&mut changes, "status", &current.status, &next.status);
    record(&mut changes, "priority", &current.priority, &next.priority);
    record(&mut changes, "origin", &current.origin, &next.origin);
    record(&mut changes, "user_id", &current.user_id, &next.user_id);
    record(&mut changes, "cliente_id", &current.cliente_id, &next.cliente_id);
    record(
        &mut changes,
        "resolution_time_minutes",
        &current.resolution_time_minutes,
        &next.resolution_time_minutes,
    );

    let status_change = (current.status != next.status).then_some((current.status, next.status));
    let previous = Assignment::of(current);
    let previous_assignment = (previous != Assignment::of(&next)).then_some(previous);

    if !changes.is_empty() {
        next.updated_at = now;
    }

    Ok(TicketUpdatePlan {
        ticket: next,
        changes,
        status_change,
        previous_assignment,
    })
}

/// Delete gate. The storage layer cascades messages and attachment rows.
pub fn ensure_deletable(current: &Ticket, actor: &CurrentUser) -> Result<(), AccessDenied> {
    access::ensure_can_delete_ticket(actor, current)
}
