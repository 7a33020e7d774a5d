//! Activity log entry construction.

use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::models::activity_log::model_type;
use crate::models::{ActivityAction, NewActivityLog, Ticket};
use crate::services::lifecycle::TicketUpdatePlan;

/// Builder for activity log entries with a fluent API.
#[derive(Debug, Clone)]
pub struct ActivityLogBuilder {
    user_id: Option<Uuid>,
    action: ActivityAction,
    model_type: String,
    model_id: Option<String>,
    old_values: Option<JsonValue>,
    new_values: Option<JsonValue>,
    description: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    metadata: Option<JsonValue>,
}

impl ActivityLogBuilder {
    /// Entry for something a logged-in user did.
    pub fn user_action(user_id: Uuid, action: ActivityAction) -> Self {
        Self::new(Some(user_id), action)
    }

    /// Entry with no acting user (webhook ingress, background work).
    pub fn system_action(action: ActivityAction) -> Self {
        Self::new(None, action)
    }

    fn new(user_id: Option<Uuid>, action: ActivityAction) -> Self {
        Self {
            user_id,
            action,
            model_type: String::new(),
            model_id: None,
            old_values: None,
            new_values: None,
            description: None,
            ip_address: None,
            user_agent: None,
            metadata: None,
        }
    }

    pub fn on_model(mut self, model_type: impl Into<String>, model_id: impl ToString) -> Self {
        self.model_type = model_type.into();
        self.model_id = Some(model_id.to_string());
        self
    }

    pub fn with_old_values(mut self, values: JsonValue) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn with_new_values(mut self, values: JsonValue) -> Self {
        self.new_values = Some(values);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn build(self) -> NewActivityLog {
        NewActivityLog {
            user_id: self.user_id,
            action: self.action,
            model_type: self.model_type,
            model_id: self.model_id,
            old_values: self.old_values,
            new_values: self.new_values,
            description: self.description,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            metadata: self.metadata,
        }
    }
}

fn ticket_snapshot(ticket: &Ticket) -> JsonValue {
    json!({
        "title": ticket.title,
        "status": ticket.status,
        "priority": ticket.priority,
        "user_id": ticket.user_id,
        "cliente_id": ticket.cliente_id,
    })
}

/// Entries recorded when a ticket is created.
pub fn ticket_created(ticket: &Ticket, actor_id: Option<Uuid>) -> Vec<ActivityLogBuilder> {
    let base = |action| match actor_id {
        Some(id) => ActivityLogBuilder::user_action(id, action),
        None => ActivityLogBuilder::system_action(action),
    };

    let mut entries = vec![base(ActivityAction::Created)
        .on_model(model_type::TICKET, ticket.id)
        .with_new_values(ticket_snapshot(ticket))
        .with_description(format!("Ticket #{} created", ticket.id))];

    if let Some(assignee) = ticket.user_id {
        entries.push(
            base(ActivityAction::Assigned)
                .on_model(model_type::TICKET, ticket.id)
                .with_new_values(json!({ "user_id": assignee }))
                .with_description(format!("Ticket #{} assigned", ticket.id)),
        );
    }
    entries
}

/// Entries recorded for a ticket update. Empty when nothing changed.
pub fn ticket_updated(plan: &TicketUpdatePlan, actor_id: Uuid) -> Vec<ActivityLogBuilder> {
    if !plan.has_changes() {
        return Vec::new();
    }
    let id = plan.ticket.id;
    let mut entries = vec![ActivityLogBuilder::user_action(actor_id, ActivityAction::Updated)
        .on_model(model_type::TICKET, id)
        .with_old_values(plan.old_values())
        .with_new_values(plan.new_values())
        .with_description(format!("Ticket #{} updated", id))];

    if let Some((old, new)) = plan.status_change {
        entries.push(
            ActivityLogBuilder::user_action(actor_id, ActivityAction::StatusChanged)
                .on_model(model_type::TICKET, id)
                .with_old_values(json!({ "status": old }))
                .with_new_values(json!({ "status": new }))
                .with_description(format!("Ticket #{} status changed from {} to {}", id, old, new)),
        );
    }

    if plan.assignee_changed() {
        let old = plan.previous_assignment.and_then(|a| a.user_id);
        entries.push(
            ActivityLogBuilder::user_action(actor_id, ActivityAction::Assigned)
                .on_model(model_type::TICKET, id)
                .with_old_values(json!({ "user_id": old }))
                .with_new_values(json!({ "user_id": plan.ticket.user_id }))
                .with_description(format!("Ticket #{} reassigned", id)),
        );
    }
    entries
}

pub fn ticket_deleted(ticket: &Ticket, actor_id: Uuid) -> ActivityLogBuilder {
    ActivityLogBuilder::user_action(actor_id, ActivityAction::Deleted)
        .on_model(model_type::TICKET, ticket.id)
        .with_old_values(ticket_snapshot(ticket))
        .with_description(format!("Ticket #{} deleted", ticket.id))
}
