//! Domain events emitted by ticket and message operations.
//!
//! Producers describe what happened; consumers (the notification dispatcher)
//! decide who needs to hear about it.

use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{Ticket, TicketMessage, UserSummary};

/// Assignment references of a ticket at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Assignment {
    pub user_id: Option<Uuid>,
    pub cliente_id: Option<Uuid>,
}

impl Assignment {
    pub fn of(ticket: &Ticket) -> Self {
        Self {
            user_id: ticket.user_id,
            cliente_id: ticket.cliente_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A ticket was created (`previous = None`) or its assignment changed.
    TicketAssigned {
        ticket: Ticket,
        previous: Option<Assignment>,
        /// `None` when the system acted, e.g. an inbound webhook.
        actor_id: Option<Uuid>,
    },
    /// A message was posted on a ticket.
    NewMessage {
        ticket: Ticket,
        message: TicketMessage,
        sender: UserSummary,
        has_attachments: bool,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TicketAssigned { .. } => "ticket_assigned",
            DomainEvent::NewMessage { .. } => "new_message",
        }
    }

    pub fn ticket_id(&self) -> i64 {
        match self {
            DomainEvent::TicketAssigned { ticket, .. } => ticket.id,
            DomainEvent::NewMessage { ticket, .. } => ticket.id,
        }
    }
}

/// Consumer of domain events.
///
/// `publish` completes once every synchronous effect (persisted notifications)
/// is done; slow side channels such as email must not be awaited here.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, event: DomainEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::tests::sample_ticket;

    #[tokio::test]
    async fn test_recording_sink_keeps_order() {
        let sink = RecordingEventSink::new();
        let ticket = sample_ticket();
        let actor = Uuid::new_v4();

        sink.publish(DomainEvent::TicketAssigned {
            ticket: ticket.clone(),
            previous: None,
            actor_id: Some(actor),
        })
        .await;
        sink.publish(DomainEvent::TicketAssigned {
            ticket,
            previous: Some(Assignment::default()),
            actor_id: Some(actor),
        })
        .await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            DomainEvent::TicketAssigned { previous: None, .. }
        ));
        assert_eq!(events[1].name(), "ticket_assigned");
        assert_eq!(events[1].ticket_id(), 1);
    }

    #[test]
    fn test_assignment_of_ticket() {
        let mut ticket = sample_ticket();
        let id = Uuid::new_v4();
        ticket.user_id = Some(id);
        assert_eq!(
            Assignment::of(&ticket),
            Assignment {
                user_id: Some(id),
                cliente_id: None
            }
        );
    }
}
