//! Notification dispatcher.
//!
//! Turns domain events into persisted notifications (one per planned
//! recipient, written before the triggering request returns) and mirrors each
//! one by email from a spawned task.

use async_trait::async_trait;
use domain::models::{
    NewMessageData, NewNotification, Notification, NotificationKind, TicketAssignedData, User,
};
use domain::services::{dispatch, DomainEvent, EventSink};
use persistence::repositories::{NotificationRepository, UserRepository};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::future::Future;
use uuid::Uuid;

use crate::middleware::metrics::{record_notification_created, record_notification_email_failed};
use crate::services::email::EmailService;

/// What an email mirror needs once the row is stored.
enum EmailPayload {
    Assigned(TicketAssignedData),
    Message(NewMessageData),
}

impl EmailPayload {
    fn kind(&self) -> NotificationKind {
        match self {
            EmailPayload::Assigned(_) => NotificationKind::TicketAssigned,
            EmailPayload::Message(_) => NotificationKind::NewMessage,
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifications: NotificationRepository,
    users: UserRepository,
    email: EmailService,
}

impl NotificationDispatcher {
    pub fn new(pool: PgPool, email: EmailService) -> Self {
        Self {
            notifications: NotificationRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            email,
        }
    }

    /// Persists one notification per recipient and schedules the emails.
    pub async fn dispatch(&self, event: DomainEvent) -> Result<Vec<Notification>, sqlx::Error> {
        let admin_ids = self.users.admin_ids().await?;

        let planned: Vec<(Uuid, EmailPayload)> = match &event {
            DomainEvent::TicketAssigned {
                ticket,
                previous,
                actor_id,
            } => dispatch::plan_ticket_assigned(ticket, *previous, *actor_id, &admin_ids)
                .into_iter()
                .map(|r| {
                    let data = TicketAssignedData::new(ticket, r.capacity);
                    (r.user_id, EmailPayload::Assigned(data))
                })
                .collect(),
            DomainEvent::NewMessage {
                ticket,
                message,
                sender,
                has_attachments,
            } => dispatch::plan_new_message(ticket, message, sender, &admin_ids)
                .into_iter()
                .map(|r| {
                    let data =
                        NewMessageData::new(ticket, message, sender, r.capacity, *has_attachments);
                    (r.user_id, EmailPayload::Message(data))
                })
                .collect(),
        };

        if planned.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = planned.iter().map(|(id, _)| *id).collect();
        let recipients: HashMap<Uuid, User> = self
            .users
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|entity| {
                let user: User = entity.into();
                (user.id, user)
            })
            .collect();

        let mut pending = Vec::with_capacity(planned.len());
        for (user_id, payload) in planned {
            let Some(recipient) = recipients.get(&user_id) else {
                tracing::warn!(user_id = %user_id, event = event.name(), "Notification recipient no longer exists");
                continue;
            };
            let data = match &payload {
                EmailPayload::Assigned(data) => to_json(data),
                EmailPayload::Message(data) => to_json(data),
            };
            let row = NewNotification {
                user_id,
                kind: payload.kind(),
                data,
            };
            pending.push((row, recipient.clone(), payload));
        }

        let stored = store_each(pending, |(row, _, _)| {
            let notifications = self.notifications.clone();
            let row = row.clone();
            async move { notifications.create(&row).await }
        })
        .await;

        let mut created = Vec::with_capacity(stored.len());
        for ((row, recipient, payload), entity) in stored {
            record_notification_created(row.kind.as_str());
            match Notification::try_from(entity) {
                Ok(notification) => created.push(notification),
                Err(e) => tracing::error!(error = %e, "Stored notification could not be read back"),
            }
            self.spawn_email(recipient, payload);
        }

        tracing::info!(
            event = event.name(),
            ticket_id = event.ticket_id(),
            notified = created.len(),
            "Notifications dispatched"
        );
        Ok(created)
    }

    /// One attempt, no retries. Failure only counts and logs.
    fn spawn_email(&self, recipient: User, payload: EmailPayload) {
        let email = self.email.clone();
        tokio::spawn(async move {
            let kind = payload.kind();
            let result = match &payload {
                EmailPayload::Assigned(data) => {
                    email
                        .send_ticket_assigned_email(&recipient.email, Some(&recipient.name), data)
                        .await
                }
                EmailPayload::Message(data) => {
                    email
                        .send_new_message_email(&recipient.email, Some(&recipient.name), data)
                        .await
                }
            };
            if let Err(e) = result {
                record_notification_email_failed(kind.as_str());
                tracing::warn!(
                    user_id = %recipient.id,
                    kind = kind.as_str(),
                    error = %e,
                    "Failed to send notification email"
                );
            }
        });
    }
}

/// Runs `store` once per item. A failed insert is logged and skips only
/// that item; the rest of the fan-out continues.
async fn store_each<T, O, F, Fut>(items: Vec<T>, mut store: F) -> Vec<(T, O)>
where
    F: FnMut(&T) -> Fut,
    Fut: Future<Output = Result<O, sqlx::Error>>,
{
    let mut stored = Vec::with_capacity(items.len());
    for item in items {
        match store(&item).await {
            Ok(output) => stored.push((item, output)),
            Err(e) => tracing::error!(error = %e, "Failed to store notification, skipping recipient"),
        }
    }
    stored
}

fn to_json<T: Serialize>(data: &T) -> serde_json::Value {
    serde_json::to_value(data).unwrap_or(serde_json::Value::Null)
}

#[async_trait]
impl EventSink for NotificationDispatcher {
    async fn publish(&self, event: DomainEvent) {
        let name = event.name();
        let ticket_id = event.ticket_id();
        if let Err(e) = self.dispatch(event).await {
            tracing::error!(event = name, ticket_id, error = %e, "Failed to dispatch notifications");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_each_skips_failed_items_and_keeps_going() {
        let stored = store_each(vec![1, 2, 3, 4], |n| {
            let n = *n;
            async move {
                if n == 2 {
                    Err(sqlx::Error::RowNotFound)
                } else {
                    Ok(n * 10)
                }
            }
        })
        .await;

        assert_eq!(stored, vec![(1, 10), (3, 30), (4, 40)]);
    }

    #[tokio::test]
    async fn test_store_each_all_failing_yields_nothing() {
        let stored: Vec<(u8, u8)> =
            store_each(vec![1, 2], |_| async { Err(sqlx::Error::PoolTimedOut) }).await;
        assert!(stored.is_empty());
    }
}
