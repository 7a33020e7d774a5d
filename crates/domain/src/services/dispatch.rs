//! Recipient planning for notifications.
//!
//! Pure functions: given an event and the current admin list, decide who gets
//! a notification and in which capacity. Each user appears at most once.

use std::collections::HashSet;
use uuid::Uuid;

use crate::models::notification::{AssignedType, RecipientRole};
use crate::models::{Ticket, TicketMessage, UserSummary};
use crate::services::events::Assignment;

/// One planned notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipient<R> {
    pub user_id: Uuid,
    pub capacity: R,
}

struct Plan<R> {
    seen: HashSet<Uuid>,
    recipients: Vec<Recipient<R>>,
}

impl<R> Plan<R> {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            recipients: Vec::new(),
        }
    }

    fn contains(&self, user_id: Uuid) -> bool {
        self.seen.contains(&user_id)
    }

    fn add(&mut self, user_id: Uuid, capacity: R) {
        if self.seen.insert(user_id) {
            self.recipients.push(Recipient { user_id, capacity });
        }
    }

    fn finish(self) -> Vec<Recipient<R>> {
        self.recipients
    }
}

/// Recipients of a TicketAssigned event.
///
/// The new assignee is always told, even when it assigned itself. The client
/// is told when its link changed, unless it is the one acting. On creation
/// every admin other than the actor hears about the new ticket; with no
/// actor (system-created tickets) that is every admin.
pub fn plan_ticket_assigned(
    ticket: &Ticket,
    previous: Option<Assignment>,
    actor_id: Option<Uuid>,
    admin_ids: &[Uuid],
) -> Vec<Recipient<AssignedType>> {
    let mut plan = Plan::new();

    if let Some(user_id) = ticket.user_id {
        let changed = previous.map_or(true, |p| p.user_id != Some(user_id));
        if changed {
            plan.add(user_id, AssignedType::User);
        }
    }

    if let Some(cliente_id) = ticket.cliente_id {
        let changed = previous.map_or(true, |p| p.cliente_id != Some(cliente_id));
        if changed && Some(cliente_id) != actor_id {
            plan.add(cliente_id, AssignedType::Cliente);
        }
    }

    if previous.is_none() {
        for &admin_id in admin_ids {
            if Some(admin_id) != actor_id && !plan.contains(admin_id) {
                plan.add(admin_id, AssignedType::Admin);
            }
        }
    }

    plan.finish()
}

/// Recipients of a NewMessage event. Internal messages notify nobody.
pub fn plan_new_message(
    ticket: &Ticket,
    message: &TicketMessage,
    sender: &UserSummary,
    admin_ids: &[Uuid],
) -> Vec<Recipient<RecipientRole>> {
    let mut plan = Plan::new();
    if message.is_internal {
        return plan.finish();
    }

    if sender.role.is_staff() {
        if let Some(cliente_id) = ticket.cliente_id.filter(|id| *id != sender.id) {
            plan.add(cliente_id, RecipientRole::Cliente);
        }
    } else {
        if let Some(user_id) = ticket.user_id.filter(|id| *id != sender.id) {
            plan.add(user_id, RecipientRole::Atendente);
        }
        for &admin_id in admin_ids {
            if admin_id != sender.id {
                plan.add(admin_id, RecipientRole::Admin);
            }
        }
    }

    plan.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::tests::sample_ticket;
    use crate::models::Role;
    use chrono::Utc;

    fn summary(id: Uuid, role: Role) -> UserSummary {
        UserSummary {
            id,
            name: format!("{role}"),
            email: format!("{id}@example.com"),
            role,
        }
    }

    fn message(ticket: &Ticket, author: Uuid, is_internal: bool) -> TicketMessage {
        TicketMessage {
            id: 10,
            ticket_id: ticket.id,
            user_id: author,
            message: "hello".into(),
            is_internal,
            created_at: Utc::now(),
        }
    }

    fn ids<R>(recipients: &[Recipient<R>]) -> Vec<Uuid> {
        recipients.iter().map(|r| r.user_id).collect()
    }

    #[test]
    fn test_cliente_created_ticket_notifies_all_admins_only() {
        let alice = Uuid::new_v4();
        let admins = [Uuid::new_v4(), Uuid::new_v4()];
        let mut ticket = sample_ticket();
        ticket.cliente_id = Some(alice);

        let recipients = plan_ticket_assigned(&ticket, None, Some(alice), &admins);
        assert_eq!(ids(&recipients), admins.to_vec());
        assert!(recipients.iter().all(|r| r.capacity == AssignedType::Admin));
    }

    #[test]
    fn test_creation_by_admin_assigned_to_self() {
        let admin = Uuid::new_v4();
        let other_admin = Uuid::new_v4();
        let mut ticket = sample_ticket();
        ticket.user_id = Some(admin);

        let recipients = plan_ticket_assigned(&ticket, None, Some(admin), &[admin, other_admin]);
        assert_eq!(
            recipients,
            vec![
                Recipient { user_id: admin, capacity: AssignedType::User },
                Recipient { user_id: other_admin, capacity: AssignedType::Admin },
            ]
        );
    }

    #[test]
    fn test_creation_notifies_assignee_client_and_admins_once_each() {
        let bob = Uuid::new_v4();
        let carol_admin = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let mut ticket = sample_ticket();
        ticket.user_id = Some(carol_admin);
        ticket.cliente_id = Some(alice);

        let recipients = plan_ticket_assigned(&ticket, None, Some(bob), &[carol_admin, bob]);
        assert_eq!(
            recipients,
            vec![
                Recipient { user_id: carol_admin, capacity: AssignedType::User },
                Recipient { user_id: alice, capacity: AssignedType::Cliente },
            ]
        );
    }

    #[test]
    fn test_reassignment_notifies_only_changed_parties() {
        let bob = Uuid::new_v4();
        let carol = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let mut ticket = sample_ticket();
        ticket.user_id = Some(carol);
        ticket.cliente_id = Some(alice);
        let previous = Assignment {
            user_id: Some(bob),
            cliente_id: Some(alice),
        };

        let recipients = plan_ticket_assigned(&ticket, Some(previous), Some(admin), &[admin]);
        assert_eq!(ids(&recipients), vec![carol]);
    }

    #[test]
    fn test_system_created_ticket_notifies_every_admin() {
        let admins = [Uuid::new_v4(), Uuid::new_v4()];
        let mut ticket = sample_ticket();
        ticket.user_id = None;
        ticket.cliente_id = None;

        let recipients = plan_ticket_assigned(&ticket, None, None, &admins);
        assert_eq!(ids(&recipients), admins.to_vec());
        assert!(recipients.iter().all(|r| r.capacity == AssignedType::Admin));
    }

    #[test]
    fn test_unassignment_notifies_nobody() {
        let bob = Uuid::new_v4();
        let ticket = sample_ticket();
        let previous = Assignment {
            user_id: Some(bob),
            cliente_id: None,
        };
        assert!(plan_ticket_assigned(&ticket, Some(previous), Some(bob), &[]).is_empty());
    }

    #[test]
    fn test_staff_message_notifies_client_only() {
        let bob = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let mut ticket = sample_ticket();
        ticket.cliente_id = Some(alice);
        ticket.user_id = Some(bob);

        let sender = summary(bob, Role::Support);
        let recipients =
            plan_new_message(&ticket, &message(&ticket, bob, false), &sender, &[Uuid::new_v4()]);
        assert_eq!(
            recipients,
            vec![Recipient { user_id: alice, capacity: RecipientRole::Cliente }]
        );
    }

    #[test]
    fn test_internal_message_notifies_nobody() {
        let bob = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let mut ticket = sample_ticket();
        ticket.cliente_id = Some(alice);

        let sender = summary(bob, Role::Support);
        let admins = [Uuid::new_v4()];
        assert!(plan_new_message(&ticket, &message(&ticket, bob, true), &sender, &admins).is_empty());
    }

    #[test]
    fn test_client_message_notifies_assignee_and_admins() {
        let alice = Uuid::new_v4();
        let carol = Uuid::new_v4();
        let admin_a = Uuid::new_v4();
        let admin_b = Uuid::new_v4();
        let mut ticket = sample_ticket();
        ticket.cliente_id = Some(alice);
        ticket.user_id = Some(carol);

        let sender = summary(alice, Role::Cliente);
        let recipients = plan_new_message(
            &ticket,
            &message(&ticket, alice, false),
            &sender,
            &[admin_a, admin_b],
        );
        assert_eq!(
            recipients,
            vec![
                Recipient { user_id: carol, capacity: RecipientRole::Atendente },
                Recipient { user_id: admin_a, capacity: RecipientRole::Admin },
                Recipient { user_id: admin_b, capacity: RecipientRole::Admin },
            ]
        );
    }

    #[test]
    fn test_client_message_when_assignee_is_admin_is_deduplicated() {
        let alice = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let mut ticket = sample_ticket();
        ticket.cliente_id = Some(alice);
        ticket.user_id = Some(admin);

        let sender = summary(alice, Role::Cliente);
        let recipients =
            plan_new_message(&ticket, &message(&ticket, alice, false), &sender, &[admin]);
        assert_eq!(ids(&recipients), vec![admin]);
        assert_eq!(recipients[0].capacity, RecipientRole::Atendente);
    }

    #[test]
    fn test_client_message_always_reaches_an_admin() {
        let alice = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let mut ticket = sample_ticket();
        ticket.cliente_id = Some(alice);

        let sender = summary(alice, Role::Cliente);
        let recipients =
            plan_new_message(&ticket, &message(&ticket, alice, false), &sender, &[admin]);
        assert!(recipients.iter().any(|r| r.user_id == admin));
    }
}
