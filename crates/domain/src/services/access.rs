//! Access control evaluator.
//!
//! Every predicate is a pure function of the caller and the current ticket
//! state. Callers fetch the ticket fresh for each request before asking.

use crate::errors::AccessDenied;
use crate::models::{CurrentUser, Role, Ticket};

/// Admin and support see everything; a cliente sees tickets it owns; an
/// assistant sees tickets assigned to it.
pub fn can_view_ticket(user: &CurrentUser, ticket: &Ticket) -> bool {
    match user.role {
        Role::Admin | Role::Support => true,
        Role::Cliente => ticket.cliente_id == Some(user.id),
        Role::Assistant => ticket.user_id == Some(user.id),
    }
}

pub fn can_view_all_tickets(user: &CurrentUser) -> bool {
    matches!(user.role, Role::Admin | Role::Support)
}

pub fn can_edit_ticket(user: &CurrentUser, ticket: &Ticket) -> bool {
    user.role != Role::Cliente && can_view_ticket(user, ticket)
}

pub fn can_delete_ticket(user: &CurrentUser, ticket: &Ticket) -> bool {
    matches!(user.role, Role::Admin | Role::Support) || ticket.user_id == Some(user.id)
}

pub fn can_manage_users(user: &CurrentUser) -> bool {
    user.role == Role::Admin
}

pub fn can_send_internal_message(user: &CurrentUser) -> bool {
    user.role != Role::Cliente
}

/// Attachments can be removed by anyone who sees the ticket, except clients.
pub fn can_delete_attachment(user: &CurrentUser, ticket: &Ticket) -> bool {
    user.role != Role::Cliente && can_view_ticket(user, ticket)
}

/// A message can be removed by its author or by admin/support.
pub fn can_delete_message(user: &CurrentUser, author_id: uuid::Uuid) -> bool {
    matches!(user.role, Role::Admin | Role::Support) || author_id == user.id
}

fn check(allowed: bool, reason: &str) -> Result<(), AccessDenied> {
    if allowed {
        Ok(())
    } else {
        Err(AccessDenied::new(reason))
    }
}

pub fn ensure_can_view_ticket(user: &CurrentUser, ticket: &Ticket) -> Result<(), AccessDenied> {
    check(
        can_view_ticket(user, ticket),
        "You do not have permission to view this ticket",
    )
}

pub fn ensure_can_edit_ticket(user: &CurrentUser, ticket: &Ticket) -> Result<(), AccessDenied> {
    check(
        can_edit_ticket(user, ticket),
        "You do not have permission to edit this ticket",
    )
}

pub fn ensure_can_delete_ticket(user: &CurrentUser, ticket: &Ticket) -> Result<(), AccessDenied> {
    check(
        can_delete_ticket(user, ticket),
        "You do not have permission to delete this ticket",
    )
}

pub fn ensure_can_manage_users(user: &CurrentUser) -> Result<(), AccessDenied> {
    check(can_manage_users(user), "Only administrators can manage users")
}

pub fn ensure_can_send_internal_message(user: &CurrentUser) -> Result<(), AccessDenied> {
    check(
        can_send_internal_message(user),
        "Clients cannot send internal messages",
    )
}

pub fn ensure_can_delete_attachment(
    user: &CurrentUser,
    ticket: &Ticket,
) -> Result<(), AccessDenied> {
    check(
        can_delete_attachment(user, ticket),
        "You do not have permission to delete this attachment",
    )
}

pub fn ensure_can_delete_message(
    user: &CurrentUser,
    author_id: uuid::Uuid,
) -> Result<(), AccessDenied> {
    check(
        can_delete_message(user, author_id),
        "You do not have permission to delete this message",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::tests::sample_ticket;
    use uuid::Uuid;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            name: format!("{} user", role),
            email: format!("{}@example.com", role),
            role,
        }
    }

    #[test]
    fn test_cliente_views_only_owned_tickets() {
        let alice = user(Role::Cliente);
        let mut ticket = sample_ticket();
        assert!(!can_view_ticket(&alice, &ticket));

        ticket.cliente_id = Some(alice.id);
        assert!(can_view_ticket(&alice, &ticket));

        // Being the assignee does not grant a cliente visibility.
        ticket.cliente_id = None;
        ticket.user_id = Some(alice.id);
        assert!(!can_view_ticket(&alice, &ticket));
    }

    #[test]
    fn test_cliente_visibility_matches_ownership_for_many_tickets() {
        let alice = user(Role::Cliente);
        let other = Uuid::new_v4();
        for owner in [Some(alice.id), Some(other), None] {
            let mut ticket = sample_ticket();
            ticket.cliente_id = owner;
            assert_eq!(can_view_ticket(&alice, &ticket), owner == Some(alice.id));
        }
    }

    #[test]
    fn test_assistant_views_only_assigned_tickets() {
        let carol = user(Role::Assistant);
        let mut ticket = sample_ticket();
        assert!(!can_view_ticket(&carol, &ticket));
        ticket.user_id = Some(carol.id);
        assert!(can_view_ticket(&carol, &ticket));
        assert!(!can_view_all_tickets(&carol));
    }

    #[test]
    fn test_admin_and_support_view_everything() {
        let ticket = sample_ticket();
        for role in [Role::Admin, Role::Support] {
            let u = user(role);
            assert!(can_view_ticket(&u, &ticket));
            assert!(can_view_all_tickets(&u));
            assert!(can_edit_ticket(&u, &ticket));
            assert!(can_delete_ticket(&u, &ticket));
        }
    }

    #[test]
    fn test_cliente_never_edits() {
        let alice = user(Role::Cliente);
        let mut ticket = sample_ticket();
        ticket.cliente_id = Some(alice.id);
        assert!(!can_edit_ticket(&alice, &ticket));
        let err = ensure_can_edit_ticket(&alice, &ticket).unwrap_err();
        assert_eq!(err.reason, "You do not have permission to edit this ticket");
    }

    #[test]
    fn test_assignee_can_delete() {
        let carol = user(Role::Assistant);
        let mut ticket = sample_ticket();
        assert!(!can_delete_ticket(&carol, &ticket));
        ticket.user_id = Some(carol.id);
        assert!(can_delete_ticket(&carol, &ticket));
    }

    #[test]
    fn test_only_admin_manages_users() {
        assert!(can_manage_users(&user(Role::Admin)));
        for role in [Role::Support, Role::Assistant, Role::Cliente] {
            assert!(ensure_can_manage_users(&user(role)).is_err());
        }
    }

    #[test]
    fn test_internal_messages_are_staff_only() {
        assert!(can_send_internal_message(&user(Role::Assistant)));
        assert!(!can_send_internal_message(&user(Role::Cliente)));
    }

    #[test]
    fn test_attachment_and_message_deletion() {
        let alice = user(Role::Cliente);
        let mut ticket = sample_ticket();
        ticket.cliente_id = Some(alice.id);
        assert!(!can_delete_attachment(&alice, &ticket));
        assert!(can_delete_attachment(&user(Role::Support), &ticket));

        assert!(can_delete_message(&alice, alice.id));
        assert!(!can_delete_message(&user(Role::Assistant), alice.id));
        assert!(can_delete_message(&user(Role::Admin), alice.id));
    }
}
