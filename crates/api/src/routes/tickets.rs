//! Ticket endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::{
    CreateTicketRequest, CurrentUser, Role, Ticket, TicketQuery, TicketResponse,
    UpdateTicketRequest,
};
use domain::services::{access, activity, lifecycle};
use persistence::repositories::{
    AttachmentRepository, TicketListFilter, TicketRepository, TicketVisibility,
};
use shared::pagination::Paginated;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo};
use crate::middleware::metrics::record_ticket_created;
use crate::routes::{load_ticket, record_activity, user_summaries};
use crate::services::storage::remove_files;

const TICKETS_PER_PAGE: u32 = 15;
const MAX_TICKETS_PER_PAGE: u32 = 100;

/// Which tickets a role may list.
pub fn visibility_for(user: &CurrentUser) -> TicketVisibility {
    match user.role {
        Role::Admin | Role::Support => TicketVisibility::All,
        Role::Assistant => TicketVisibility::AssignedTo(user.id),
        Role::Cliente => TicketVisibility::OwnedBy(user.id),
    }
}

/// Attaches assignee and client summaries to each ticket.
async fn with_summaries(
    state: &AppState,
    tickets: Vec<Ticket>,
) -> Result<Vec<TicketResponse>, ApiError> {
    let ids: Vec<_> = tickets
        .iter()
        .flat_map(|t| [t.user_id, t.cliente_id])
        .flatten()
        .collect();
    let summaries = user_summaries(state, ids).await?;

    Ok(tickets
        .into_iter()
        .map(|t| {
            let user = t.user_id.and_then(|id| summaries.get(&id).cloned());
            let cliente = t.cliente_id.and_then(|id| summaries.get(&id).cloned());
            TicketResponse::new(t, user, cliente)
        })
        .collect())
}

async fn single_response(state: &AppState, ticket: Ticket) -> Result<TicketResponse, ApiError> {
    let mut responses = with_summaries(state, vec![ticket]).await?;
    responses
        .pop()
        .ok_or_else(|| ApiError::Internal("Ticket response missing".to_string()))
}

/// GET /api/tickets
pub async fn list_tickets(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Paginated<TicketResponse>>, ApiError> {
    let page = query
        .page_request()
        .resolve(TICKETS_PER_PAGE, MAX_TICKETS_PER_PAGE);
    let filter = TicketListFilter::new(&query, visibility_for(&user));

    let (rows, total) = TicketRepository::new(state.pool.clone())
        .list(&filter, page)
        .await?;
    let tickets = rows.into_iter().map(Ticket::from).collect();
    let data = with_summaries(&state, tickets).await?;

    Ok(Json(Paginated::new(data, page, total)))
}

/// GET /api/tickets/:id
pub async fn get_ticket(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<TicketResponse>, ApiError> {
    let ticket = load_ticket(&state, id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;
    Ok(Json(single_response(&state, ticket).await?))
}

/// POST /api/tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let new_ticket = lifecycle::prepare_create(request, &user)?;
    let ticket: Ticket = TicketRepository::new(state.pool.clone())
        .create(&new_ticket)
        .await?
        .into();

    record_ticket_created(ticket.origin.as_ref().map(|o| o.as_str()).unwrap_or("none"));
    record_activity(&state, activity::ticket_created(&ticket, Some(user.id)), &client);
    info!(
        ticket_id = ticket.id,
        user_id = %user.id,
        status = %ticket.status,
        "Ticket created"
    );

    state
        .events
        .publish(lifecycle::created_event(ticket.clone(), Some(&user)))
        .await;

    Ok((StatusCode::CREATED, Json(single_response(&state, ticket).await?)))
}

/// Last write wins: the row is overwritten with the merged ticket.
///
/// PUT /api/tickets/:id
pub async fn update_ticket(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTicketRequest>,
) -> Result<Json<TicketResponse>, ApiError> {
    let current = load_ticket(&state, id).await?;
    let plan = lifecycle::prepare_update(&current, request, &user, Utc::now())?;

    if !plan.has_changes() {
        return Ok(Json(single_response(&state, current).await?));
    }

    let stored: Ticket = TicketRepository::new(state.pool.clone())
        .update(&plan.ticket)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?
        .into();

    record_activity(&state, activity::ticket_updated(&plan, user.id), &client);
    info!(
        ticket_id = stored.id,
        user_id = %user.id,
        fields = ?plan.changes.keys().collect::<Vec<_>>(),
        "Ticket updated"
    );

    if let Some(event) = plan.assignment_event(stored.clone(), &user) {
        state.events.publish(event).await;
    }

    Ok(Json(single_response(&state, stored).await?))
}

/// Deletes the ticket; messages and attachment rows cascade, files follow.
///
/// DELETE /api/tickets/:id
pub async fn delete_ticket(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let ticket = load_ticket(&state, id).await?;
    lifecycle::ensure_deletable(&ticket, &user)?;

    let paths = AttachmentRepository::new(state.pool.clone())
        .stored_paths_for_ticket(id)
        .await?;
    let deleted = TicketRepository::new(state.pool.clone()).delete(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Ticket not found".to_string()));
    }

    record_activity(&state, [activity::ticket_deleted(&ticket, user.id)], &client);
    remove_files(&state.storage, &paths).await;
    info!(ticket_id = id, user_id = %user.id, files = paths.len(), "Ticket deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            name: "u".into(),
            email: "u@example.com".into(),
            role,
        }
    }

    #[test]
    fn test_visibility_by_role() {
        assert_eq!(visibility_for(&user(Role::Admin)), TicketVisibility::All);
        assert_eq!(visibility_for(&user(Role::Support)), TicketVisibility::All);

        let assistant = user(Role::Assistant);
        assert_eq!(
            visibility_for(&assistant),
            TicketVisibility::AssignedTo(assistant.id)
        );

        let cliente = user(Role::Cliente);
        assert_eq!(visibility_for(&cliente), TicketVisibility::OwnedBy(cliente.id));
    }
}
