//! HTTP route handlers.

pub mod activity_logs;
pub mod attachments;
pub mod auth;
pub mod health;
pub mod internal_messages;
pub mod messages;
pub mod notifications;
pub mod tickets;
pub mod users;
pub mod webhook;

use domain::models::{Ticket, User, UserSummary};
use domain::services::ActivityLogBuilder;
use persistence::repositories::{ActivityLogRepository, TicketRepository, UserRepository};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ClientInfo;

/// Loads a ticket or answers 404.
pub(crate) async fn load_ticket(state: &AppState, id: i64) -> Result<Ticket, ApiError> {
    TicketRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .map(Ticket::from)
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))
}

/// Summaries for the given user ids, keyed by id. Unknown ids are skipped.
pub(crate) async fn user_summaries(
    state: &AppState,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserSummary>, ApiError> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = UserRepository::new(state.pool.clone())
        .find_by_ids(&ids)
        .await?;
    Ok(users
        .into_iter()
        .map(|entity| {
            let user: User = entity.into();
            (user.id, user.summary())
        })
        .collect())
}

/// Queues activity entries stamped with the caller's IP and user agent.
pub(crate) fn record_activity(
    state: &AppState,
    entries: impl IntoIterator<Item = ActivityLogBuilder>,
    client: &ClientInfo,
) {
    let repo = ActivityLogRepository::new(state.pool.clone());
    for entry in entries {
        let mut entry = entry
            .with_ip(client.ip.clone())
            .with_user_agent(client.user_agent.clone());
        if let Some(request_id) = &client.request_id {
            entry = entry.with_metadata(json!({ "request_id": request_id }));
        }
        repo.insert_async(entry.build());
    }
}
