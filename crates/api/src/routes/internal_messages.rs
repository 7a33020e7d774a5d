//! Ticket conversation messages with their attachments.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::activity_log::model_type;
use domain::models::{
    ActivityAction, Attachment, AttachmentScope, CurrentUser, TicketMessage,
    TicketMessageResponse,
};
use domain::services::{access, ActivityLogBuilder, DomainEvent};
use persistence::repositories::{AttachmentRepository, TicketMessageRepository};
use serde_json::json;
use std::collections::HashMap;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, MessageForm, UploadedFile};
use crate::routes::attachments::{attachment_created, store_uploads};
use crate::routes::{load_ticket, record_activity, user_summaries};
use crate::services::storage::remove_files;

fn message_entry(actor: &CurrentUser, action: ActivityAction, message: &TicketMessage) -> ActivityLogBuilder {
    let values = json!({
        "ticket_id": message.ticket_id,
        "is_internal": message.is_internal,
    });
    let builder = ActivityLogBuilder::user_action(actor.id, action)
        .on_model(model_type::TICKET_MESSAGE, message.id);
    match action {
        ActivityAction::Deleted => builder
            .with_old_values(values)
            .with_description(format!("Message removed from ticket #{}", message.ticket_id)),
        _ => builder
            .with_new_values(values)
            .with_description(format!("Message added to ticket #{}", message.ticket_id)),
    }
}

/// Oldest first. Internal messages are left out for clients.
///
/// GET /api/tickets/:id/messages-internal
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Vec<TicketMessageResponse>>, ApiError> {
    let ticket = load_ticket(&state, ticket_id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;

    let messages: Vec<TicketMessage> = TicketMessageRepository::new(state.pool.clone())
        .list_for_ticket(ticket_id, user.role.is_staff())
        .await?
        .into_iter()
        .map(TicketMessage::from)
        .collect();

    let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
    let mut by_message: HashMap<i64, Vec<Attachment>> = HashMap::new();
    for row in AttachmentRepository::new(state.pool.clone())
        .list_for_messages(&ids)
        .await?
    {
        let attachment = Attachment::from(row);
        if let Some(message_id) = attachment.message_id {
            by_message.entry(message_id).or_default().push(attachment);
        }
    }

    let authors = user_summaries(&state, messages.iter().map(|m| m.user_id)).await?;
    let responses = messages
        .into_iter()
        .map(|message| TicketMessageResponse {
            author: authors.get(&message.user_id).cloned(),
            attachments: by_message.remove(&message.id).unwrap_or_default(),
            message,
        })
        .collect();
    Ok(Json(responses))
}

/// Text and files are validated before anything is stored.
///
/// POST /api/tickets/:id/messages-internal
pub async fn post_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Path(ticket_id): Path<i64>,
    form: MessageForm,
) -> Result<(StatusCode, Json<TicketMessageResponse>), ApiError> {
    let ticket = load_ticket(&state, ticket_id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;
    if form.is_internal {
        access::ensure_can_send_internal_message(&user)?;
    }

    let limits = state.config.uploads.limits();
    let text = form.message.trim();
    limits.validate_message(text)?;
    let incoming: Vec<_> = form.files.iter().map(UploadedFile::incoming).collect();
    let accepted = limits.validate_files(&incoming)?;

    let messages = TicketMessageRepository::new(state.pool.clone());
    let message: TicketMessage = messages
        .create(ticket_id, user.id, text, form.is_internal)
        .await?
        .into();

    let attachments = if form.files.is_empty() {
        Vec::new()
    } else {
        let scope = AttachmentScope::Message {
            ticket_id,
            message_id: message.id,
        };
        match store_uploads(&state, scope, form.files, accepted).await {
            Ok(attachments) => attachments,
            Err(e) => {
                // The message must not outlive its failed upload.
                if let Err(delete_error) = messages.delete(message.id).await {
                    tracing::error!(
                        message_id = message.id,
                        error = %delete_error,
                        "Failed to discard message after upload failure"
                    );
                }
                return Err(e);
            }
        }
    };

    record_activity(
        &state,
        std::iter::once(message_entry(&user, ActivityAction::Created, &message))
            .chain(attachments.iter().map(|a| attachment_created(&user, a))),
        &client,
    );
    info!(
        ticket_id,
        message_id = message.id,
        user_id = %user.id,
        is_internal = message.is_internal,
        attachments = attachments.len(),
        "Ticket message posted"
    );

    state
        .events
        .publish(DomainEvent::NewMessage {
            ticket,
            message: message.clone(),
            sender: user.summary(),
            has_attachments: !attachments.is_empty(),
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(TicketMessageResponse {
            message,
            author: Some(user.summary()),
            attachments,
        }),
    ))
}

/// DELETE /api/tickets/:id/messages-internal/:message_id
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Path((ticket_id, message_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let ticket = load_ticket(&state, ticket_id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;

    let repo = TicketMessageRepository::new(state.pool.clone());
    let message: TicketMessage = repo
        .find_by_id(message_id)
        .await?
        .map(TicketMessage::from)
        .filter(|m| m.ticket_id == ticket_id)
        .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;
    access::ensure_can_delete_message(&user, message.user_id)?;

    let paths = AttachmentRepository::new(state.pool.clone())
        .stored_paths_for_message(message_id)
        .await?;
    if !repo.delete(message_id).await? {
        return Err(ApiError::NotFound("Message not found".to_string()));
    }
    remove_files(&state.storage, &paths).await;

    record_activity(
        &state,
        [message_entry(&user, ActivityAction::Deleted, &message)],
        &client,
    );
    info!(ticket_id, message_id, user_id = %user.id, files = paths.len(), "Ticket message deleted");

    Ok(StatusCode::NO_CONTENT)
}
