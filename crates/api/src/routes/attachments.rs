//! Ticket attachments and attachment downloads.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::activity_log::model_type;
use domain::models::{
    ActivityAction, Attachment, AttachmentScope, CurrentUser, NewAttachment, Ticket,
    TicketMessage,
};
use domain::services::{access, upload_policy, ActivityLogBuilder};
use persistence::repositories::{AttachmentRepository, TicketMessageRepository};
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo, FileUpload, UploadedFile};
use crate::middleware::metrics::record_attachments_uploaded;
use crate::routes::{load_ticket, record_activity};
use crate::services::storage::remove_files;

/// Writes already validated files and inserts their rows.
///
/// `accepted` pairs each file with its extension and MIME type, in order.
/// All or nothing: on failure the files and rows written so far are removed.
pub(crate) async fn store_uploads(
    state: &AppState,
    scope: AttachmentScope,
    files: Vec<UploadedFile>,
    accepted: Vec<(String, &'static str)>,
) -> Result<Vec<Attachment>, ApiError> {
    let repo = AttachmentRepository::new(state.pool.clone());
    let mut stored: Vec<Attachment> = Vec::with_capacity(files.len());
    let mut written: Vec<String> = Vec::with_capacity(files.len());

    for (file, (ext, mime)) in files.into_iter().zip(accepted) {
        let key = upload_policy::storage_key(scope, &ext);
        let size_bytes = file.bytes.len() as i64;
        if let Err(e) = state.storage.put(&key, file.bytes).await {
            tracing::error!(storage_key = %key, error = %e, "Failed to store upload");
            discard_uploads(state, &repo, &stored, &written).await;
            return Err(ApiError::Internal("Failed to store file".to_string()));
        }
        written.push(key.clone());

        let created = repo
            .create(&NewAttachment {
                scope,
                original_name: file.original_name,
                stored_path: key,
                mime_type: mime.to_string(),
                size_bytes,
            })
            .await;
        match created {
            Ok(row) => stored.push(row.into()),
            Err(e) => {
                discard_uploads(state, &repo, &stored, &written).await;
                return Err(e.into());
            }
        }
    }

    record_attachments_uploaded(stored.len());
    Ok(stored)
}

/// Best-effort undo of a partially stored upload batch.
async fn discard_uploads(
    state: &AppState,
    repo: &AttachmentRepository,
    stored: &[Attachment],
    written: &[String],
) {
    for attachment in stored {
        if let Err(e) = repo.delete(attachment.id).await {
            tracing::warn!(attachment_id = attachment.id, error = %e, "Failed to discard attachment row");
        }
    }
    remove_files(&state.storage, written).await;
    tracing::warn!(files = written.len(), "Discarded partially stored upload");
}

pub(crate) fn attachment_created(actor: &CurrentUser, attachment: &Attachment) -> ActivityLogBuilder {
    ActivityLogBuilder::user_action(actor.id, ActivityAction::Created)
        .on_model(model_type::ATTACHMENT, attachment.id)
        .with_new_values(json!({
            "ticket_id": attachment.ticket_id,
            "message_id": attachment.message_id,
            "original_name": attachment.original_name,
            "size_bytes": attachment.size_bytes,
        }))
        .with_description(format!(
            "Attachment {} added to ticket #{}",
            attachment.original_name, attachment.ticket_id
        ))
}

/// Loads an attachment with its ticket after checking the caller may see it.
///
/// Files of internal messages are hidden from clients.
async fn load_visible(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
) -> Result<(Attachment, Ticket), ApiError> {
    let attachment: Attachment = AttachmentRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Attachment not found".to_string()))?
        .into();
    let ticket = load_ticket(state, attachment.ticket_id).await?;
    access::ensure_can_view_ticket(user, &ticket)?;

    if let Some(message_id) = attachment.message_id {
        if !user.role.is_staff() {
            let message: Option<TicketMessage> = TicketMessageRepository::new(state.pool.clone())
                .find_by_id(message_id)
                .await?
                .map(TicketMessage::from);
            if message.map_or(true, |m| m.is_internal) {
                return Err(ApiError::Forbidden(
                    "You do not have access to this attachment".to_string(),
                ));
            }
        }
    }
    Ok((attachment, ticket))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Inline,
    Attachment,
}

fn content_disposition(disposition: Disposition, filename: &str) -> HeaderValue {
    let kind = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };
    let safe: String = filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    HeaderValue::from_str(&format!("{}; filename=\"{}\"", kind, safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn content_type(attachment: &Attachment) -> String {
    if attachment.mime_type.is_empty() {
        mime_guess::from_path(&attachment.original_name)
            .first_or_octet_stream()
            .to_string()
    } else {
        attachment.mime_type.clone()
    }
}

async fn stream_file(
    state: &AppState,
    attachment: &Attachment,
    disposition: Disposition,
) -> Result<Response, ApiError> {
    let file = state
        .storage
        .open(&attachment.stored_path)
        .await
        .map_err(|e| {
            tracing::warn!(attachment_id = attachment.id, error = %e, "Stored file unavailable");
            ApiError::NotFound("File not found".to_string())
        })?;

    let body = Body::from_stream(ReaderStream::new(file));
    let content_type = HeaderValue::from_str(&content_type(attachment))
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(disposition, &attachment.original_name),
            ),
        ],
        body,
    )
        .into_response())
}

/// Newest first.
///
/// GET /api/tickets/:id/attachments
pub async fn list_attachments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Vec<Attachment>>, ApiError> {
    let ticket = load_ticket(&state, ticket_id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;

    let attachments = AttachmentRepository::new(state.pool.clone())
        .list_for_ticket(ticket_id)
        .await?
        .into_iter()
        .map(Attachment::from)
        .collect();
    Ok(Json(attachments))
}

/// Every file is validated before any is written.
///
/// POST /api/tickets/:id/attachments
pub async fn upload_attachments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Path(ticket_id): Path<i64>,
    FileUpload { files }: FileUpload,
) -> Result<(StatusCode, Json<Vec<Attachment>>), ApiError> {
    let ticket = load_ticket(&state, ticket_id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;

    if files.is_empty() {
        return Err(ApiError::invalid("files", "At least one file is required"));
    }
    let incoming: Vec<_> = files.iter().map(UploadedFile::incoming).collect();
    let accepted = state.config.uploads.limits().validate_files(&incoming)?;

    let stored = store_uploads(
        &state,
        AttachmentScope::Ticket { ticket_id },
        files,
        accepted,
    )
    .await?;

    record_activity(
        &state,
        stored.iter().map(|a| attachment_created(&user, a)),
        &client,
    );
    info!(ticket_id, user_id = %user.id, count = stored.len(), "Attachments uploaded");

    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /api/attachments/:id
pub async fn show_attachment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let (attachment, _) = load_visible(&state, &user, id).await?;
    stream_file(&state, &attachment, Disposition::Inline).await
}

/// GET /api/attachments/:id/download
pub async fn download_attachment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let (attachment, _) = load_visible(&state, &user, id).await?;
    stream_file(&state, &attachment, Disposition::Attachment).await
}

/// GET /api/message-attachments/:id/download
pub async fn download_message_attachment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let (attachment, _) = load_visible(&state, &user, id).await?;
    if attachment.message_id.is_none() {
        return Err(ApiError::NotFound("Attachment not found".to_string()));
    }
    stream_file(&state, &attachment, Disposition::Attachment).await
}

/// DELETE /api/attachments/:id
pub async fn delete_attachment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    client: ClientInfo,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let (attachment, ticket) = load_visible(&state, &user, id).await?;
    access::ensure_can_delete_attachment(&user, &ticket)?;

    let deleted = AttachmentRepository::new(state.pool.clone())
        .delete(id)
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Attachment not found".to_string()));
    }
    remove_files(&state.storage, std::slice::from_ref(&attachment.stored_path)).await;

    record_activity(
        &state,
        [ActivityLogBuilder::user_action(user.id, ActivityAction::Deleted)
            .on_model(model_type::ATTACHMENT, attachment.id)
            .with_old_values(json!({
                "ticket_id": attachment.ticket_id,
                "original_name": attachment.original_name,
            }))
            .with_description(format!(
                "Attachment {} removed from ticket #{}",
                attachment.original_name, attachment.ticket_id
            ))],
        &client,
    );
    info!(attachment_id = id, ticket_id = ticket.id, user_id = %user.id, "Attachment deleted");

    Ok(StatusCode::NO_CONTENT)
}
