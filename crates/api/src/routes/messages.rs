//! WhatsApp channel messages of a ticket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{SendWhatsappMessageRequest, WhatsappMessage, WhatsappMessageKind};
use domain::services::access;
use persistence::repositories::WhatsappMessageRepository;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::routes::load_ticket;

/// Oldest first.
///
/// GET /api/tickets/:id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Vec<WhatsappMessage>>, ApiError> {
    let ticket = load_ticket(&state, ticket_id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;

    let messages = WhatsappMessageRepository::new(state.pool.clone())
        .list_for_ticket(ticket_id)
        .await?
        .into_iter()
        .map(WhatsappMessage::from)
        .collect();
    Ok(Json(messages))
}

/// Records an outbound message. Delivery to the gateway happens elsewhere.
///
/// POST /api/tickets/:id/messages
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(ticket_id): Path<i64>,
    Json(request): Json<SendWhatsappMessageRequest>,
) -> Result<(StatusCode, Json<WhatsappMessage>), ApiError> {
    let ticket = load_ticket(&state, ticket_id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;
    request.validate()?;

    let message: WhatsappMessage = WhatsappMessageRepository::new(state.pool.clone())
        .create(ticket_id, request.message.trim(), WhatsappMessageKind::Enviado)
        .await?
        .into();

    info!(
        ticket_id,
        message_id = message.id,
        user_id = %user.id,
        to = ?ticket.whatsapp_number,
        "WhatsApp message recorded for delivery"
    );
    Ok((StatusCode::CREATED, Json(message)))
}
