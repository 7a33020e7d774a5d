//! Inbound WhatsApp gateway webhook.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::models::{
    NewTicket, Ticket, TicketOrigin, TicketPriority, TicketStatus, WhatsappMessageKind,
    WhatsappWebhookPayload,
};
use domain::services::{activity, lifecycle};
use persistence::repositories::{TicketRepository, WhatsappMessageRepository};
use serde::Serialize;
use shared::crypto::verify_signature;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::ClientInfo;
use crate::middleware::metrics::record_ticket_created;
use crate::routes::record_activity;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Client name on tickets opened from an unknown number.
const WHATSAPP_CLIENT_NAME: &str = "Cliente WhatsApp";

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: String,
    pub ticket_id: i64,
    pub ticket_created: bool,
}

/// Checks `X-Webhook-Signature` against the raw body when a secret is set.
fn check_signature(secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    if secret.is_empty() {
        return Ok(());
    }
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing webhook signature".to_string()))?;
    if !verify_signature(body, secret, signature) {
        return Err(ApiError::Unauthorized(
            "Invalid webhook signature".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/webhook/whatsapp
pub async fn receive_whatsapp(
    State(state): State<AppState>,
    client: ClientInfo,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookResponse>), ApiError> {
    check_signature(&state.config.security.webhook_secret, &headers, &body)?;

    let payload: WhatsappWebhookPayload = if body.is_empty() {
        WhatsappWebhookPayload::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON payload: {}", e)))?
    };
    let inbound = payload.into_inbound()?;

    let tickets = TicketRepository::new(state.pool.clone());
    let (ticket, created) = match tickets.find_open_by_whatsapp(&inbound.from).await? {
        Some(entity) => (Ticket::from(entity), false),
        None => {
            let new_ticket = NewTicket {
                title: inbound.derived_title(),
                client_name: WHATSAPP_CLIENT_NAME.to_string(),
                description: inbound.text.clone(),
                whatsapp_number: Some(inbound.from.clone()),
                status: TicketStatus::Pendente,
                priority: TicketPriority::Media,
                origin: Some(TicketOrigin::Api),
                user_id: None,
                cliente_id: None,
                resolution_time_minutes: None,
            };
            let ticket: Ticket = tickets.create(&new_ticket).await?.into();
            record_ticket_created(TicketOrigin::Api.as_str());
            record_activity(&state, activity::ticket_created(&ticket, None), &client);
            (ticket, true)
        }
    };

    WhatsappMessageRepository::new(state.pool.clone())
        .create(ticket.id, &inbound.text, WhatsappMessageKind::Recebido)
        .await?;

    if created {
        state
            .events
            .publish(lifecycle::created_event(ticket.clone(), None))
            .await;
    }

    info!(
        ticket_id = ticket.id,
        ticket_created = created,
        "Inbound WhatsApp message processed"
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(WebhookResponse {
            message: "Message processed".to_string(),
            ticket_id: ticket.id,
            ticket_created: created,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use shared::crypto::sign_payload;

    #[test]
    fn test_no_secret_accepts_unsigned() {
        assert!(check_signature("", &HeaderMap::new(), b"{}").is_ok());
    }

    #[test]
    fn test_missing_signature_rejected() {
        let result = check_signature("s3cret", &HeaderMap::new(), b"{}");
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_signature_must_match_body() {
        let body = br#"{"from":"5511999990000","text":"oi"}"#;
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_str(&sign_payload(body, "s3cret")).unwrap(),
        );
        assert!(check_signature("s3cret", &headers, body).is_ok());
        assert!(check_signature("s3cret", &headers, b"{}").is_err());
        assert!(check_signature("other", &headers, body).is_err());
    }
}
