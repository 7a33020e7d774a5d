//! Notification inbox of the authenticated user.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{Notification, UnreadCount};
use persistence::entities::NotificationEntity;
use persistence::repositories::NotificationRepository;
use serde::Serialize;
use shared::pagination::{PageRequest, Paginated};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;

const NOTIFICATIONS_PER_PAGE: u32 = 20;
const MAX_NOTIFICATIONS_PER_PAGE: u32 = 100;

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// Rows with an unknown kind are dropped.
fn into_notifications(rows: Vec<NotificationEntity>) -> Vec<Notification> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            Notification::try_from(row)
                .map_err(|e| warn!(notification_id = %id, error = %e, "Skipping notification"))
                .ok()
        })
        .collect()
}

async fn list_page(
    state: &AppState,
    user_id: Uuid,
    unread_only: bool,
    request: PageRequest,
) -> Result<Paginated<Notification>, ApiError> {
    let page = request.resolve(NOTIFICATIONS_PER_PAGE, MAX_NOTIFICATIONS_PER_PAGE);
    let (rows, total) = NotificationRepository::new(state.pool.clone())
        .list_for_user(user_id, unread_only, page)
        .await?;
    Ok(Paginated::new(into_notifications(rows), page, total))
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(request): Query<PageRequest>,
) -> Result<Json<Paginated<Notification>>, ApiError> {
    Ok(Json(list_page(&state, user.id, false, request).await?))
}

/// GET /api/notifications/unread
pub async fn list_unread(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(request): Query<PageRequest>,
) -> Result<Json<Paginated<Notification>>, ApiError> {
    Ok(Json(list_page(&state, user.id, true, request).await?))
}

/// GET /api/notifications/count
pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UnreadCount>, ApiError> {
    let unread = NotificationRepository::new(state.pool.clone())
        .count_unread(user.id)
        .await?;
    Ok(Json(UnreadCount { unread }))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let row = NotificationRepository::new(state.pool.clone())
        .mark_read(id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;
    let notification = Notification::try_from(row).map_err(ApiError::Internal)?;
    Ok(Json(notification))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = NotificationRepository::new(state.pool.clone())
        .mark_all_read(user.id)
        .await?;
    info!(user_id = %user.id, updated, "Notifications marked read");
    Ok(Json(MarkAllReadResponse { updated }))
}

/// DELETE /api/notifications/:id
pub async fn delete_notification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = NotificationRepository::new(state.pool.clone())
        .delete(id, user.id)
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
