//! Activity log listing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use domain::models::activity_log::{model_type, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use domain::models::{ActivityLog, ActivityLogFilter, ActivityLogQuery, CurrentUser, Role};
use domain::services::access;
use persistence::repositories::ActivityLogRepository;
use shared::pagination::{PageRequest, Paginated};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::routes::load_ticket;

/// Clients only ever see their own entries.
fn scope_filter(user: &CurrentUser, mut filter: ActivityLogFilter) -> ActivityLogFilter {
    if user.role == Role::Cliente {
        filter.user_id = Some(user.id);
    }
    filter
}

async fn list_page(
    state: &AppState,
    filter: &ActivityLogFilter,
    request: PageRequest,
) -> Result<Paginated<ActivityLog>, ApiError> {
    let page = request.resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
    let (rows, total) = ActivityLogRepository::new(state.pool.clone())
        .list(filter, page)
        .await?;
    let entries = rows.into_iter().filter_map(|row| row.into_domain()).collect();
    Ok(Paginated::new(entries, page, total))
}

/// GET /api/activity-logs
pub async fn list_activity_logs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<ActivityLogQuery>,
) -> Result<Json<Paginated<ActivityLog>>, ApiError> {
    let filter = scope_filter(&user, query.to_filter(Utc::now()));
    Ok(Json(list_page(&state, &filter, query.page_request()).await?))
}

/// GET /api/tickets/:id/activity-logs
pub async fn ticket_activity_logs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(ticket_id): Path<i64>,
    Query(request): Query<PageRequest>,
) -> Result<Json<Paginated<ActivityLog>>, ApiError> {
    let ticket = load_ticket(&state, ticket_id).await?;
    access::ensure_can_view_ticket(&user, &ticket)?;

    let filter = ActivityLogFilter {
        model_type: Some(model_type::TICKET.to_string()),
        model_id: Some(ticket_id.to_string()),
        ..Default::default()
    };
    Ok(Json(list_page(&state, &filter, request).await?))
}
