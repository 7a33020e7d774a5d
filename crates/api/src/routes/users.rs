//! Profile and user administration endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::activity_log::model_type;
use domain::models::{
    ActivityAction, CreateUserRequest, UpdateProfileRequest, UpdateUserRequest, User,
    UserResponse,
};
use domain::services::{access, ActivityLogBuilder};
use persistence::repositories::{ActivityLogRepository, UserChanges, UserRepository};
use serde_json::json;
use shared::pagination::{PageRequest, Paginated};
use shared::password::hash_password;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AuthUser, ClientInfo};

const USERS_PER_PAGE: u32 = 15;

fn email_taken() -> ApiError {
    ApiError::Conflict("Email already registered".to_string())
}

/// Maps a unique violation on users.email to a friendlier conflict.
fn map_user_write_error(e: sqlx::Error) -> ApiError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => email_taken(),
        _ => e.into(),
    }
}

/// GET /api/me
pub async fn get_current_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let entity = UserRepository::new(state.pool.clone())
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let user: User = entity.into();
    Ok(Json(user.into()))
}

/// PUT /api/me
pub async fn update_current_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    request.validate()?;

    let changes = UserChanges {
        name: request.name.map(|n| n.trim().to_string()),
        email: request.email,
        ..Default::default()
    };
    let entity = UserRepository::new(state.pool.clone())
        .update(user.id, changes)
        .await
        .map_err(map_user_write_error)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(user_id = %user.id, "Profile updated");
    let updated: User = entity.into();
    Ok(Json(updated.into()))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageRequest>,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    access::ensure_can_manage_users(&user)?;

    let page = page.resolve(USERS_PER_PAGE, USERS_PER_PAGE);
    let (rows, total) = UserRepository::new(state.pool.clone()).list(page).await?;
    let users = rows
        .into_iter()
        .map(|e| UserResponse::from(User::from(e)))
        .collect();
    Ok(Json(Paginated::new(users, page, total)))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    client: ClientInfo,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    access::ensure_can_manage_users(&actor)?;
    request.validate()?;

    let repo = UserRepository::new(state.pool.clone());
    if repo.find_by_email(&request.email).await?.is_some() {
        return Err(email_taken());
    }

    let hash = hash_password(&request.password)?;
    let entity = repo
        .create(request.name.trim(), &request.email, &hash, request.role)
        .await
        .map_err(map_user_write_error)?;
    let created: User = entity.into();

    ActivityLogRepository::new(state.pool.clone()).insert_async(
        ActivityLogBuilder::user_action(actor.id, ActivityAction::Created)
            .on_model(model_type::USER, created.id)
            .with_new_values(json!({ "name": created.name, "email": created.email, "role": created.role }))
            .with_description(format!("User {} created", created.email))
            .with_ip(client.ip)
            .with_user_agent(client.user_agent)
            .build(),
    );

    info!(user_id = %created.id, role = %created.role, created_by = %actor.id, "User created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    access::ensure_can_manage_users(&actor)?;
    let entity = UserRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let user: User = entity.into();
    Ok(Json(user.into()))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    client: ClientInfo,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    access::ensure_can_manage_users(&actor)?;
    request.validate()?;

    let repo = UserRepository::new(state.pool.clone());
    let current: User = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?
        .into();

    let password_hash = match request.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    let changes = UserChanges {
        name: request.name.map(|n| n.trim().to_string()),
        email: request.email,
        role: request.role,
        password_hash,
    };
    let updated: User = repo
        .update(id, changes)
        .await
        .map_err(map_user_write_error)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?
        .into();

    ActivityLogRepository::new(state.pool.clone()).insert_async(
        ActivityLogBuilder::user_action(actor.id, ActivityAction::Updated)
            .on_model(model_type::USER, updated.id)
            .with_old_values(json!({ "name": current.name, "email": current.email, "role": current.role }))
            .with_new_values(json!({ "name": updated.name, "email": updated.email, "role": updated.role }))
            .with_description(format!("User {} updated", updated.email))
            .with_ip(client.ip)
            .with_user_agent(client.user_agent)
            .build(),
    );

    info!(user_id = %updated.id, updated_by = %actor.id, "User updated");
    Ok(Json(updated.into()))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    client: ClientInfo,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    access::ensure_can_manage_users(&actor)?;
    if id == actor.id {
        return Err(ApiError::invalid("id", "You cannot delete your own account"));
    }

    let deleted = UserRepository::new(state.pool.clone()).delete(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    ActivityLogRepository::new(state.pool.clone()).insert_async(
        ActivityLogBuilder::user_action(actor.id, ActivityAction::Deleted)
            .on_model(model_type::USER, id)
            .with_description(format!("User {} deleted", id))
            .with_ip(client.ip)
            .with_user_agent(client.user_agent)
            .build(),
    );

    info!(user_id = %id, deleted_by = %actor.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
