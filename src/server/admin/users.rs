use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireAdmin, issue_token};
use crate::server::AppState;
use crate::server::dto::{
    BanRequest, CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, UpdateUserRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::server::validation::{
    validate_email, validate_global_role, validate_new_user, validate_username,
};
use crate::types::User;

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    validate_new_user(
        state.projects.access().tables(),
        &req.uid,
        &req.email,
        &req.username,
        &req.global_role,
    )?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        uid: req.uid,
        email: req.email,
        username: req.username,
        global_role: req.global_role,
        banned: false,
        created_at: now,
        updated_at: now,
    };

    state.store.create_user(&user)?;
    tracing::info!("Provisioned user {} as {}", user.uid, user.global_role);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let users = state.store.list_users()?;
    Ok::<_, ApiError>(Json(ApiResponse::success(users)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user_by_uid(&uid)?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    let mut user = state
        .store
        .get_user_by_uid(&uid)?
        .or_not_found("User not found")?;

    if let Some(email) = req.email {
        validate_email(&email)?;
        user.email = email;
    }
    if let Some(username) = req.username {
        validate_username(&username)?;
        user.username = username;
    }
    if let Some(global_role) = req.global_role {
        validate_global_role(state.projects.access().tables(), &global_role)?;
        if global_role != user.global_role {
            tracing::info!(
                "Changed global role of {} from {} to {}",
                user.uid,
                user.global_role,
                global_role
            );
        }
        user.global_role = global_role;
    }
    user.updated_at = Utc::now();

    state.store.update_user(&user)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

/// Bans a user, or lifts the ban when `banned` is false.
pub async fn set_ban_status(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BanRequest>,
) -> impl IntoResponse {
    let mut user = state
        .store
        .get_user_by_uid(&req.user_id)?
        .or_not_found("User not found")?;

    if user.banned != req.banned {
        user.banned = req.banned;
        user.updated_at = Utc::now();
        state.store.update_user(&user)?;

        if user.banned {
            tracing::info!("Banned user {}", user.uid);
        } else {
            tracing::info!("Lifted ban on user {}", user.uid);
        }
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user_by_uid(&uid)?
        .or_not_found("User not found")?;

    if req.expires_in_seconds.is_some_and(|s| s < 0) {
        return Err(ApiError::bad_request(
            "expires_in_seconds cannot be negative",
        ));
    }

    let expires_at = req
        .expires_in_seconds
        .map(|s| Utc::now() + Duration::seconds(s));

    let (token, raw_token) = issue_token(state.store.as_ref(), Some(user.id), expires_at)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: token.into(),
        })),
    ))
}
