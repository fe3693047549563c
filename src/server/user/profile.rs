use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ProfileResponse, PublicProfileResponse, UpdateProfileRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::server::validation::{validate_email, validate_username};
use crate::types::User;

pub async fn get_profile(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let profile = profile_response(&state, auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

/// Changes the caller's email or username. Global role and ban state stay
/// with the admin API.
pub async fn update_profile(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let mut user = auth.user;

    if let Some(email) = req.email {
        validate_email(&email)?;
        user.email = email;
    }
    if let Some(username) = req.username {
        validate_username(&username)?;
        user.username = username;
    }
    user.updated_at = Utc::now();

    state.store.update_user(&user)?;
    tracing::debug!("Updated profile of {}", user.uid);

    let profile = profile_response(&state, user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

pub async fn get_public_profile(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user_by_uid(&uid)?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PublicProfileResponse::from(
        user,
    ))))
}

fn profile_response(state: &AppState, user: User) -> Result<ProfileResponse, ApiError> {
    let usage = state.projects.quota_usage(&user)?;

    Ok(ProfileResponse {
        uid: user.uid,
        email: user.email,
        username: user.username,
        global_role: user.global_role,
        owned_projects: usage.owned_projects,
        max_projects: usage.max_projects,
    })
}
