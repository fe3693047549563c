use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::projects::{MemberInvite, Status};
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_members(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let members = state.projects.list_project_members(&auth.user, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(members)))
}

pub async fn invite_member(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(invite): Json<MemberInvite>,
) -> impl IntoResponse {
    let change = state
        .projects
        .invite_or_update_member(&auth.user, &id, &invite)?;

    let status = match change.status {
        Status::Added => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok::<_, ApiError>((status, Json(ApiResponse::success(change))))
}

pub async fn kick_member(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, uid)): Path<(String, String)>,
) -> impl IntoResponse {
    let kicked = state.projects.kick_member(&auth.user, &id, &uid)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(kicked)))
}
