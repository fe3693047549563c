use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{CurrentUser, RequireUser};
use crate::projects::NewProject;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_projects(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let projects = state.projects.list_projects(user.as_ref())?;
    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn create_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewProject>,
) -> impl IntoResponse {
    let created = state.projects.create_project(&auth.user, &req)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn delete_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state.projects.delete_project(&auth.user, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(deleted)))
}
