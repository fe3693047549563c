mod members;
mod profile;
mod projects;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Profile
        .route(
            "/users/me",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/users/{uid}", get(profile::get_public_profile))
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/projects/{id}", delete(projects::delete_project))
        // Members
        .route(
            "/projects/{id}/members",
            get(members::list_members).post(members::invite_member),
        )
        .route(
            "/projects/{id}/members/{uid}",
            delete(members::kick_member),
        )
}
