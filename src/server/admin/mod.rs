mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{uid}", get(users::get_user).patch(users::update_user))
        .route("/users/{uid}/tokens", post(users::create_user_token))
        .route("/ban", post(users::set_ban_status))
}
