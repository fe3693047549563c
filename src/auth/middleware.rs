use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{TokenValidationError, ValidatedToken, extract_bearer_token, validate_token};
use crate::server::AppState;
use crate::types::{Token, User};

/// The caller's identity when one was presented. Anonymous requests and admin
/// tokens yield `None`; a malformed or invalid token, or a banned user, is
/// still rejected.
pub struct CurrentUser(pub Option<User>);

/// Extractor that requires an admin token
pub struct RequireAdmin(pub Token);

/// Extractor that requires a user token bound to an existing user
pub struct RequireUser {
    pub token: Token,
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    NotAdmin,
    NotUser,
    Banned,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::NotUser => (
                StatusCode::FORBIDDEN,
                "User token required for this operation",
            ),
            AuthError::Banned => (StatusCode::FORBIDDEN, "Account suspended"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"tenantry\""),
            );
        }

        response
    }
}

impl From<TokenValidationError> for AuthError {
    fn from(e: TokenValidationError) -> Self {
        match e {
            TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
            TokenValidationError::InvalidToken => AuthError::InvalidToken,
            TokenValidationError::TokenExpired => AuthError::TokenExpired,
            TokenValidationError::InternalError => AuthError::InternalError,
        }
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state)?.and_then(|v| v.user);
        if user.as_ref().is_some_and(|u| u.banned) {
            return Err(AuthError::Banned);
        }
        Ok(CurrentUser(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = authenticate(parts, state)?.ok_or(AuthError::MissingAuth)?;

        if !validated.token.is_admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(validated.token))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = authenticate(parts, state)?.ok_or(AuthError::MissingAuth)?;

        if validated.token.is_admin {
            return Err(AuthError::NotUser);
        }

        let user = validated.user.ok_or(AuthError::NotUser)?;
        if user.banned {
            return Err(AuthError::Banned);
        }

        Ok(RequireUser {
            token: validated.token,
            user,
        })
    }
}

fn authenticate(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<ValidatedToken>, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(raw_token) = extract_bearer_token(auth_header)? else {
        return Ok(None);
    };

    let validated = validate_token(state.store.as_ref(), raw_token)?;
    Ok(Some(validated))
}
