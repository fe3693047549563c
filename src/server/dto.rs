use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Token, USER, User};

fn default_global_role() -> String {
    USER.to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub uid: String,
    pub email: String,
    pub username: String,
    #[serde(default = "default_global_role")]
    pub global_role: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub global_role: Option<String>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

fn default_banned() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    /// External UID of the user.
    pub user_id: String,
    #[serde(default = "default_banned")]
    pub banned: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            created_at: token.created_at,
            expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

/// The caller's own profile together with their project quota.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub uid: String,
    pub email: String,
    pub username: String,
    pub global_role: String,
    pub owned_projects: usize,
    /// `null` when the caller's tier is unlimited.
    pub max_projects: Option<u32>,
}

/// What anyone may see about another user.
#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    pub uid: String,
    pub username: String,
    pub global_role: String,
}

impl From<User> for PublicProfileResponse {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            username: user.username,
            global_role: user.global_role,
        }
    }
}
