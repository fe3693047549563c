use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix reserved for forum-style projects readable by every user.
pub const PUBLIC_PREFIX: &str = "PUBLIC_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Identifier assigned by the external identity provider.
    pub uid: String,
    pub email: String,
    pub username: String,
    pub global_role: String,
    /// Banned users keep their data but are refused on every authenticated route.
    #[serde(default)]
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub storage_path: String,
    /// External UID of the creating user.
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// Returns true if the project id lives in the `PUBLIC_` forum namespace.
pub fn is_public_id(project_id: &str) -> bool {
    project_id.starts_with(PUBLIC_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: String,
    /// Internal user id, not the external UID.
    pub user_id: String,
    pub project_role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_prefix_is_case_sensitive() {
        assert!(is_public_id("PUBLIC_News"));
        assert!(!is_public_id("public_News"));
        assert!(!is_public_id("PUBLICNews"));
        assert!(!is_public_id("abc123_PUBLIC_News"));
    }
}
