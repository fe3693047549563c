use chrono::{DateTime, Utc};

use super::{TokenGenerator, parse_token};
use crate::error::{Error, Result as StoreResult};
use crate::store::Store;
use crate::types::{Token, User};

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

pub struct ValidatedToken {
    pub token: Token,
    pub user: Option<User>,
}

/// Extracts the token from an `Authorization: Bearer ...` header value.
/// Returns `Ok(None)` when no header is present.
pub fn extract_bearer_token(
    auth_header: Option<&str>,
) -> Result<Option<&str>, TokenValidationError> {
    match auth_header {
        Some(header) => header
            .strip_prefix("Bearer ")
            .map(|t| Some(t.trim()))
            .ok_or(TokenValidationError::InvalidScheme),
        None => Ok(None),
    }
}

const MAX_ISSUE_RETRIES: u32 = 3;

/// Generates and stores a new token, retrying on lookup collisions.
/// Returns the stored record and the raw token to hand to its holder.
pub fn issue_token(
    store: &dyn Store,
    user_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
) -> StoreResult<(Token, String)> {
    let generator = TokenGenerator::new()?;

    for _ in 0..MAX_ISSUE_RETRIES {
        let (token, raw_token) = generator.issue(user_id.clone(), expires_at)?;
        match store.create_token(&token) {
            Ok(()) => return Ok((token, raw_token)),
            Err(Error::TokenLookupCollision) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(Error::TokenLookupCollision)
}

/// Validates a raw token string against the store and loads its user, if any.
pub fn validate_token(
    store: &dyn Store,
    raw_token: &str,
) -> Result<ValidatedToken, TokenValidationError> {
    let (lookup, _secret) =
        parse_token(raw_token).map_err(|_| TokenValidationError::InvalidToken)?;

    let token = store
        .get_token_by_lookup(&lookup)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    let generator = TokenGenerator::new().map_err(|_| TokenValidationError::InternalError)?;
    if !generator
        .verify(raw_token, &token.token_hash)
        .map_err(|_| TokenValidationError::InternalError)?
    {
        return Err(TokenValidationError::InvalidToken);
    }

    if token.expires_at.is_some_and(|expires_at| expires_at < Utc::now()) {
        return Err(TokenValidationError::TokenExpired);
    }

    let user = match &token.user_id {
        Some(user_id) => store
            .get_user(user_id)
            .map_err(|_| TokenValidationError::InternalError)?,
        None => None,
    };

    if let Err(e) = store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(ValidatedToken { token, user })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::store::SqliteStore;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(None).unwrap(), None);
        assert_eq!(
            extract_bearer_token(Some("Bearer tny_a_b")).unwrap(),
            Some("tny_a_b")
        );
        assert!(matches!(
            extract_bearer_token(Some("Basic abc")),
            Err(TokenValidationError::InvalidScheme)
        ));
    }

    #[test]
    fn test_validate_admin_token() {
        let store = store();
        let (token, raw) = issue_token(&store, None, None).unwrap();

        let validated = validate_token(&store, &raw).unwrap();
        assert!(validated.token.is_admin);
        assert!(validated.user.is_none());

        let stored = store.get_token_by_lookup(&token.token_lookup).unwrap().unwrap();
        assert!(stored.last_used_at.is_some());
    }

    #[test]
    fn test_validate_rejects_unknown_and_expired() {
        let store = store();
        let generator = TokenGenerator::new().unwrap();

        let (unknown, _, _) = generator.generate().unwrap();
        assert!(matches!(
            validate_token(&store, &unknown),
            Err(TokenValidationError::InvalidToken)
        ));

        let (token, raw) = generator
            .issue(None, Some(Utc::now() - Duration::hours(1)))
            .unwrap();
        store.create_token(&token).unwrap();
        assert!(matches!(
            validate_token(&store, &raw),
            Err(TokenValidationError::TokenExpired)
        ));
    }
}
