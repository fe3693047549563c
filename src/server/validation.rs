use crate::error::{Error, Result};
use crate::types::RoleTables;

const MAX_UID_LEN: usize = 64;
const MAX_USERNAME_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 254;

fn is_valid_uid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// UIDs prefix private project ids, so they share the project id charset.
pub fn validate_uid(uid: &str) -> Result<()> {
    if uid.is_empty() {
        return Err(Error::validation("User id cannot be empty"));
    }
    if uid.len() > MAX_UID_LEN {
        return Err(Error::validation(format!(
            "User id cannot exceed {MAX_UID_LEN} characters"
        )));
    }
    if !uid.chars().all(is_valid_uid_char) {
        return Err(Error::validation(
            "User id can only contain alphanumeric characters, hyphens, and underscores",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(Error::validation(format!(
            "Email cannot exceed {MAX_EMAIL_LEN} characters"
        )));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(Error::validation("Email address is invalid")),
    }
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::validation("Username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(Error::validation(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_global_role(tables: &RoleTables, role: &str) -> Result<()> {
    if !tables.global.contains_key(role) {
        return Err(Error::validation(format!("Unknown global role '{role}'")));
    }
    Ok(())
}

/// Checks every field of a user about to be provisioned.
pub fn validate_new_user(
    tables: &RoleTables,
    uid: &str,
    email: &str,
    username: &str,
    global_role: &str,
) -> Result<()> {
    validate_uid(uid)?;
    validate_email(email)?;
    validate_username(username)?;
    validate_global_role(tables, global_role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_rules() {
        validate_uid("abc123").unwrap();
        validate_uid("user_1-x").unwrap();
        assert!(validate_uid("").is_err());
        assert!(validate_uid("has space").is_err());
        assert!(validate_uid(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_email_rules() {
        validate_email("a@b.c").unwrap();
        assert!(validate_email("nobody").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("me@").is_err());
    }

    #[test]
    fn test_username_rules() {
        validate_username("Alice").unwrap();
        assert!(validate_username("   ").is_err());
    }

    #[test]
    fn test_global_role_must_be_known() {
        let tables = RoleTables::default();
        validate_global_role(&tables, "nitro").unwrap();
        assert!(matches!(
            validate_global_role(&tables, "pirate"),
            Err(Error::Validation(_))
        ));
    }
}
