use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Token;

const ARGON2_MEMORY: u32 = 64 * 1024; // 64KB
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

const TOKEN_PREFIX: &str = "tny";
const LOOKUP_LENGTH: usize = 8;
const SECRET_LENGTH: usize = 24;
const SECRET_BYTES: usize = 12;

pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl TokenGenerator {
    pub fn new() -> Result<Self> {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .map_err(|e| Error::Config(format!("invalid argon2 params: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Generates a new token with the format: tny_<lookup>_<secret>
    /// Returns (raw_token, lookup, hash)
    pub fn generate(&self) -> Result<(String, String, String)> {
        let lookup = generate_lookup();
        let secret = generate_secret();
        let raw_token = build_token(&lookup, &secret);
        let hash = self.hash(&raw_token)?;
        Ok((raw_token, lookup, hash))
    }

    pub fn hash(&self, token: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash token: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verifies a raw token against a stored PHC hash.
    pub fn verify(&self, token: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(token.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!("failed to verify token: {e}"))),
        }
    }

    /// Builds a token record ready to store, along with the raw secret to hand out.
    ///
    /// Admin tokens carry no user; user tokens must name the internal user id.
    pub fn issue(
        &self,
        user_id: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(Token, String)> {
        let (raw_token, lookup, hash) = self.generate()?;
        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            is_admin: user_id.is_none(),
            user_id,
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
        };
        Ok((token, raw_token))
    }
}

fn generate_lookup() -> String {
    Uuid::new_v4().simple().to_string()[..LOOKUP_LENGTH].to_string()
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)[..SECRET_LENGTH].to_string()
}

fn build_token(lookup: &str, secret: &str) -> String {
    format!("{TOKEN_PREFIX}_{lookup}_{secret}")
}

/// Parses a token string into its components (lookup, secret)
pub fn parse_token(token: &str) -> Result<(String, String)> {
    let rest = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|r| r.strip_prefix('_'))
        .ok_or(Error::InvalidTokenFormat)?;

    let (lookup, secret) = rest.split_once('_').ok_or(Error::InvalidTokenFormat)?;

    if lookup.len() != LOOKUP_LENGTH || secret.len() != SECRET_LENGTH || secret.contains('_') {
        return Err(Error::InvalidTokenFormat);
    }

    Ok((lookup.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> TokenGenerator {
        TokenGenerator::new().unwrap()
    }

    #[test]
    fn test_token_generation_format() {
        let (token, lookup, _hash) = generator().generate().unwrap();

        assert!(token.starts_with("tny_"));
        assert_eq!(lookup.len(), 8);

        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "tny");
        assert_eq!(parts[1], lookup);
        assert_eq!(parts[2].len(), 24);
    }

    #[test]
    fn test_token_verification() {
        let generator = generator();
        let (token, _, hash) = generator.generate().unwrap();

        assert!(generator.verify(&token, &hash).unwrap());

        let wrong_token = format!("{}wrong", &token[..token.len() - 5]);
        assert!(!generator.verify(&wrong_token, &hash).unwrap());
    }

    #[test]
    fn test_hash_is_phc_format() {
        let (_, _, hash) = generator().generate().unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_issue_sets_admin_flag_from_user() {
        let generator = generator();

        let (admin, raw) = generator.issue(None, None).unwrap();
        assert!(admin.is_admin);
        assert_eq!(parse_token(&raw).unwrap().0, admin.token_lookup);

        let (user, _) = generator.issue(Some("user-1".to_string()), None).unwrap();
        assert!(!user.is_admin);
        assert_eq!(user.user_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_parse_token_valid() {
        let (lookup, secret) = parse_token("tny_12345678_123456789012345678901234").unwrap();
        assert_eq!(lookup, "12345678");
        assert_eq!(secret, "123456789012345678901234");
    }

    #[test]
    fn test_parse_token_rejects_malformed() {
        assert!(parse_token("abc_12345678_123456789012345678901234").is_err());
        assert!(parse_token("tny_12345678").is_err());
        assert!(parse_token("tny_1234_123456789012345678901234").is_err());
        assert!(parse_token("tny_12345678_12345678901234567890123_").is_err());
    }
}
