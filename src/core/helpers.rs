use std::collections::HashSet;

use ammonia::Builder;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use spin_sdk::http::Request;
use uuid::Uuid;

use crate::core::errors::ApiError;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Whether an RFC 3339 timestamp is older than `max_age`. Unparseable stamps count as expired.
pub fn is_expired(created_at: &str, max_age: chrono::Duration) -> bool {
    match chrono::DateTime::parse_from_rfc3339(created_at) {
        Ok(created) => chrono::Utc::now() - created.with_timezone(&chrono::Utc) > max_age,
        Err(_) => true,
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn new_token() -> String {
    Uuid::new_v4().to_string()
}

/// Reduce user input to plain text: markup is stripped, surrounding whitespace trimmed.
pub fn sanitize_text(text: &str) -> String {
    let cleaned = Builder::default().tags(HashSet::new()).clean(text).to_string();
    // ammonia entity-encodes the text it keeps; stored text is plain.
    html_escape::decode_html_entities(&cleaned).trim().to_string()
}

pub fn bearer_token(req: &Request) -> Option<&str> {
    let header = req.header("Authorization")?.as_str()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

pub fn parse_json<T: DeserializeOwned>(req: &Request) -> Result<T, ApiError> {
    serde_json::from_slice(req.body())
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

pub fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", raw)))
}

/// Trim and drop empty optional text fields.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(sanitize_text)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn sanitize_strips_markup_but_keeps_text() {
        assert_eq!(sanitize_text("  <b>sunset</b> & sea <script>x()</script> "), "sunset & sea");
        assert_eq!(sanitize_text("a < b"), "a < b");
        assert_eq!(sanitize_text(r#"it's "golden" hour"#), r#"it's "golden" hour"#);
    }

    #[test]
    fn expiry_compares_against_now() {
        let fresh = now_iso();
        assert!(!is_expired(&fresh, chrono::Duration::hours(1)));
        let old = (chrono::Utc::now() - chrono::Duration::hours(3)).to_rfc3339();
        assert!(is_expired(&old, chrono::Duration::hours(2)));
        assert!(is_expired("yesterday", chrono::Duration::hours(2)));
    }

    #[test]
    fn ids_must_be_numeric() {
        assert_eq!(parse_id(" 42 ").unwrap(), 42);
        assert!(parse_id("abc").is_err());
    }

    #[test]
    fn optional_text_is_normalised() {
        assert_eq!(non_empty(Some("  Izmir ")), Some("Izmir".to_string()));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
